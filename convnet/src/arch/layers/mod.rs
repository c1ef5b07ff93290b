mod conv;
mod dense;
mod layer;
mod param;
mod pool;

pub use conv::Conv2d;
pub use dense::Dense;
pub use layer::Layer;
pub use param::Param;
pub use pool::MaxPool2d;
