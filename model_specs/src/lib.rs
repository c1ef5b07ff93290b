mod graph;
mod layer;
mod model;

pub use graph::GraphSpec;
pub use layer::{ActFnSpec, ConvUnitSpec, InitSpec, KernelSize, PredActFnSpec};
pub use model::ConvNetSpec;
