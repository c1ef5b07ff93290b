pub mod activations;
mod builder;
mod conv_net;
pub mod layers;
mod sequential;

pub use builder::ConvNetBuilder;
pub use conv_net::ConvNet;
pub use sequential::{Collapse, Sequential};
