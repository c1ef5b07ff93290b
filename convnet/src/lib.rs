pub mod arch;
pub mod error;
mod graph;
pub mod init;
pub mod metrics;
pub mod shape;

pub use arch::ConvNet;
pub use error::{MlErr, Result};
pub use graph::{ModelGraph, ModelId, Prediction};
pub use model_specs::{
    ActFnSpec, ConvNetSpec, ConvUnitSpec, GraphSpec, InitSpec, KernelSize, PredActFnSpec,
};
pub use shape::Shape;
