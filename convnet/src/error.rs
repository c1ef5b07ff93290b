use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The crate's error type.
///
/// `InvalidConfig`, `DuplicateName` and `Cycle` are configuration errors raised while building
/// or wiring models, `ShapeMismatch` is raised when attaching input networks whose outputs do
/// not fit, and `Shape` is a failure detected while running a forward pass.
#[derive(Debug)]
pub enum MlErr {
    InvalidConfig(String),
    DuplicateName(String),
    Cycle {
        downstream: String,
        upstream: String,
    },
    UnknownModel(usize),
    ShapeMismatch {
        network: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Shape(String),
    NoClassifier(String),
}

impl MlErr {
    /// Whether this error was caused by an invalid model or graph configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MlErr::InvalidConfig(_) | MlErr::DuplicateName(_) | MlErr::Cycle { .. }
        )
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            MlErr::DuplicateName(name) => {
                write!(f, "a network named {name:?} is already registered")
            }
            MlErr::Cycle {
                downstream,
                upstream,
            } => write!(
                f,
                "attaching {upstream:?} as an input of {downstream:?} would create a cycle"
            ),
            MlErr::UnknownModel(id) => write!(f, "there's no model with id {id}"),
            MlErr::ShapeMismatch {
                network,
                got,
                expected,
            } => write!(
                f,
                "input networks of {network:?} produce shape {got:?}, expected {expected:?}"
            ),
            MlErr::Shape(msg) => write!(f, "shape error: {msg}"),
            MlErr::NoClassifier(name) => write!(
                f,
                "{name:?} has no classification layer, can't convert outputs to classes"
            ),
        }
    }
}

impl Error for MlErr {}

impl From<ndarray::ShapeError> for MlErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::Shape(value.to_string())
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}
