use ndarray::{ArrayD, Ix2};

use super::{Conv2d, Dense, MaxPool2d, Param};
use crate::{
    arch::activations::{ActFn, PredActFn},
    error::Result,
    shape::Shape,
};

#[derive(Debug, Clone)]
pub enum Layer {
    Conv(Conv2d),
    Activation(ActFn),
    MaxPool(MaxPool2d),
    Flatten,
    Dense(Dense),
    Prediction(PredActFn),
}
use Layer::*;

impl Layer {
    /// Returns the parameters of this layer, empty for layers without any.
    pub fn params(&self) -> &[Param] {
        match self {
            Conv(l) => l.params(),
            Dense(l) => l.params(),
            Activation(_) | MaxPool(_) | Flatten | Prediction(_) => &[],
        }
    }

    pub fn params_mut(&mut self) -> &mut [Param] {
        match self {
            Conv(l) => l.params_mut(),
            Dense(l) => l.params_mut(),
            Activation(_) | MaxPool(_) | Flatten | Prediction(_) => &mut [],
        }
    }

    /// Propagates the shape of a sample through this layer.
    ///
    /// # Returns
    /// `None` if the input doesn't fit this layer or a dimension would become non-positive.
    pub fn out_shape(&self, input: Shape) -> Option<Shape> {
        match self {
            Conv(l) => l.out_shape(input),
            MaxPool(l) => l.out_shape(input),
            Dense(l) => l.out_shape(input),
            Flatten => input.checked_size().map(Shape::Flat),
            Activation(_) => Some(input),
            Prediction(_) => matches!(input, Shape::Flat(_)).then_some(input),
        }
    }

    pub fn forward(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let y = match self {
            Conv(l) => l.forward(x)?,
            MaxPool(l) => l.forward(x)?,
            Dense(l) => l.forward(x)?.into_dyn(),
            Activation(act_fn) => act_fn.forward(x),
            Flatten => {
                let n = x.shape()[0];
                let features = x.shape()[1..].iter().product::<usize>();
                x.to_shape((n, features))?.into_owned().into_dyn()
            }
            Prediction(pred) => pred.forward(x.into_dimensionality::<Ix2>()?).into_dyn(),
        };

        Ok(y)
    }
}
