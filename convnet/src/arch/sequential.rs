use ndarray::ArrayD;

use super::layers::{Layer, Param};
use crate::{error::Result, shape::Shape};

/// A sequential model: information flows forward through its layers in order.
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    layers: Vec<Layer>,
}

/// Where shape propagation through a `Sequential` stopped fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collapse {
    pub layer: usize,
    pub input: Shape,
}

impl Sequential {
    /// Appends a layer after the current last one.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.params().map(Param::len).sum()
    }

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.layers.iter().flat_map(Layer::params)
    }

    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.layers.iter_mut().flat_map(Layer::params_mut)
    }

    /// Computes the shape of a sample after going through every layer, without touching any
    /// data.
    ///
    /// # Arguments
    /// * `input` - The shape of a single input sample.
    ///
    /// # Returns
    /// The output shape, or the first layer the propagated shape doesn't fit.
    pub fn out_shape(&self, input: Shape) -> std::result::Result<Shape, Collapse> {
        self.layers
            .iter()
            .enumerate()
            .try_fold(input, |shape, (layer, l)| {
                l.out_shape(shape).ok_or(Collapse {
                    layer,
                    input: shape,
                })
            })
    }

    /// Runs a batch, laid out as the layers expect it, through every layer in order.
    pub fn forward(&self, mut x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        for layer in &self.layers {
            x = layer.forward(x)?;
        }

        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2};

    use super::*;
    use crate::arch::{
        activations::ActFn,
        layers::{Dense, MaxPool2d},
    };

    fn network() -> Sequential {
        let mut network = Sequential::default();
        network.push(Layer::MaxPool(MaxPool2d::new((2, 2)).unwrap()));
        network.push(Layer::Flatten);
        network.push(Layer::Dense(
            Dense::new(Array2::ones((4, 2)), Array1::zeros(2)).unwrap(),
        ));
        network.push(Layer::Activation(ActFn::relu()));
        network
    }

    #[test]
    fn pushed_layers_run_in_order() {
        let network = network();
        let input = Shape::from_dims(&[1, 4, 4]).unwrap();

        assert_eq!(network.out_shape(input), Ok(Shape::Flat(2)));
        assert_eq!(network.size(), 4 * 2 + 2);

        let y = network.forward(ArrayD::ones(input.internal(3))).unwrap();
        assert_eq!(y.shape(), &[3, 2]);
        assert!(y.iter().all(|&v| v == 4.));
    }

    #[test]
    fn out_shape_reports_first_layer_not_fitting() {
        let input = Shape::from_dims(&[1, 2, 2]).unwrap();

        assert_eq!(
            network().out_shape(input),
            Err(Collapse {
                layer: 2,
                input: Shape::Flat(1),
            })
        );
    }
}
