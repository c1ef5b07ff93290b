use model_specs::{ConvNetSpec, ConvUnitSpec};
use ndarray::{ArrayD, ArrayViewD};

use super::{ConvNetBuilder, Sequential, layers::Param};
use crate::{
    error::{MlErr, Result},
    shape::Shape,
};

/// A convolutional network built from a declarative list of conv units, optionally ending in
/// a classification layer.
#[derive(Debug, Clone)]
pub struct ConvNet {
    name: String,
    in_dim: Shape,
    out_dim: Shape,
    num_classes: Option<usize>,
    network: Sequential,
}

impl ConvNet {
    pub(crate) fn from_parts(
        name: String,
        in_dim: Shape,
        out_dim: Shape,
        num_classes: Option<usize>,
        network: Sequential,
    ) -> Self {
        Self {
            name,
            in_dim,
            out_dim,
            num_classes,
            network,
        }
    }

    /// Creates a `ConvNet` with the default activations and initialization.
    ///
    /// # Arguments
    /// * `name` - The unique name of the model.
    /// * `in_dim` - The input shape, `(channels, length)` or `(channels, height, width)`.
    /// * `conv_units` - The convolutional units in declaration order.
    /// * `num_classes` - If present, the amount of classes of the appended classification layer.
    ///
    /// # Returns
    /// The model or a configuration error.
    pub fn new<S: Into<String>>(
        name: S,
        in_dim: &[usize],
        conv_units: Vec<ConvUnitSpec>,
        num_classes: Option<usize>,
    ) -> Result<Self> {
        let spec =
            ConvNetSpec::new(name, in_dim.to_vec(), conv_units).with_num_classes(num_classes);
        Self::from_spec(&spec)
    }

    /// Creates a `ConvNet` following a spec.
    pub fn from_spec(spec: &ConvNetSpec) -> Result<Self> {
        ConvNetBuilder::new().build(spec)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shape of a single input sample.
    pub fn in_dim(&self) -> Shape {
        self.in_dim
    }

    /// Returns the shape of a single output sample.
    pub fn out_dim(&self) -> Shape {
        self.out_dim
    }

    pub fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    pub fn network(&self) -> &Sequential {
        &self.network
    }

    /// Returns the amount of scalar parameters of this model's own layers.
    pub fn num_params(&self) -> usize {
        self.network.size()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Param> {
        self.network.params()
    }

    pub fn parameters_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.network.params_mut()
    }

    /// Returns the parameters training is allowed to update.
    pub fn trainable_parameters_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.network.params_mut().filter(|p| p.trainable())
    }

    /// Sets the `trainable` flag of every parameter of this model's own layers.
    pub fn set_trainable(&mut self, trainable: bool) {
        self.network
            .params_mut()
            .for_each(|p| p.set_trainable(trainable));
    }

    /// Whether no parameter of this model's own layers is trainable.
    pub fn is_frozen(&self) -> bool {
        self.parameters().all(|p| !p.trainable())
    }

    /// Runs a batch through this model's own layers.
    ///
    /// # Arguments
    /// * `x` - A batch shaped `(batch, *in_dim)`.
    ///
    /// # Returns
    /// A batch shaped `(batch, *out_dim)` or an error if `x` doesn't have the expected shape.
    pub fn forward(&self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let n = match x.shape().split_first() {
            Some((&n, sample)) if sample == self.in_dim.dims().as_slice() => n,
            _ => {
                return Err(MlErr::Shape(format!(
                    "{} expects batches shaped (batch, {:?}), got {:?}",
                    self.name,
                    self.in_dim.dims(),
                    x.shape()
                )));
            }
        };

        let x = x.to_shape(self.in_dim.internal(n))?.into_owned();
        let y = self.network.forward(x)?;
        Ok(y.into_shape_with_order(self.out_dim.batched(n))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units() -> Vec<ConvUnitSpec> {
        vec![
            ConvUnitSpec::new(1, 16, (5, 5)).with_stride(2).with_pool_size(2),
            ConvUnitSpec::new(16, 1, (5, 5)).with_stride(2).with_padding(2),
        ]
    }

    #[test]
    fn forward_output_matches_out_dim() {
        let net = ConvNet::new("noclass", &[1, 28, 28], units(), None).unwrap();
        let x = ArrayD::ones(vec![2, 1, 28, 28]);

        let y = net.forward(x.view()).unwrap();

        assert_eq!(y.shape(), &[2, 1, 3, 3]);
        assert!(y.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn forward_rejects_wrong_sample_shape() {
        let net = ConvNet::new("noclass", &[1, 28, 28], units(), None).unwrap();
        let x = ArrayD::ones(vec![1, 1, 27, 28]);

        assert!(matches!(net.forward(x.view()), Err(MlErr::Shape(_))));
    }

    #[test]
    fn set_trainable() {
        let mut net = ConvNet::new("noclass", &[1, 28, 28], units(), Some(3)).unwrap();
        assert!(net.parameters().all(Param::trainable));

        net.set_trainable(false);
        assert!(net.is_frozen());
        assert_eq!(net.trainable_parameters_mut().count(), 0);

        net.set_trainable(true);
        assert_eq!(net.trainable_parameters_mut().count(), 6);
    }
}
