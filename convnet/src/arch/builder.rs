use log::debug;
use model_specs::{ActFnSpec, ConvNetSpec, ConvUnitSpec, KernelSize, PredActFnSpec};
use ndarray::{Array1, Array2, Array4};
use rand::Rng;

use super::{
    ConvNet, Sequential,
    activations::{ActFn, PredActFn},
    layers::{Conv2d, Dense, Layer, MaxPool2d},
};
use crate::{
    error::{MlErr, Result},
    init::ParamGen,
    shape::Shape,
};

/// Builds `ConvNet`s from a `ConvNetSpec`.
#[derive(Default)]
pub struct ConvNetBuilder;

impl ConvNetBuilder {
    /// Creates a new `ConvNetBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `ConvNet` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The model configuration.
    ///
    /// # Returns
    /// The model, or a configuration error if the spec is inconsistent or shrinks the input to
    /// a non-positive size.
    pub fn build(&self, spec: &ConvNetSpec) -> Result<ConvNet> {
        let in_dim = self.resolve_in_dim(spec)?;
        self.validate_units(spec, in_dim)?;

        let mut param_gen = ParamGen::seeded(spec.init, spec.seed);
        let mut network = Sequential::default();

        for unit in &spec.conv_units {
            let conv = self.resolve_conv(unit, in_dim, &mut param_gen)?;
            network.push(Layer::Conv(conv));

            if let Some(act_fn) = spec.activation {
                network.push(Layer::Activation(self.resolve_act_fn(act_fn)));
            }

            if let Some(pool_size) = unit.pool_size {
                network.push(Layer::MaxPool(self.resolve_pool(pool_size, in_dim)?));
            }
        }

        let features = self.propagate(spec, &network, in_dim)?;

        if let Some(num_classes) = spec.num_classes {
            let Some(size) = features.checked_size() else {
                return Err(MlErr::InvalidConfig(format!(
                    "{}: {features} is too large to flatten",
                    spec.name
                )));
            };
            let dense = self.resolve_classifier(size, num_classes, &mut param_gen)?;
            network.push(Layer::Flatten);
            network.push(Layer::Dense(dense));

            if let Some(pred) = spec.pred_activation {
                network.push(Layer::Prediction(self.resolve_pred_act_fn(pred)));
            }
        }

        let out_dim = self.propagate(spec, &network, in_dim)?;

        debug!(
            name = spec.name.as_str(), params = network.size();
            "built model: {in_dim} -> {features} -> {out_dim}"
        );

        Ok(ConvNet::from_parts(
            spec.name.clone(),
            in_dim,
            out_dim,
            spec.num_classes,
            network,
        ))
    }

    fn resolve_in_dim(&self, spec: &ConvNetSpec) -> Result<Shape> {
        match Shape::from_dims(&spec.in_dim) {
            Some(shape) if shape.is_spatial() => Ok(shape),
            _ => Err(MlErr::InvalidConfig(format!(
                "{}: in_dim must be (channels, length) or (channels, height, width) with \
                 positive dimensions, got {:?}",
                spec.name, spec.in_dim
            ))),
        }
    }

    fn validate_units(&self, spec: &ConvNetSpec, in_dim: Shape) -> Result<()> {
        let name = &spec.name;

        if name.is_empty() {
            return Err(MlErr::InvalidConfig("model name can't be empty".into()));
        }

        let Some(first) = spec.conv_units.first() else {
            return Err(MlErr::InvalidConfig(format!(
                "{name}: model must have at least one conv unit"
            )));
        };

        if first.in_channels != in_dim.channels() {
            return Err(MlErr::InvalidConfig(format!(
                "{name}: first conv unit takes {} channels but in_dim has {}",
                first.in_channels,
                in_dim.channels()
            )));
        }

        for (i, unit) in spec.conv_units.iter().enumerate() {
            if unit.in_channels == 0 || unit.out_channels == 0 {
                return Err(MlErr::InvalidConfig(format!(
                    "{name}: conv unit {i} must have positive channel counts"
                )));
            }

            if unit.stride == 0 {
                return Err(MlErr::InvalidConfig(format!(
                    "{name}: conv unit {i} must have a positive stride"
                )));
            }

            if unit.pool_size == Some(0) {
                return Err(MlErr::InvalidConfig(format!(
                    "{name}: conv unit {i} must have a positive pool_size"
                )));
            }
        }

        // Adjacent units must chain: prev.out_channels == next.in_channels
        for (i, pair) in spec.conv_units.windows(2).enumerate() {
            let (prev, next) = (pair[0], pair[1]);
            if prev.out_channels != next.in_channels {
                return Err(MlErr::InvalidConfig(format!(
                    "{name}: conv unit {}: in_channels ({}) does not match previous unit \
                     out_channels ({})",
                    i + 1,
                    next.in_channels,
                    prev.out_channels
                )));
            }
        }

        if spec.num_classes == Some(0) {
            return Err(MlErr::InvalidConfig(format!(
                "{name}: num_classes must be positive"
            )));
        }

        Ok(())
    }

    fn propagate(&self, spec: &ConvNetSpec, network: &Sequential, in_dim: Shape) -> Result<Shape> {
        network.out_shape(in_dim).map_err(|collapse| {
            MlErr::InvalidConfig(format!(
                "{}: layer {} can't take an input of shape {}, the configured units shrink \
                 {in_dim} to a non-positive size",
                spec.name, collapse.layer, collapse.input
            ))
        })
    }

    fn resolve_kernel(&self, kernel_size: KernelSize, in_dim: Shape) -> Result<(usize, usize)> {
        let kernel = match (kernel_size, in_dim) {
            (KernelSize::Square(k), Shape::Seq { .. }) => (1, k),
            (KernelSize::Rect(..), Shape::Seq { .. }) => {
                return Err(MlErr::InvalidConfig(
                    "kernel_size must be a single integer for 1D inputs".into(),
                ));
            }
            (KernelSize::Square(k), _) => (k, k),
            (KernelSize::Rect(h, w), _) => (h, w),
        };

        if kernel.0 == 0 || kernel.1 == 0 {
            return Err(MlErr::InvalidConfig(format!(
                "kernel_size must be positive, got {kernel_size:?}"
            )));
        }

        Ok(kernel)
    }

    /// Lifts a scalar setting to both spatial axes, sequences only use the horizontal one.
    fn per_axis(&self, value: usize, in_dim: Shape, vertical_default: usize) -> (usize, usize) {
        match in_dim {
            Shape::Seq { .. } => (vertical_default, value),
            _ => (value, value),
        }
    }

    fn resolve_conv<R: Rng>(
        &self,
        unit: &ConvUnitSpec,
        in_dim: Shape,
        param_gen: &mut ParamGen<R>,
    ) -> Result<Conv2d> {
        let (kh, kw) = self.resolve_kernel(unit.kernel_size, in_dim)?;
        let (cin, cout) = (unit.in_channels, unit.out_channels);
        let fan_in = self.param_count(&[cin, kh, kw])?;
        let fan_out = self.param_count(&[cout, kh, kw])?;

        let weight = param_gen.sample(self.param_count(&[cout, fan_in])?, fan_in, fan_out)?;
        let weight = Array4::from_shape_vec((cout, cin, kh, kw), weight)?;
        let bias = Array1::from_vec(param_gen.sample(cout, fan_in, fan_out)?);

        Conv2d::new(
            weight,
            bias,
            self.per_axis(unit.stride, in_dim, 1),
            self.per_axis(unit.padding, in_dim, 0),
        )
    }

    fn param_count(&self, factors: &[usize]) -> Result<usize> {
        factors
            .iter()
            .try_fold(1usize, |n, &factor| n.checked_mul(factor))
            .ok_or_else(|| {
                MlErr::InvalidConfig(format!("parameter tensor of {factors:?} is too large"))
            })
    }

    fn resolve_pool(&self, pool_size: usize, in_dim: Shape) -> Result<MaxPool2d> {
        MaxPool2d::new(self.per_axis(pool_size, in_dim, 1))
    }

    fn resolve_classifier<R: Rng>(
        &self,
        features: usize,
        num_classes: usize,
        param_gen: &mut ParamGen<R>,
    ) -> Result<Dense> {
        let n = self.param_count(&[features, num_classes])?;
        let weight = param_gen.sample(n, features, num_classes)?;
        let weight = Array2::from_shape_vec((features, num_classes), weight)?;
        let bias = Array1::from_vec(param_gen.sample(num_classes, features, num_classes)?);

        Dense::new(weight, bias)
    }

    fn resolve_act_fn(&self, spec: ActFnSpec) -> ActFn {
        match spec {
            ActFnSpec::Relu => ActFn::relu(),
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnSpec::Tanh => ActFn::tanh(),
        }
    }

    fn resolve_pred_act_fn(&self, spec: PredActFnSpec) -> PredActFn {
        match spec {
            PredActFnSpec::Softmax => PredActFn::Softmax,
            PredActFnSpec::Sigmoid => PredActFn::Sigmoid,
        }
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

    fn build(spec: ConvNetSpec) -> Result<ConvNet> {
        ConvNetBuilder::new().build(&spec.with_seed(0))
    }

    #[test]
    fn propagates_shapes() {
        let net = build(ConvNetSpec::new("noclass", vec![1, 28, 28], units())).unwrap();

        assert_eq!(net.in_dim().dims(), vec![1, 28, 28]);
        assert_eq!(net.out_dim().dims(), vec![1, 3, 3]);
        // 16 * (1 * 5 * 5) + 16 + 1 * (16 * 5 * 5) + 1
        assert_eq!(net.num_params(), 416 + 401);
    }

    #[test]
    fn classifier_output() {
        let spec = ConvNetSpec::new("class", vec![1, 28, 28], units()).with_num_classes(Some(3));
        let net = build(spec).unwrap();

        assert_eq!(net.out_dim().dims(), vec![3]);
        assert_eq!(net.num_params(), 416 + 401 + 9 * 3 + 3);
    }

    #[test]
    fn one_dimensional_input() {
        let units = vec![
            ConvUnitSpec::new(2, 4, 3).with_padding(1).with_pool_size(2),
            ConvUnitSpec::new(4, 1, 3),
        ];
        let net = build(ConvNetSpec::new("seq", vec![2, 20], units)).unwrap();

        assert_eq!(net.out_dim().dims(), vec![1, 8]);
    }

    #[test]
    fn rejects_rect_kernel_on_sequences() {
        let units = vec![ConvUnitSpec::new(1, 1, (3, 3))];
        let err = build(ConvNetSpec::new("seq", vec![1, 20], units)).unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn rejects_broken_channel_chaining() {
        let units = vec![
            ConvUnitSpec::new(1, 16, (5, 5)),
            ConvUnitSpec::new(8, 1, (5, 5)),
        ];
        let err = build(ConvNetSpec::new("broken", vec![1, 28, 28], units)).unwrap_err();

        assert!(matches!(err, MlErr::InvalidConfig(msg) if msg.contains("conv unit 1")));
    }

    #[test]
    fn rejects_first_unit_not_matching_input() {
        let units = vec![ConvUnitSpec::new(3, 16, (5, 5))];
        let err = build(ConvNetSpec::new("rgb", vec![1, 28, 28], units)).unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn rejects_empty_units() {
        let err = build(ConvNetSpec::new("empty", vec![1, 28, 28], vec![])).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn rejects_zero_sizes() {
        let zero_stride = vec![ConvUnitSpec::new(1, 1, 3).with_stride(0)];
        let zero_pool = vec![ConvUnitSpec::new(1, 1, 3).with_pool_size(0)];
        let zero_kernel = vec![ConvUnitSpec::new(1, 1, 0)];

        for units in [zero_stride, zero_pool, zero_kernel] {
            let err = build(ConvNetSpec::new("zero", vec![1, 8, 8], units)).unwrap_err();
            assert!(err.is_config());
        }

        let spec = ConvNetSpec::new("zero", vec![1, 8, 8], vec![ConvUnitSpec::new(1, 1, 3)])
            .with_num_classes(Some(0));
        assert!(build(spec).unwrap_err().is_config());
    }

    #[test]
    fn rejects_non_positive_spatial_size() {
        let spec = ConvNetSpec::new("tiny", vec![1, 3, 3], units());
        let err = build(spec).unwrap_err();

        assert!(matches!(err, MlErr::InvalidConfig(msg) if msg.contains("non-positive")));
    }

    #[test]
    fn rejects_overflowing_padding() {
        let units = vec![ConvUnitSpec::new(1, 1, 3).with_padding(usize::MAX / 2 + 1)];
        let err = build(ConvNetSpec::new("padded", vec![1, 8, 8], units)).unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn rejects_overflowing_parameter_count() {
        let units = vec![ConvUnitSpec::new(1, usize::MAX / 2, 3)];
        let err = build(ConvNetSpec::new("wide", vec![1, 8, 8], units)).unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn rejects_bad_in_dim() {
        for in_dim in [vec![], vec![16], vec![1, 0, 28], vec![1, 2, 3, 4]] {
            let err = build(ConvNetSpec::new("bad", in_dim, units())).unwrap_err();
            assert!(err.is_config());
        }
    }
}
