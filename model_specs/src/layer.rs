use serde::{Deserialize, Serialize};

/// The size of a convolution kernel, either a single side or `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KernelSize {
    Square(usize),
    Rect(usize, usize),
}

impl From<usize> for KernelSize {
    fn from(value: usize) -> Self {
        Self::Square(value)
    }
}

impl From<(usize, usize)> for KernelSize {
    fn from((h, w): (usize, usize)) -> Self {
        Self::Rect(h, w)
    }
}

/// The specification for a single convolutional unit.
///
/// A unit is a convolution followed by the network activation and an optional max pooling
/// whose window and stride are both `pool_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ConvUnitSpec {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: KernelSize,
    #[serde(default = "default_stride")]
    pub stride: usize,
    #[serde(default)]
    pub padding: usize,
    #[serde(default)]
    pub pool_size: Option<usize>,
}

fn default_stride() -> usize {
    1
}

impl ConvUnitSpec {
    /// Creates a new `ConvUnitSpec` with stride 1, no padding and no pooling.
    ///
    /// # Arguments
    /// * `in_channels` - The amount of channels the unit receives.
    /// * `out_channels` - The amount of channels the unit produces.
    /// * `kernel_size` - The size of the convolution kernel.
    pub fn new<K: Into<KernelSize>>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: K,
    ) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size: kernel_size.into(),
            stride: default_stride(),
            padding: 0,
            pool_size: None,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }
}

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Relu,
    Sigmoid { amp: f32 },
    Tanh,
}

/// The specification for the activation applied after the classification layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredActFnSpec {
    Softmax,
    Sigmoid,
}

/// The specification for how the parameters of a model are initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    Const {
        value: f32,
    },
    #[default]
    LecunUniform,
    XavierUniform,
    Kaiming,
    Normal {
        mean: f32,
        std_dev: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv_unit_defaults() {
        let json = r#"{ "in_channels": 1, "out_channels": 16, "kernel_size": [5, 5] }"#;
        let unit: ConvUnitSpec = serde_json::from_str(json).unwrap();

        assert_eq!(unit, ConvUnitSpec::new(1, 16, (5, 5)));
        assert_eq!(unit.stride, 1);
        assert_eq!(unit.padding, 0);
        assert_eq!(unit.pool_size, None);
    }

    #[test]
    fn conv_unit_square_kernel() {
        let json = r#"{ "in_channels": 16, "out_channels": 1, "kernel_size": 3, "stride": 2, "padding": 2, "pool_size": 2 }"#;
        let unit: ConvUnitSpec = serde_json::from_str(json).unwrap();

        let expected = ConvUnitSpec::new(16, 1, 3)
            .with_stride(2)
            .with_padding(2)
            .with_pool_size(2);
        assert_eq!(unit, expected);
    }

    #[test]
    fn conv_unit_missing_required_key() {
        let json = r#"{ "in_channels": 1, "kernel_size": [5, 5] }"#;
        let err = serde_json::from_str::<ConvUnitSpec>(json).unwrap_err();

        assert!(err.to_string().contains("out_channels"));
    }

    #[test]
    fn conv_unit_rejects_unknown_keys() {
        let json = r#"{ "in_channels": 1, "out_channels": 2, "kernel_size": 3, "dilation": 2 }"#;
        assert!(serde_json::from_str::<ConvUnitSpec>(json).is_err());
    }

    #[test]
    fn act_fn_spec_formats() {
        let relu: ActFnSpec = serde_json::from_str(r#""relu""#).unwrap();
        let sigmoid: ActFnSpec = serde_json::from_str(r#"{ "sigmoid": { "amp": 1.0 } }"#).unwrap();

        assert_eq!(relu, ActFnSpec::Relu);
        assert_eq!(sigmoid, ActFnSpec::Sigmoid { amp: 1.0 });
    }
}
