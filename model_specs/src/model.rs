use serde::{Deserialize, Serialize};

use crate::{ActFnSpec, ConvUnitSpec, InitSpec, PredActFnSpec};

/// The specification for a `ConvNet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ConvNetSpec {
    pub name: String,
    pub in_dim: Vec<usize>,
    pub conv_units: Vec<ConvUnitSpec>,
    #[serde(default)]
    pub num_classes: Option<usize>,
    #[serde(default = "default_activation")]
    pub activation: Option<ActFnSpec>,
    #[serde(default = "default_pred_activation")]
    pub pred_activation: Option<PredActFnSpec>,
    #[serde(default)]
    pub init: InitSpec,
    #[serde(default)]
    pub seed: Option<u64>,

    /// Names of the models whose outputs feed this one, in concatenation order.
    #[serde(default)]
    pub input_networks: Vec<String>,
}

fn default_activation() -> Option<ActFnSpec> {
    Some(ActFnSpec::Relu)
}

fn default_pred_activation() -> Option<PredActFnSpec> {
    Some(PredActFnSpec::Softmax)
}

impl ConvNetSpec {
    /// Creates a new `ConvNetSpec` with the default activations and initialization.
    ///
    /// # Arguments
    /// * `name` - The unique name of the model.
    /// * `in_dim` - The input shape, `(channels, spatial...)`.
    /// * `conv_units` - The convolutional units in declaration order.
    pub fn new<S: Into<String>>(
        name: S,
        in_dim: Vec<usize>,
        conv_units: Vec<ConvUnitSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            in_dim,
            conv_units,
            num_classes: None,
            activation: default_activation(),
            pred_activation: default_pred_activation(),
            init: InitSpec::default(),
            seed: None,
            input_networks: Vec::new(),
        }
    }

    pub fn with_num_classes(mut self, num_classes: Option<usize>) -> Self {
        self.num_classes = num_classes;
        self
    }

    pub fn with_activation(mut self, activation: Option<ActFnSpec>) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_pred_activation(mut self, pred_activation: Option<PredActFnSpec>) -> Self {
        self.pred_activation = pred_activation;
        self
    }

    pub fn with_init(mut self, init: InitSpec) -> Self {
        self.init = init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parses a `ConvNetSpec` from its json representation.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv_net_spec_defaults() {
        let json = r#"{
            "name": "Test_ConvNet_noclass",
            "in_dim": [1, 28, 28],
            "conv_units": [
                { "in_channels": 1, "out_channels": 16, "kernel_size": [5, 5], "pool_size": 2, "stride": 2 },
                { "in_channels": 16, "out_channels": 1, "kernel_size": [5, 5], "stride": 2, "padding": 2 }
            ]
        }"#;
        let spec = ConvNetSpec::from_json(json).unwrap();

        assert_eq!(spec.name, "Test_ConvNet_noclass");
        assert_eq!(spec.conv_units.len(), 2);
        assert_eq!(spec.num_classes, None);
        assert_eq!(spec.activation, Some(ActFnSpec::Relu));
        assert_eq!(spec.pred_activation, Some(PredActFnSpec::Softmax));
        assert_eq!(spec.init, InitSpec::LecunUniform);
        assert!(spec.input_networks.is_empty());
    }

    #[test]
    fn conv_net_spec_null_activation() {
        let json = r#"{
            "name": "linear",
            "in_dim": [1, 8],
            "conv_units": [{ "in_channels": 1, "out_channels": 1, "kernel_size": 3 }],
            "activation": null,
            "num_classes": 2,
            "init": { "const": { "value": 0.5 } }
        }"#;
        let spec = ConvNetSpec::from_json(json).unwrap();

        assert_eq!(spec.activation, None);
        assert_eq!(spec.num_classes, Some(2));
        assert_eq!(spec.init, InitSpec::Const { value: 0.5 });
    }

    #[test]
    fn conv_net_spec_rejects_unknown_keys() {
        let json = r#"{
            "name": "typo",
            "in_dim": [1, 8, 8],
            "conv_units": [{ "in_channels": 1, "out_channels": 1, "kernel_size": 3 }],
            "num_clases": 3
        }"#;
        let err = ConvNetSpec::from_json(json).unwrap_err();

        assert!(err.to_string().contains("num_clases"));
    }
}
