use serde::{Deserialize, Serialize};

use crate::ConvNetSpec;

/// The specification for a composition of models.
///
/// Models are created in order, then every model is attached to the inputs it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct GraphSpec {
    pub models: Vec<ConvNetSpec>,
}

impl GraphSpec {
    /// Parses a `GraphSpec` from its json representation.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_spec_with_input_networks() {
        let json = r#"{
            "models": [
                { "name": "a", "in_dim": [1, 8, 8], "conv_units": [{ "in_channels": 1, "out_channels": 2, "kernel_size": 3, "padding": 1 }] },
                { "name": "b", "in_dim": [2, 8, 8], "conv_units": [{ "in_channels": 2, "out_channels": 1, "kernel_size": 3 }], "input_networks": ["a"] }
            ]
        }"#;
        let spec = GraphSpec::from_json(json).unwrap();

        assert_eq!(spec.models.len(), 2);
        assert_eq!(spec.models[1].input_networks, vec!["a".to_string()]);
    }

    #[test]
    fn graph_spec_rejects_unknown_keys() {
        let json = r#"{ "models": [], "model": [] }"#;
        assert!(GraphSpec::from_json(json).is_err());
    }
}
