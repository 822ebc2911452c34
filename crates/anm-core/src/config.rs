// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Model-wide settings.

use serde::{Deserialize, Serialize};

/// Settings that shape labels and overlay seeding.
///
/// Missing fields fall back to their defaults when deserialised, so a partial
/// JSON document such as `{"label_separator": "-"}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnmConfig {
    /// Joins label attributes when deriving a node label.
    pub label_separator: String,
    /// Physical-overlay attributes that make up a node label, in order.
    pub label_attrs: Vec<String>,
    /// Attributes copied from `input` into `graphics` by
    /// [`AbstractNetworkModel::initialise_graph`](crate::AbstractNetworkModel::initialise_graph).
    pub graphics_retain: Vec<String>,
}

impl Default for AnmConfig {
    fn default() -> Self {
        Self {
            label_separator: "_".to_owned(),
            label_attrs: vec!["label".to_owned()],
            graphics_retain: [
                "x",
                "y",
                "device_type",
                "device_subtype",
                "pop",
                "label",
                "asn",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let cfg: AnmConfig =
            serde_json::from_str(r#"{"label_separator": "-"}"#).unwrap();
        assert_eq!(cfg.label_separator, "-");
        assert_eq!(cfg.label_attrs, vec!["label".to_owned()]);
        assert!(cfg.graphics_retain.iter().any(|a| a == "asn"));
    }
}
