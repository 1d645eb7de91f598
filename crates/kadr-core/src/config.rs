//! Parser configuration.
//!
//! Everything the pipeline treats as data rather than code lives here: the
//! encoding priority list, the direction labels, the enumeration tables for
//! violation reasons and vehicle types, and the required-field list the
//! external validation collaborator consults. A config is built once by the
//! orchestrator and passed to [`parse`](crate::parse) by shared reference;
//! nothing in the core mutates it, so one config may serve any number of
//! concurrent pipeline invocations.
//!
//! Every field carries a serde default, so an on-disk JSON config may
//! override any subset of the options and inherit the rest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decode::{Encoding, DEFAULT_PRIORITY};

/// Labels assigned to the two direction states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionLabels {
    /// Label for direction code 0 (vehicle approaching the camera)
    #[serde(default = "default_oncoming")]
    pub oncoming: String,
    /// Label for any other present direction code
    #[serde(default = "default_same_direction")]
    pub same_direction: String,
}

impl Default for DirectionLabels {
    fn default() -> Self {
        Self {
            oncoming: default_oncoming(),
            same_direction: default_same_direction(),
        }
    }
}

fn default_oncoming() -> String {
    "oncoming".to_owned()
}

fn default_same_direction() -> String {
    "same-direction".to_owned()
}

fn default_encodings() -> Vec<Encoding> {
    DEFAULT_PRIORITY.to_vec()
}

fn default_violation_reasons() -> BTreeMap<i64, String> {
    BTreeMap::from([
        (1, "speeding".to_owned()),
        (2, "red light".to_owned()),
        (3, "right-of-way violation".to_owned()),
    ])
}

fn default_unknown_reason() -> String {
    "unknown violation".to_owned()
}

fn default_vehicle_types() -> BTreeMap<i64, String> {
    BTreeMap::from([
        (1, "car".to_owned()),
        (2, "truck".to_owned()),
        (3, "bus".to_owned()),
        (4, "motorcycle".to_owned()),
    ])
}

fn default_required_fields() -> Vec<String> {
    vec![
        "v_regno".to_owned(),
        "v_time_check".to_owned(),
        "v_photo_ts".to_owned(),
    ]
}

/// Configuration for the parse pipeline
///
/// Immutable once constructed. The required-field list is published
/// metadata only: the core never enforces it, a caller may consult it
/// after a successful parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Encodings to attempt on the metadata region, in priority order
    #[serde(default = "default_encodings")]
    pub encodings: Vec<Encoding>,

    /// Labels for the two direction states
    #[serde(default)]
    pub direction_labels: DirectionLabels,

    /// Crime-reason code → human-readable violation label
    #[serde(default = "default_violation_reasons")]
    pub violation_reasons: BTreeMap<i64, String>,

    /// Label substituted for a reason code absent from the table
    #[serde(default = "default_unknown_reason")]
    pub unknown_reason: String,

    /// Vehicle-type code → vehicle label
    #[serde(default = "default_vehicle_types")]
    pub vehicle_types: BTreeMap<i64, String>,

    /// Record fields a downstream consumer considers mandatory
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,

    /// Maximum number of frames to extract per input (0 = unlimited)
    #[serde(default)]
    pub max_frames: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            encodings: default_encodings(),
            direction_labels: DirectionLabels::default(),
            violation_reasons: default_violation_reasons(),
            unknown_reason: default_unknown_reason(),
            vehicle_types: default_vehicle_types(),
            required_fields: default_required_fields(),
            max_frames: 0,
        }
    }
}

impl ParserConfig {
    /// Creates a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the encoding priority list
    pub fn encodings(mut self, encodings: Vec<Encoding>) -> Self {
        self.encodings = encodings;
        self
    }

    /// Sets the direction labels
    pub fn direction_labels(mut self, labels: DirectionLabels) -> Self {
        self.direction_labels = labels;
        self
    }

    /// Adds or replaces one violation-reason table entry
    pub fn violation_reason(mut self, code: i64, label: impl Into<String>) -> Self {
        self.violation_reasons.insert(code, label.into());
        self
    }

    /// Sets the label used for unknown reason codes
    pub fn unknown_reason(mut self, label: impl Into<String>) -> Self {
        self.unknown_reason = label.into();
        self
    }

    /// Adds or replaces one vehicle-type table entry
    pub fn vehicle_type(mut self, code: i64, label: impl Into<String>) -> Self {
        self.vehicle_types.insert(code, label.into());
        self
    }

    /// Sets the required-field list
    pub fn required_fields(mut self, fields: Vec<String>) -> Self {
        self.required_fields = fields;
        self
    }

    /// Sets the maximum number of frames to extract (0 = unlimited)
    pub fn max_frames(mut self, max: usize) -> Self {
        self.max_frames = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_tables() {
        let config = ParserConfig::default();
        assert_eq!(config.encodings, DEFAULT_PRIORITY.to_vec());
        assert_eq!(config.violation_reasons[&1], "speeding");
        assert_eq!(config.violation_reasons[&3], "right-of-way violation");
        assert_eq!(config.vehicle_types[&4], "motorcycle");
        assert_eq!(config.unknown_reason, "unknown violation");
        assert_eq!(
            config.required_fields,
            vec!["v_regno", "v_time_check", "v_photo_ts"]
        );
        assert_eq!(config.max_frames, 0);
    }

    #[test]
    fn test_builder() {
        let config = ParserConfig::new()
            .violation_reason(9, "wrong lane")
            .vehicle_type(7, "tram")
            .unknown_reason("unclassified")
            .max_frames(4);

        assert_eq!(config.violation_reasons[&9], "wrong lane");
        assert_eq!(config.vehicle_types[&7], "tram");
        assert_eq!(config.unknown_reason, "unclassified");
        assert_eq!(config.max_frames, 4);
        // Defaults survive alongside the additions.
        assert_eq!(config.violation_reasons[&2], "red light");
    }

    #[test]
    fn test_partial_json_overrides() {
        let config: ParserConfig = serde_json::from_str(
            r#"{
                "encodings": ["utf-8", "latin-1"],
                "direction_labels": {"oncoming": "встречное"},
                "violation_reasons": {"1": "превышение скорости"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.encodings,
            vec![Encoding::Utf8, Encoding::Latin1]
        );
        assert_eq!(config.direction_labels.oncoming, "встречное");
        assert_eq!(config.direction_labels.same_direction, "same-direction");
        assert_eq!(config.violation_reasons[&1], "превышение скорости");
        // A table given in the file replaces the default table entirely.
        assert!(!config.violation_reasons.contains_key(&2));
        assert_eq!(config.unknown_reason, "unknown violation");
    }

    #[test]
    fn test_empty_json_is_all_defaults() {
        let config: ParserConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ParserConfig::default());
    }

    #[test]
    fn test_round_trip() {
        let config = ParserConfig::new().violation_reason(5, "seat belt");
        let json = serde_json::to_string(&config).unwrap();
        let back: ParserConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
