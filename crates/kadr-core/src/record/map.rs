//! Declarative field mapping: output field → dotted source path.
//!
//! The straight lookups of the record schema are data, not code. Each
//! [`FieldSpec`] binds an output field name to the dotted path of its source
//! value inside the authoritative metadata object and to the coercion applied
//! on the way through. The table is public so callers and tests can enumerate
//! exactly which fields are mapped and from where.
//!
//! Computed fields (direction pair, timestamp, reason list, vehicle type,
//! model composite, photos) do not fit a single path lookup and are derived
//! directly by the normalizer.

use serde_json::Value;

use crate::recover::JsonObject;

/// The coercion a mapped field applies to its source value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain text lookup ([`coerce::text`](super::coerce::text))
    Text,
    /// Plate text with `|` separators stripped
    Plate,
    /// GPS coordinate with hemisphere-letter scrub
    Coordinate,
    /// Lenient float
    Float,
    /// Lenient integer
    Int,
}

/// One output field and where its value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Output field name, exactly as serialized
    pub name: &'static str,
    /// Dotted path into the authoritative metadata object
    pub path: &'static str,
    /// Coercion applied to the looked-up value
    pub kind: FieldKind,
}

/// The path-mapped subset of the record schema
pub const FIELD_MAP: &[FieldSpec] = &[
    FieldSpec {
        name: "v_camera",
        path: "device_info.name_speed_meter",
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "v_camera_serial",
        path: "device_info.factory_number",
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "v_camera_place",
        path: "installation_place_info.place",
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "v_gps_x",
        path: "installation_place_info.latitude",
        kind: FieldKind::Coordinate,
    },
    FieldSpec {
        name: "v_gps_y",
        path: "installation_place_info.longitude",
        kind: FieldKind::Coordinate,
    },
    FieldSpec {
        name: "v_regno",
        path: "recogniser_info.plate_chars",
        kind: FieldKind::Plate,
    },
    FieldSpec {
        name: "v_regno_country_id",
        path: "recogniser_info.plate_code",
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "v_speed",
        path: "violation_info.speed",
        kind: FieldKind::Float,
    },
    FieldSpec {
        name: "v_self_speed",
        path: "violation_info.self_speed",
        kind: FieldKind::Float,
    },
    FieldSpec {
        name: "v_speed_limit",
        path: "installation_place_info.speed_limit",
        kind: FieldKind::Int,
    },
];

/// Resolves a dotted path inside a metadata object
///
/// Each path segment before the last must be an object; a missing segment
/// or a non-object intermediate yields `None`, never an error.
pub fn value_at<'a>(obj: &'a JsonObject, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = obj.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Looks up the source value for a mapped output field
///
/// Returns `None` both for an unmapped field name and for a mapped field
/// whose path resolves to nothing.
pub fn source_value<'a>(obj: &'a JsonObject, field: &str) -> Option<&'a Value> {
    FIELD_MAP
        .iter()
        .find(|spec| spec.name == field)
        .and_then(|spec| value_at(obj, spec.path))
}
