//! Field normalization and the violation record.
//!
//! The normalizer takes the extracted frames and the recovered metadata
//! objects and assembles the one fixed-schema [`ViolationRecord`] the
//! downstream delivery service accepts. The last recovered object is
//! authoritative: device firmware appends the final, most complete block
//! last, and later duplicates override earlier fragments of the same event.
//!
//! Every field derives independently. A missing section or a malformed
//! value collapses that one field to its default; nothing short of zero
//! frames or zero objects aborts record construction.

pub mod coerce;
pub mod map;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::recover::JsonObject;
use crate::scanner::Frame;

use self::coerce::Coerced;

/// Timestamp output format: ISO-8601, millisecond precision, no zone suffix
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// One normalized violation event, ready for JSON delivery
///
/// The schema is fixed: every field is always present in the serialized
/// form, at its type's zero value when the source carried nothing usable.
/// Construction guarantees the record is JSON-encodable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Camera azimuth; carried for the downstream schema, never reported
    /// by the device sections
    pub v_azimut: f64,
    /// Speed-meter unit name
    pub v_camera: String,
    /// Factory serial number of the camera
    pub v_camera_serial: String,
    /// Human-readable installation place
    pub v_camera_place: String,
    /// Travel direction label (oncoming / same-direction)
    pub v_direction: String,
    /// Name of the lane or approach matching the direction
    pub v_direction_name: String,
    /// Latitude in decimal degrees
    pub v_gps_x: f64,
    /// Longitude in decimal degrees
    pub v_gps_y: f64,
    /// Primary photo, base64
    pub v_photo_ts: String,
    /// Auxiliary photos, base64, in file order
    pub v_photo_extra: Vec<String>,
    /// Violation reason labels
    pub v_pr_viol: Vec<String>,
    /// Registration plate with separators stripped
    pub v_regno: String,
    /// Plate country code
    pub v_regno_country_id: String,
    /// Measured vehicle speed
    pub v_speed: f64,
    /// Speed of the patrol vehicle carrying the camera
    pub v_self_speed: f64,
    /// Posted speed limit
    pub v_speed_limit: i64,
    /// Violation timestamp, ISO-8601 with millisecond precision
    pub v_time_check: String,
    /// Vehicle type label
    pub v_ts_type: String,
    /// Vehicle `mark/model` composite
    pub v_ts_model: String,
}

impl ViolationRecord {
    /// Serialized field names, in schema order
    pub const FIELD_NAMES: [&'static str; 19] = [
        "v_azimut",
        "v_camera",
        "v_camera_serial",
        "v_camera_place",
        "v_direction",
        "v_direction_name",
        "v_gps_x",
        "v_gps_y",
        "v_photo_ts",
        "v_photo_extra",
        "v_pr_viol",
        "v_regno",
        "v_regno_country_id",
        "v_speed",
        "v_self_speed",
        "v_speed_limit",
        "v_time_check",
        "v_ts_type",
        "v_ts_model",
    ];

    /// Returns whether the named field still holds its default value
    ///
    /// `None` for a name outside the schema. Used by callers consulting
    /// the required-field list of [`ParserConfig`].
    pub fn is_field_default(&self, name: &str) -> Option<bool> {
        let default = match name {
            "v_azimut" => self.v_azimut == 0.0,
            "v_camera" => self.v_camera.is_empty(),
            "v_camera_serial" => self.v_camera_serial.is_empty(),
            "v_camera_place" => self.v_camera_place.is_empty(),
            "v_direction" => self.v_direction.is_empty(),
            "v_direction_name" => self.v_direction_name.is_empty(),
            "v_gps_x" => self.v_gps_x == 0.0,
            "v_gps_y" => self.v_gps_y == 0.0,
            "v_photo_ts" => self.v_photo_ts.is_empty(),
            "v_photo_extra" => self.v_photo_extra.is_empty(),
            "v_pr_viol" => self.v_pr_viol.is_empty(),
            "v_regno" => self.v_regno.is_empty(),
            "v_regno_country_id" => self.v_regno_country_id.is_empty(),
            "v_speed" => self.v_speed == 0.0,
            "v_self_speed" => self.v_self_speed == 0.0,
            "v_speed_limit" => self.v_speed_limit == 0,
            "v_time_check" => self.v_time_check.is_empty(),
            "v_ts_type" => self.v_ts_type.is_empty(),
            "v_ts_model" => self.v_ts_model.is_empty(),
            _ => return None,
        };
        Some(default)
    }
}

/// Builds the normalized record from frames and recovered metadata objects
///
/// The last object is authoritative. Fails with
/// [`Error::InsufficientData`] when either input sequence is empty; every
/// other irregularity degrades to per-field defaults. `now` feeds the
/// timestamp fallback, injected so a caller can pin it.
pub fn build_record(
    frames: &[Frame<'_>],
    objects: &[JsonObject],
    config: &ParserConfig,
    now: DateTime<Utc>,
) -> Result<ViolationRecord> {
    if frames.is_empty() {
        return Err(Error::insufficient_data("no image frames in input"));
    }
    let Some(authoritative) = objects.last() else {
        return Err(Error::insufficient_data("no metadata objects recovered"));
    };
    debug!(
        "building record from {} frames and {} objects",
        frames.len(),
        objects.len()
    );

    let place = section(authoritative, "installation_place_info");
    let violation = section(authoritative, "violation_info");
    let recogniser = section(authoritative, "recogniser_info");

    let (v_direction, v_direction_name) = derive_direction(violation, place, config);
    let timestamp = derive_timestamp(violation, now);
    if timestamp.defaulted {
        trace!("no usable epoch, substituted processing time");
    }

    Ok(ViolationRecord {
        v_azimut: 0.0,
        v_camera: mapped_text(authoritative, "v_camera"),
        v_camera_serial: mapped_text(authoritative, "v_camera_serial"),
        v_camera_place: mapped_text(authoritative, "v_camera_place"),
        v_direction,
        v_direction_name,
        v_gps_x: coerce::coordinate(map::source_value(authoritative, "v_gps_x")).value,
        v_gps_y: coerce::coordinate(map::source_value(authoritative, "v_gps_y")).value,
        v_photo_ts: frames[0].to_base64(),
        v_photo_extra: frames[1..].iter().map(Frame::to_base64).collect(),
        v_pr_viol: derive_reasons(violation, config),
        v_regno: coerce::plate(map::source_value(authoritative, "v_regno")).value,
        v_regno_country_id: mapped_text(authoritative, "v_regno_country_id"),
        v_speed: coerce::float(map::source_value(authoritative, "v_speed")).value,
        v_self_speed: coerce::float(map::source_value(authoritative, "v_self_speed")).value,
        v_speed_limit: coerce::int(map::source_value(authoritative, "v_speed_limit")).value,
        v_time_check: timestamp.value,
        v_ts_type: derive_vehicle_type(violation, config),
        v_ts_model: derive_model(recogniser),
    })
}

fn section<'a>(obj: &'a JsonObject, name: &str) -> Option<&'a JsonObject> {
    obj.get(name).and_then(Value::as_object)
}

fn field<'a>(sec: Option<&'a JsonObject>, key: &str) -> Option<&'a Value> {
    sec.and_then(|s| s.get(key))
}

fn mapped_text(obj: &JsonObject, name: &str) -> String {
    coerce::text(map::source_value(obj, name)).value
}

/// Chooses the direction label pair from the direction code
///
/// Code 0 is oncoming traffic; any other present numeric code is
/// same-direction. An absent or non-numeric code leaves both fields empty
/// rather than claiming a direction for data that carried none.
fn derive_direction(
    violation: Option<&JsonObject>,
    place: Option<&JsonObject>,
    config: &ParserConfig,
) -> (String, String) {
    match coerce::number(field(violation, "direction")).map(|code| code as i64) {
        Some(0) => (
            config.direction_labels.oncoming.clone(),
            coerce::text(field(place, "place_incoming")).value,
        ),
        Some(_) => (
            config.direction_labels.same_direction.clone(),
            coerce::text(field(place, "place_outcoming")).value,
        ),
        None => (String::new(), String::new()),
    }
}

/// Reconstructs the violation timestamp
///
/// Epoch seconds plus the `ms` millisecond offset plus the `timezone` code
/// taken as whole hours. A missing or unparseable epoch substitutes `now`;
/// epoch 0 is a valid instant, not a fallback trigger.
fn derive_timestamp(violation: Option<&JsonObject>, now: DateTime<Utc>) -> Coerced<String> {
    let Some(epoch) = coerce::number(field(violation, "UTC")) else {
        return Coerced::fallback(format_timestamp(now));
    };
    let Some(base) = Utc.timestamp_millis_opt((epoch * 1000.0) as i64).single() else {
        return Coerced::fallback(format_timestamp(now));
    };

    let millis = coerce::int(field(violation, "ms")).value;
    let tz_hours = coerce::int(field(violation, "timezone")).value;
    let shifted = Duration::try_milliseconds(millis)
        .and_then(|ms| Duration::try_hours(tz_hours).and_then(|tz| ms.checked_add(&tz)))
        .and_then(|offset| base.checked_add_signed(offset));

    match shifted {
        Some(dt) => Coerced::parsed(format_timestamp(dt)),
        None => Coerced::fallback(format_timestamp(now)),
    }
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Looks the crime-reason code up in the configured table
///
/// A present code outside the table yields the configured placeholder; an
/// absent code yields an empty list.
fn derive_reasons(violation: Option<&JsonObject>, config: &ParserConfig) -> Vec<String> {
    match coerce::number(field(violation, "crime_reason")).map(|code| code as i64) {
        Some(code) => vec![config
            .violation_reasons
            .get(&code)
            .cloned()
            .unwrap_or_else(|| config.unknown_reason.clone())],
        None => Vec::new(),
    }
}

fn derive_vehicle_type(violation: Option<&JsonObject>, config: &ParserConfig) -> String {
    coerce::number(field(violation, "type"))
        .map(|code| code as i64)
        .and_then(|code| config.vehicle_types.get(&code).cloned())
        .unwrap_or_default()
}

/// Composes the `mark/model` vehicle description
///
/// One empty component is allowed (`"/model"`); both empty yields the
/// empty string, not a bare slash.
fn derive_model(recogniser: Option<&JsonObject>) -> String {
    let mark = coerce::text(field(recogniser, "mark")).value;
    let model = coerce::text(field(recogniser, "model")).value;
    if mark.is_empty() && model.is_empty() {
        String::new()
    } else {
        format!("{}/{}", mark, model)
    }
}
