//! Raw location records and the predicates/projections applied to them.
//!
//! A raw record is kept as a [`serde_json::Value`] until it has been checked:
//! location exports carry many optional and loosely typed fields, and the
//! pipeline only cares about a handful of them.
//!
//! ```json
//! {
//!   "latitudeE7": 498135381,
//!   "longitudeE7": 239857752,
//!   "accuracy": 10,
//!   "activity": [{ "activity": [{ "type": "STILL", "confidence": 98 }], "timestamp": "..." }],
//!   "source": "GPS",
//!   "timestamp": "2022-07-16T06:13:34.749Z"
//! }
//! ```

use chrono::DateTime;
use serde_json::Value;

/// A record as decoded from the source document.
pub type RawRecord = Value;

/// Keys a record must carry to be considered at all.
pub const REQUIRED_FIELDS: &[&str] = &[
    "latitudeE7",
    "longitudeE7",
    "accuracy",
    "activity",
    "timestamp",
];

/// Location projected out of a [`RawRecord`].
///
/// Coordinates are in degrees * 1e7. A field that could not be read is NaN,
/// which [`LocationSample::is_finite`] rejects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    pub epoch_millis: f64,
}

impl LocationSample {
    pub fn new(lat: f64, lng: f64, epoch_millis: f64) -> Self {
        Self {
            lat,
            lng,
            epoch_millis,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.epoch_millis.is_finite()
    }

    pub fn lat_degrees(&self) -> f64 {
        self.lat / 1e7
    }

    pub fn lng_degrees(&self) -> f64 {
        self.lng / 1e7
    }
}

/// True if `record` is an object carrying every [`REQUIRED_FIELDS`] key.
pub fn is_valid_record(record: &RawRecord) -> bool {
    record
        .as_object()
        .is_some_and(|obj| REQUIRED_FIELDS.iter().all(|key| obj.contains_key(*key)))
}

/// True if the record's `accuracy` is a number strictly below `threshold`.
pub fn is_accurate(record: &RawRecord, threshold: f64) -> bool {
    record
        .get("accuracy")
        .and_then(Value::as_f64)
        .is_some_and(|accuracy| accuracy < threshold)
}

/// Projects a record onto `(lat, lng, epochMillis)`.
pub fn parse_location(record: RawRecord) -> LocationSample {
    let number = |key: &str| record.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN);

    let epoch_millis = record
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.timestamp_millis() as f64)
        .unwrap_or(f64::NAN);

    LocationSample::new(number("latitudeE7"), number("longitudeE7"), epoch_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> RawRecord {
        json!({
            "latitudeE7": 498135381,
            "longitudeE7": 239857752,
            "accuracy": 10,
            "activity": [],
            "source": "GPS",
            "deviceTag": 272191583,
            "timestamp": "2022-07-16T06:13:34.749Z"
        })
    }

    #[test]
    fn test_valid_record_with_extra_fields() {
        assert!(is_valid_record(&record()));
    }

    #[test]
    fn test_record_missing_field_is_invalid() {
        for key in REQUIRED_FIELDS {
            let mut r = record();
            r.as_object_mut().unwrap().remove(*key);
            assert!(!is_valid_record(&r), "record without {key} passed");
        }
    }

    #[test]
    fn test_non_object_is_invalid() {
        assert!(!is_valid_record(&json!(null)));
        assert!(!is_valid_record(&json!([1, 2, 3])));
        assert!(!is_valid_record(&json!("latitudeE7")));
    }

    #[test]
    fn test_accuracy_threshold_is_strict() {
        let mut r = record();
        assert!(is_accurate(&r, 50.0));

        r["accuracy"] = json!(49);
        assert!(is_accurate(&r, 50.0));

        r["accuracy"] = json!(50);
        assert!(!is_accurate(&r, 50.0));

        r["accuracy"] = json!("10");
        assert!(!is_accurate(&r, 50.0));
    }

    #[test]
    fn test_parse_location() {
        let sample = parse_location(record());

        assert_eq!(sample.lat, 498135381.0);
        assert_eq!(sample.lng, 239857752.0);
        assert_eq!(sample.epoch_millis, 1657952014749.0);
        assert!(sample.is_finite());
        assert!((sample.lat_degrees() - 49.8135381).abs() < 1e-9);
    }

    #[test]
    fn test_parse_location_with_offset_timestamp() {
        let mut r = record();
        r["timestamp"] = json!("2022-07-16T08:13:34.749+02:00");

        assert_eq!(parse_location(r).epoch_millis, 1657952014749.0);
    }

    #[test]
    fn test_unreadable_fields_are_not_finite() {
        let mut bad_lat = record();
        bad_lat["latitudeE7"] = json!("north");
        assert!(!parse_location(bad_lat).is_finite());

        let mut bad_time = record();
        bad_time["timestamp"] = json!("yesterday");
        assert!(!parse_location(bad_time).is_finite());

        let mut null_lng = record();
        null_lng["longitudeE7"] = Value::Null;
        assert!(!parse_location(null_lng).is_finite());
    }
}
