//! Shared value types for the declarative node domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the data that flows through a node step: the snapshot of field values the
//! workflow author has set, and the items passed between nodes.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// The current value of one field.
///
/// Every scalar display type (`string`, `options`, `dateTime`) is carried as
/// text exactly as the host stores it; interpretation happens in the value
/// transform that consumes it. `collection` fields carry a nested snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A scalar value.
    Text(String),
    /// The values of a collection's nested options.
    Collection(FieldValues),
}

impl FieldValue {
    /// Creates a scalar value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates an empty collection value (`{}`).
    pub fn empty_collection() -> Self {
        Self::Collection(FieldValues::new())
    }

    /// Returns the scalar text, or `None` for a collection.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Collection(_) => None,
        }
    }

    /// Returns the nested values, or `None` for a scalar.
    pub fn as_collection(&self) -> Option<&FieldValues> {
        match self {
            Self::Collection(values) => Some(values),
            Self::Text(_) => None,
        }
    }

    /// Returns `true` for `""` and `{}`.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Collection(values) => values.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<FieldValues> for FieldValue {
    fn from(values: FieldValues) -> Self {
        Self::Collection(values)
    }
}

// ---------------------------------------------------------------------------

/// A snapshot of field values keyed by field name.
///
/// Keys are kept sorted so that two snapshots with the same content compare,
/// print, and serialise identically. Output ordering is driven by the schema,
/// never by this map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(BTreeMap<String, FieldValue>);

impl FieldValues {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the value currently set for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Returns `true` if no field has a value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// One record passed between workflow nodes.
///
/// Mirrors the host's item envelope: the payload lives under `json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The record's JSON payload.
    pub json: Map<String, Value>,
}

impl Item {
    /// Wraps a JSON object. Non-object values produce an empty item.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(json) => Self { json },
            _ => Self::default(),
        }
    }

    /// Returns the string stored under `key`, or `None` if absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.json.get(key).and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Parses a `dateTime` field value into a UTC instant.
///
/// Accepted forms, in order:
///
/// - RFC 3339 with an offset (`2024-03-05T23:00:00+01:00`, `...Z`), converted to UTC;
/// - a naive date-time (`2024-03-05T23:00:00`, optional fraction, `T` or space
///   separator), taken as UTC;
/// - a bare calendar date (`2024-03-05`), taken as UTC midnight.
///
/// Returns `None` for anything else.
pub fn parse_date_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats the UTC calendar date of `instant` as `YYYY-MM-DD`.
pub fn utc_calendar_date(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_values_deserialise_nested_collections() {
        let values: FieldValues = serde_json::from_value(json!({
            "resource": "astronomyPictureOfTheDay",
            "additionalFields": { "apodDate": "2024-01-02T00:00:00" }
        }))
        .unwrap();

        assert_eq!(
            values.get("resource").and_then(FieldValue::as_text),
            Some("astronomyPictureOfTheDay")
        );
        let nested = values
            .get("additionalFields")
            .and_then(FieldValue::as_collection)
            .unwrap();
        assert_eq!(
            nested.get("apodDate"),
            Some(&FieldValue::text("2024-01-02T00:00:00"))
        );
    }

    #[test]
    fn test_empty_values() {
        assert!(FieldValue::text("").is_empty());
        assert!(FieldValue::empty_collection().is_empty());
        assert!(!FieldValue::text("spirit").is_empty());
    }

    #[test]
    fn test_item_get_str_ignores_non_strings() {
        let item = Item::from_value(json!({ "text": 5, "other": "x" }));
        assert_eq!(item.get_str("text"), None);
        assert_eq!(item.get_str("other"), Some("x"));
        assert_eq!(Item::from_value(json!("scalar")), Item::default());
    }

    #[test]
    fn test_parse_date_time_normalises_offsets_to_utc() {
        let instant = parse_date_time("2024-03-06T01:30:00+02:00").unwrap();
        assert_eq!(utc_calendar_date(instant), "2024-03-05");
    }

    #[test]
    fn test_parse_date_time_accepts_naive_and_bare_dates() {
        for raw in [
            "2024-03-05T23:00:00",
            "2024-03-05T23:00:00.000",
            "2024-03-05 23:00:00",
            "2024-03-05T23:00",
            "2024-03-05",
            "2024-03-05T23:59:59.999Z",
        ] {
            let instant = parse_date_time(raw).unwrap_or_else(|| panic!("failed to parse {raw}"));
            assert_eq!(utc_calendar_date(instant), "2024-03-05", "input {raw}");
        }
    }

    #[test]
    fn test_parse_date_time_rejects_garbage() {
        assert!(parse_date_time("next tuesday").is_none());
        assert!(parse_date_time("").is_none());
    }
}
