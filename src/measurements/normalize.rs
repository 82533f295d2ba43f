use crate::types::location::ParameterDescriptor;
use crate::types::measurement::MeasurementFields;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("Measurement record is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

/// What a raw record normalized into.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record(MeasurementFields),
    /// The record was `null` or an empty object.
    NoRecord,
}

/// Extracts the known measurement fields from one raw record.
///
/// Missing fields never fail: a record without `coordinates` or `date` yields a row
/// with those fields set to `None`. When `date` is absent the end of the v3 `period`
/// (`period.datetimeTo`) is used instead. `parameter` may be a plain string or an
/// object; `unit` falls back to the parameter object's `units`.
///
/// An empty value of any kind (`null`, `{}`, `[]`, `""`, `false`, `0`) is
/// [`Normalized::NoRecord`]. Only a non-empty record that is not a JSON object is an
/// error.
pub fn normalize(raw: &Value) -> Result<Normalized, NormalizeError> {
    if is_empty(raw) {
        return Ok(Normalized::NoRecord);
    }
    let record = match raw {
        Value::Object(map) => map,
        other => return Err(NormalizeError::NotAnObject(json_kind(other))),
    };

    let coordinates = nested(record, "coordinates").cloned().unwrap_or_default();
    let date = nested(record, "date")
        .or_else(|| nested(record, "period").and_then(|p| nested(p, "datetimeTo")))
        .cloned()
        .unwrap_or_default();
    let parameter = record
        .get("parameter")
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value::<ParameterDescriptor>(v.clone()).ok());

    Ok(Normalized::Record(MeasurementFields {
        parameter: parameter.as_ref().and_then(ParameterDescriptor::name),
        value: record.get("value").and_then(Value::as_f64),
        unit: text(record, "unit")
            .or_else(|| parameter.as_ref().and_then(ParameterDescriptor::units)),
        date_utc: text(&date, "utc"),
        date_local: text(&date, "local"),
        latitude: coordinates.get("latitude").and_then(Value::as_f64),
        longitude: coordinates.get("longitude").and_then(Value::as_f64),
        attribution: record.get("attribution").filter(|v| !v.is_null()).cloned(),
        source_name: text(record, "sourceName"),
        raw: raw.clone(),
    }))
}

/// `null`, `false`, zero, `""`, `[]` and `{}`.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// A nested object field; `null` or a non-object counts as absent.
fn nested<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    record.get(key).and_then(Value::as_object)
}

fn text(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
