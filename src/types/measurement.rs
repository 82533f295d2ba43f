//! The flat row every harvested measurement is turned into.

use crate::types::location::{Location, Sensor};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Fields extracted from one raw measurement record.
///
/// Every field except `raw` may be missing in the source; missing fields are `None`
/// and end up as empty cells in a table or `null` in NDJSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementFields {
    pub parameter: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub date_utc: Option<String>,
    pub date_local: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(serialize_with = "stringify_opt")]
    pub attribution: Option<Value>,
    pub source_name: Option<String>,
    /// The record exactly as received.
    #[serde(serialize_with = "stringify")]
    pub raw: Value,
}

impl MeasurementFields {
    pub fn into_row(self, location: &Location, sensor: &Sensor) -> MeasurementRow {
        MeasurementRow {
            location_id: location.id,
            location_name: location.name.clone(),
            sensor_id: sensor.id,
            sensor_parameter: sensor.parameter.clone(),
            fields: self,
        }
    }
}

/// A normalized measurement with its owning location and sensor attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRow {
    pub location_id: i64,
    pub location_name: Option<String>,
    pub sensor_id: i64,
    pub sensor_parameter: Option<String>,
    #[serde(flatten)]
    pub fields: MeasurementFields,
}

impl MeasurementRow {
    /// Column order used for tabular output. Matches the serialized field order.
    pub const COLUMNS: [&'static str; 14] = [
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_parameter",
        "parameter",
        "value",
        "unit",
        "date_utc",
        "date_local",
        "latitude",
        "longitude",
        "attribution",
        "source_name",
        "raw",
    ];
}

/// Renders a JSON value as text: strings as-is, everything else as compact JSON.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn stringify<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value_to_text(value))
}

fn stringify_opt<S: Serializer>(value: &Option<Value>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&value_to_text(v)),
        None => serializer.serialize_none(),
    }
}
