//! Location and sensor descriptors as returned by the OpenAQ listing endpoints,
//! and the canonical forms the harvesting loop works with.
//!
//! The wire types are deliberately lenient: every field is optional, and the sensor
//! parameter may arrive either as a bare string or as an object. Conversion into
//! [`Location`] / [`Sensor`] resolves that ambiguity once, so nothing downstream has
//! to care which shape the server sent.

use haversine::{distance, Location as HaversineLocation, Units};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use openaq_harvest::LatLon;
///
/// let kathmandu = LatLon(27.717245, 85.323960);
/// assert_eq!(kathmandu.0, 27.717245); // Latitude
/// assert_eq!(kathmandu.to_string(), "27.717245,85.32396");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    /// Great-circle distance in kilometers.
    pub fn distance_km(&self, other: &LatLon) -> f64 {
        distance(
            HaversineLocation {
                latitude: self.0,
                longitude: self.1,
            },
            HaversineLocation {
                latitude: other.0,
                longitude: other.1,
            },
            Units::Kilometers,
        )
    }
}

/// Formats as `lat,lon`, the form the locations endpoint expects.
impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

/// Reads a field as `T`, treating a value of the wrong shape like an absent one.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Reads an array element by element, dropping the elements that are not a `T`.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// The `coordinates` object attached to locations and measurements.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Coordinates {
    #[serde(default, deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub longitude: Option<f64>,
}

impl Coordinates {
    pub fn lat_lon(&self) -> Option<LatLon> {
        Some(LatLon(self.latitude?, self.longitude?))
    }
}

/// A measured parameter as the API describes it.
///
/// Sensors and measurements carry either a plain name (`"pm25"`) or an object
/// (`{"id": 2, "name": "pm25", "units": "µg/m³", "displayName": "PM2.5"}`).
/// Anything else is kept as [`ParameterDescriptor::Unrecognized`] and resolves to no name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParameterDescriptor {
    Name(String),
    Detailed(ParameterDetails),
    Unrecognized(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParameterDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "displayName", alias = "display_name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

impl ParameterDescriptor {
    /// The canonical parameter name: the bare string, or `name` falling back to `displayName`.
    pub fn name(&self) -> Option<String> {
        match self {
            ParameterDescriptor::Name(name) => Some(name.clone()),
            ParameterDescriptor::Detailed(details) => details
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .or_else(|| details.display_name.clone()),
            ParameterDescriptor::Unrecognized(_) => None,
        }
    }

    pub fn units(&self) -> Option<String> {
        match self {
            ParameterDescriptor::Detailed(details) => details.units.clone(),
            _ => None,
        }
    }
}

/// A sensor entry from `/locations` or `/locations/{id}/sensors`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorDescriptor {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default)]
    pub parameter: Option<ParameterDescriptor>,
}

/// A location entry from `/locations`.
///
/// Each field is read on its own: a malformed `name`, `coordinates` or sensor entry
/// is dropped without losing the rest of the location.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocationDescriptor {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub sensors: Option<Vec<SensorDescriptor>>,
}

/// A single instrument at a location, with its parameter name resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub id: i64,
    pub parameter: Option<String>,
}

impl Sensor {
    /// `None` when the descriptor has no id to fetch measurements for.
    pub fn from_descriptor(descriptor: SensorDescriptor) -> Option<Self> {
        Some(Sensor {
            id: descriptor.id?,
            parameter: descriptor.parameter.as_ref().and_then(|p| p.name()),
        })
    }
}

/// A monitoring site. `sensors` is empty when the listing did not embed any.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: Option<String>,
    pub coordinates: Option<LatLon>,
    pub sensors: Vec<Sensor>,
}

impl Location {
    /// `None` when the descriptor has no id. Embedded sensors without an id are dropped.
    pub fn from_descriptor(descriptor: LocationDescriptor) -> Option<Self> {
        Some(Location {
            id: descriptor.id?,
            name: descriptor.name,
            coordinates: descriptor.coordinates.and_then(|c| c.lat_lon()),
            sensors: descriptor
                .sensors
                .unwrap_or_default()
                .into_iter()
                .filter_map(Sensor::from_descriptor)
                .collect(),
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sensor(value: Value) -> Sensor {
        let descriptor: SensorDescriptor = serde_json::from_value(value).unwrap();
        Sensor::from_descriptor(descriptor).unwrap()
    }

    #[test]
    fn string_and_object_parameters_resolve_to_same_name() {
        let bare = sensor(json!({ "id": 1, "parameter": "pm25" }));
        let object = sensor(json!({
            "id": 1,
            "parameter": { "id": 2, "name": "pm25", "units": "µg/m³" }
        }));
        assert_eq!(bare.parameter.as_deref(), Some("pm25"));
        assert_eq!(bare.parameter, object.parameter);
    }

    #[test]
    fn display_name_is_fallback() {
        let snake = sensor(json!({ "id": 1, "parameter": { "display_name": "PM10" } }));
        let camel = sensor(json!({ "id": 1, "parameter": { "displayName": "PM10" } }));
        assert_eq!(snake.parameter.as_deref(), Some("PM10"));
        assert_eq!(camel.parameter.as_deref(), Some("PM10"));
    }

    #[test]
    fn odd_parameter_shapes_resolve_to_none() {
        assert_eq!(sensor(json!({ "id": 1, "parameter": 7 })).parameter, None);
        assert_eq!(sensor(json!({ "id": 1, "parameter": null })).parameter, None);
        assert_eq!(sensor(json!({ "id": 1 })).parameter, None);
    }

    #[test]
    fn location_drops_sensors_without_id() {
        let descriptor: LocationDescriptor = serde_json::from_value(json!({
            "id": 10,
            "name": "Ratnapark",
            "coordinates": { "latitude": 27.7, "longitude": 85.3 },
            "sensors": [{ "id": 100, "parameter": "pm25" }, { "parameter": "pm10" }]
        }))
        .unwrap();
        let location = Location::from_descriptor(descriptor).unwrap();
        assert_eq!(location.sensors.len(), 1);
        assert_eq!(location.coordinates, Some(LatLon(27.7, 85.3)));
    }

    #[test]
    fn malformed_fields_do_not_drop_location() {
        let descriptor: LocationDescriptor = serde_json::from_value(json!({
            "id": 11,
            "name": 42,
            "coordinates": { "latitude": "27.7", "longitude": 85.3 },
            "sensors": [{ "id": 110, "parameter": "pm25" }, "garbage", { "id": "x" }]
        }))
        .unwrap();
        let location = Location::from_descriptor(descriptor).unwrap();
        assert_eq!(location.id, 11);
        assert_eq!(location.name, None);
        assert_eq!(location.coordinates, None);
        assert_eq!(
            location.sensors,
            vec![Sensor {
                id: 110,
                parameter: Some("pm25".to_string())
            }]
        );
    }

    #[test]
    fn coordinates_of_wrong_shape_are_absent() {
        let raw = json!({ "id": 12, "coordinates": [27.7, 85.3] });
        let descriptor: LocationDescriptor = serde_json::from_value(raw).unwrap();
        assert_eq!(descriptor.coordinates, None);
        assert_eq!(descriptor.id, Some(12));
    }

    #[test]
    fn location_without_id_is_rejected() {
        let descriptor: LocationDescriptor =
            serde_json::from_value(json!({ "name": "nowhere" })).unwrap();
        assert!(Location::from_descriptor(descriptor).is_none());
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LatLon(27.717245, 85.323960);
        let b = LatLon(27.6710, 85.3240);
        let d = a.distance_km(&b);
        assert!(d > 4.0 && d < 6.0, "got {d}");
        assert!((d - b.distance_km(&a)).abs() < 1e-9);
    }
}
