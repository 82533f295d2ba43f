//! Discovers monitoring locations around a point and resolves their sensors.

use crate::api::error::ApiError;
use crate::api::transport::{ApiRequest, Transport};
use crate::types::location::{LatLon, Location, LocationDescriptor, Sensor, SensorDescriptor};
use crate::types::outcome::SensorResolution;
use bon::bon;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

const DEFAULT_PAGE_LIMIT: usize = 100;

/// Talks to the listing endpoints (`/locations`, `/locations/{id}/sensors`).
pub struct LocationFinder<'a, T> {
    transport: &'a T,
    delay: Duration,
    timeout: Duration,
}

#[bon]
impl<'a, T: Transport + Sync> LocationFinder<'a, T> {
    /// `delay` separates consecutive page requests; `timeout` applies to each listing request.
    pub fn new(transport: &'a T, delay: Duration, timeout: Duration) -> Self {
        Self {
            transport,
            delay,
            timeout,
        }
    }

    /// Collects every location within `radius_m` meters of `center`.
    ///
    /// Pages are requested from 1 upward until a page comes back empty or shorter than
    /// `page_limit` (default 100, at least 1). Locations are deduplicated by id, keeping the first
    /// occurrence, in the order the API returned them. Descriptors without an id are
    /// logged and dropped.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-success status or undecodable page is returned as an
    /// [`ApiError`]. Discovery has no partial-success mode: without the location list the
    /// run cannot proceed.
    #[builder]
    pub async fn find_locations(
        &self,
        center: LatLon,
        radius_m: u32,
        page_limit: Option<usize>,
    ) -> Result<Vec<Location>, ApiError> {
        let page_limit = page_limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1);
        let mut seen = HashSet::new();
        let mut locations = Vec::new();
        let mut page = 1u32;

        loop {
            let request = ApiRequest::new("/locations", self.timeout)
                .param("coordinates", center)
                .param("radius", radius_m)
                .param("limit", page_limit)
                .param("page", page);
            let response = self.transport.get(&request).await?;
            let results = response.error_for_status()?.results()?;
            debug!("Locations page {} returned {} results", page, results.len());
            if results.is_empty() {
                break;
            }
            let page_len = results.len();

            for value in results {
                match parse_location(value) {
                    Some(location) if seen.insert(location.id) => locations.push(location),
                    Some(location) => debug!("Skipping duplicate location {}", location.id),
                    None => {}
                }
            }

            if page_len < page_limit {
                break;
            }
            page += 1;
            tokio::time::sleep(self.delay).await;
        }

        info!(
            "Found {} locations within {} m of {}",
            locations.len(),
            radius_m,
            center
        );
        Ok(locations)
    }

    /// Returns the location's embedded sensors, or asks `/locations/{id}/sensors` when
    /// there are none. A failed lookup leaves the location with no sensors.
    pub async fn resolve_sensors(&self, location: &Location) -> SensorResolution {
        if !location.sensors.is_empty() {
            return SensorResolution::Embedded(location.sensors.clone());
        }
        match self.fetch_sensors(location.id).await {
            Ok(sensors) => SensorResolution::Fallback(sensors),
            Err(e) => {
                warn!("Could not fetch sensors for location {}: {}", location.id, e);
                SensorResolution::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch_sensors(&self, location_id: i64) -> Result<Vec<Sensor>, ApiError> {
        let request = ApiRequest::new(format!("/locations/{}/sensors", location_id), self.timeout);
        let response = self.transport.get(&request).await?;
        let results = response.error_for_status()?.results()?;
        Ok(results
            .into_iter()
            .filter_map(|value| {
                let sensor = serde_json::from_value::<SensorDescriptor>(value)
                    .ok()
                    .and_then(Sensor::from_descriptor);
                if sensor.is_none() {
                    warn!("Location {}: ignoring sensor without a usable id", location_id);
                }
                sensor
            })
            .collect())
    }
}

fn parse_location(value: Value) -> Option<Location> {
    let descriptor = match serde_json::from_value::<LocationDescriptor>(value.clone()) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            warn!("Ignoring malformed location {}: {}", value, e);
            return None;
        }
    };
    let location = Location::from_descriptor(descriptor);
    if location.is_none() {
        warn!("Ignoring location without an id: {}", value);
    }
    location
}
