//! The harvesting loop: locations → sensors → time chunks → measurement pages.
//!
//! Failures are contained at the narrowest unit that can absorb them. A failed sensor
//! lookup empties that one location; a failed measurement request ends that one
//! (sensor, chunk) unit; a bad record is skipped. Only location discovery and writing
//! the output itself can end a run early.

use crate::api::client::OpenAqClient;
use crate::api::transport::Transport;
use crate::config::{ConfigError, HarvestConfig};
use crate::error::HarvestError;
use crate::locations::finder::LocationFinder;
use crate::measurements::chunks::TimeChunks;
use crate::measurements::fetcher::{FetchSettings, MeasurementFetcher};
use crate::measurements::normalize::{normalize, Normalized};
use crate::output::error::OutputError;
use crate::output::RowSink;
use crate::types::location::{Location, Sensor};
use crate::types::outcome::{ChunkOutcome, SensorResolution};
use crate::types::time_chunk::TimeChunk;
use crate::utils::{preview, RECORD_PREVIEW_CHARS};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::fmt;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub locations: usize,
    /// Locations whose sensor lookup failed and were treated as having none.
    pub locations_without_sensors: usize,
    pub sensors: usize,
    pub chunks_completed: usize,
    pub chunks_skipped: usize,
    pub rows: usize,
    /// Records that were empty or not objects.
    pub records_skipped: usize,
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows from {} sensors at {} locations ({} chunks completed, {} skipped, {} records skipped, {} locations without sensors)",
            self.rows,
            self.sensors,
            self.locations,
            self.chunks_completed,
            self.chunks_skipped,
            self.records_skipped,
            self.locations_without_sensors
        )
    }
}

/// Runs a configured harvest against a [`Transport`].
///
/// # Examples
///
/// ```no_run
/// use openaq_harvest::{HarvestConfig, HarvestError, Harvester, OutputSink};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), HarvestError> {
/// let config = HarvestConfig::default().with_env_api_key();
/// let mut sink = OutputSink::from_config(&config.output)?;
/// let harvester = Harvester::from_config(config)?;
///
/// let summary = harvester.run(&mut sink).await?;
/// sink.finish().await?;
/// println!("{}", summary);
/// # Ok(())
/// # }
/// ```
pub struct Harvester<T> {
    transport: T,
    config: HarvestConfig,
}

impl Harvester<OpenAqClient> {
    /// Validates `config` and builds an HTTP client for its base URL and API key.
    pub fn from_config(config: HarvestConfig) -> Result<Self, HarvestError> {
        config.validate()?;
        let client = OpenAqClient::new(&config.base_url, config.api_key.as_deref())?;
        Ok(Self::with_transport(client, config))
    }
}

impl<T: Transport + Sync> Harvester<T> {
    pub fn with_transport(transport: T, config: HarvestConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Harvests the configured lookback window ending now.
    pub async fn run<S: RowSink>(&self, sink: &mut S) -> Result<HarvestSummary, HarvestError> {
        let end = Utc::now();
        let start = end
            .checked_sub_signed(self.config.lookback())
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "lookback of {} days is out of range",
                    self.config.lookback_days
                ))
            })?;
        self.run_window(start, end, sink).await
    }

    /// Harvests `[start, end)` for every sensor around the configured center.
    pub async fn run_window<S: RowSink>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sink: &mut S,
    ) -> Result<HarvestSummary, HarvestError> {
        let config = &self.config;
        let finder = LocationFinder::new(
            &self.transport,
            config.request_delay(),
            config.listing_timeout(),
        );
        let fetcher = MeasurementFetcher::new(
            &self.transport,
            FetchSettings {
                page_limit: config.measurement_page_limit,
                parameters: config.parameters.clone(),
                delay: config.request_delay(),
                timeout: config.measurement_timeout(),
            },
        );
        let plan = TimeChunks::new(start, end, config.chunk_size());

        info!("Discovering locations...");
        let locations = finder
            .find_locations()
            .center(config.center)
            .radius_m(config.radius_m)
            .page_limit(config.location_page_limit)
            .call()
            .await
            .map_err(HarvestError::Discovery)?;

        let mut summary = HarvestSummary {
            locations: locations.len(),
            ..Default::default()
        };

        for location in &locations {
            let resolution = finder.resolve_sensors(location).await;
            if matches!(resolution, SensorResolution::Unavailable { .. }) {
                summary.locations_without_sensors += 1;
            }
            let sensors = resolution.sensors();
            let distance = location
                .coordinates
                .map(|c| format!(" ({:.1} km)", c.distance_km(&config.center)))
                .unwrap_or_default();
            info!(
                "Location {} '{}'{} -> {} sensors",
                location.id,
                location.display_name(),
                distance,
                sensors.len()
            );

            for sensor in sensors {
                summary.sensors += 1;
                info!(
                    "  Sensor {} parameter={}",
                    sensor.id,
                    sensor.parameter.as_deref().unwrap_or("<unknown>")
                );
                for chunk in plan.clone() {
                    debug!("    {}", chunk);
                    let outcome = self
                        .harvest_chunk(&fetcher, location, sensor, chunk, sink, &mut summary)
                        .await?;
                    match outcome {
                        ChunkOutcome::Completed { .. } => summary.chunks_completed += 1,
                        ChunkOutcome::Skipped { reason, .. } => {
                            debug!("    Sensor {} chunk {} skipped: {}", sensor.id, chunk, reason);
                            summary.chunks_skipped += 1;
                        }
                    }
                }
            }
        }

        info!("Harvest finished: {}", summary);
        Ok(summary)
    }

    /// Drains one (sensor, chunk) unit into `sink`, skipping records that do not normalize.
    async fn harvest_chunk<S: RowSink>(
        &self,
        fetcher: &MeasurementFetcher<'_, T>,
        location: &Location,
        sensor: &Sensor,
        chunk: TimeChunk,
        sink: &mut S,
        summary: &mut HarvestSummary,
    ) -> Result<ChunkOutcome, OutputError> {
        let mut pager = fetcher.pager(sensor.id, chunk);
        let mut records = pager.records();
        while let Some(raw) = records.next().await {
            match normalize(&raw) {
                Ok(Normalized::Record(fields)) => {
                    sink.accept(fields.into_row(location, sensor))?;
                    summary.rows += 1;
                }
                Ok(Normalized::NoRecord) => {
                    warn!("    Empty record for sensor {}, chunk {}", sensor.id, chunk);
                    summary.records_skipped += 1;
                }
                Err(e) => {
                    warn!(
                        "    Error processing record for sensor {}: {}. Record preview: {}",
                        sensor.id,
                        e,
                        preview(&raw.to_string(), RECORD_PREVIEW_CHARS)
                    );
                    summary.records_skipped += 1;
                }
            }
        }
        drop(records);
        Ok(pager.finish())
    }
}
