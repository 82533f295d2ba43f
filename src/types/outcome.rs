//! Per-unit results. Each stage reports what happened to its unit of work instead of
//! raising, and the harvester decides whether to continue.

use crate::types::location::Sensor;
use reqwest::StatusCode;
use std::fmt;

/// Why a (sensor, time-chunk) unit stopped early.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The sensor has no measurements endpoint (HTTP 404).
    NotFound,
    /// Any other non-success status.
    HttpStatus { status: StatusCode },
    /// The request never produced a usable response: network error, timeout,
    /// or a body that is not the expected JSON.
    Transport(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::HttpStatus { status } => write!(f, "HTTP {}", status),
            SkipReason::Transport(message) => write!(f, "transport error: {}", message),
        }
    }
}

/// Result of draining one (sensor, time-chunk) unit.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// Pagination ran to its natural end. `records` counts what was yielded,
    /// across `pages` requests.
    Completed { pages: u32, records: usize },
    /// Stopped after `records` records; nothing further was fetched for this unit.
    Skipped { reason: SkipReason, records: usize },
}

impl ChunkOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ChunkOutcome::Skipped { .. })
    }

    pub fn records(&self) -> usize {
        match self {
            ChunkOutcome::Completed { records, .. } | ChunkOutcome::Skipped { records, .. } => {
                *records
            }
        }
    }
}

/// Where a location's sensor list came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorResolution {
    Embedded(Vec<Sensor>),
    Fallback(Vec<Sensor>),
    /// The fallback lookup failed; the location is treated as having no sensors.
    Unavailable { reason: String },
}

impl SensorResolution {
    pub fn sensors(&self) -> &[Sensor] {
        match self {
            SensorResolution::Embedded(sensors) | SensorResolution::Fallback(sensors) => sensors,
            SensorResolution::Unavailable { .. } => &[],
        }
    }
}
