use chrono::{DateTime, Utc};
use std::fmt;

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Formats a timestamp the way the measurements endpoint expects `date_from` / `date_to`.
pub fn iso_utc(datetime: DateTime<Utc>) -> String {
    datetime.format(WIRE_FORMAT).to_string()
}

/// A half-open `[start, end)` slice of the query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeChunk {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeChunk {
    pub fn date_from(&self) -> String {
        iso_utc(self.start)
    }

    pub fn date_to(&self) -> String {
        iso_utc(self.end)
    }
}

impl fmt::Display for TimeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.date_from(), self.date_to())
    }
}
