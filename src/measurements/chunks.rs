//! Splits the lookback window into request-sized time chunks.

use crate::types::time_chunk::TimeChunk;
use chrono::{DateTime, Duration, Utc};

/// Lazily tiles `[start, end)` with consecutive chunks of at most `chunk_size`.
///
/// Chunk starts strictly increase, each chunk ends where the next begins, and the
/// final chunk is clamped to `end`. An empty window (`start >= end`) or a
/// non-positive chunk size produces no chunks. The iterator is `Clone`, so a plan
/// can be replayed for every sensor.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use openaq_harvest::TimeChunks;
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// let chunks: Vec<_> = TimeChunks::new(start, end, Duration::days(30)).collect();
///
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].date_from(), "2024-01-01T00:00:00Z");
/// assert_eq!(chunks[1].date_to(), "2024-03-01T00:00:00Z");
/// ```
#[derive(Debug, Clone)]
pub struct TimeChunks {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    chunk_size: Duration,
}

impl TimeChunks {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, chunk_size: Duration) -> Self {
        Self {
            cursor: start,
            end,
            chunk_size,
        }
    }
}

impl Iterator for TimeChunks {
    type Item = TimeChunk;

    fn next(&mut self) -> Option<TimeChunk> {
        if self.cursor >= self.end || self.chunk_size <= Duration::zero() {
            return None;
        }
        let start = self.cursor;
        let end = start
            .checked_add_signed(self.chunk_size)
            .map_or(self.end, |next| next.min(self.end));
        self.cursor = end;
        Some(TimeChunk { start, end })
    }
}
