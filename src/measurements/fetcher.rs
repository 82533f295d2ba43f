//! Paginated retrieval of one sensor's measurements for one time chunk.

use crate::api::transport::{ApiRequest, Transport};
use crate::types::outcome::{ChunkOutcome, SkipReason};
use crate::types::time_chunk::TimeChunk;
use crate::utils::{preview, BODY_PREVIEW_CHARS};
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, warn};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Request settings shared by every (sensor, chunk) unit of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Records requested per page; a shorter page is treated as the last one.
    /// Zero is sent as 1.
    pub page_limit: usize,
    /// Parameter allow-list sent as a comma-joined `parameter` filter. Empty means all.
    pub parameters: Vec<String>,
    /// Pause before every page request after the first.
    pub delay: Duration,
    pub timeout: Duration,
}

pub struct MeasurementFetcher<'a, T> {
    transport: &'a T,
    settings: FetchSettings,
}

impl<'a, T: Transport + Sync> MeasurementFetcher<'a, T> {
    pub fn new(transport: &'a T, settings: FetchSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Starts paginating `/sensors/{sensor_id}/measurements` over `chunk`.
    /// Nothing is requested until the pager is polled.
    pub fn pager(&self, sensor_id: i64, chunk: TimeChunk) -> MeasurementPager<'_, T> {
        MeasurementPager {
            transport: self.transport,
            settings: &self.settings,
            sensor_id,
            chunk,
            next_page: 1,
            pages: 0,
            records: 0,
            outcome: None,
        }
    }
}

/// Walks the pages of a single (sensor, chunk) unit.
///
/// Pages are requested lazily, one per [`MeasurementPager::next_page`] call, starting
/// at page 1. The unit ends on an empty page, on a page shorter than the page limit,
/// or on any failure; failures are logged and recorded in the [`ChunkOutcome`]
/// returned by [`MeasurementPager::finish`], never raised.
pub struct MeasurementPager<'a, T> {
    transport: &'a T,
    settings: &'a FetchSettings,
    sensor_id: i64,
    chunk: TimeChunk,
    next_page: u32,
    pages: u32,
    records: usize,
    outcome: Option<ChunkOutcome>,
}

impl<'a, T: Transport + Sync> MeasurementPager<'a, T> {
    fn page_limit(&self) -> usize {
        self.settings.page_limit.max(1)
    }

    fn request(&self) -> ApiRequest {
        let mut request = ApiRequest::new(
            format!("/sensors/{}/measurements", self.sensor_id),
            self.settings.timeout,
        )
        .param("date_from", self.chunk.date_from())
        .param("date_to", self.chunk.date_to())
        .param("limit", self.page_limit())
        .param("page", self.next_page);
        if !self.settings.parameters.is_empty() {
            request = request.param("parameter", self.settings.parameters.join(","));
        }
        request
    }

    fn complete(&mut self) {
        self.outcome = Some(ChunkOutcome::Completed {
            pages: self.pages,
            records: self.records,
        });
    }

    fn skip(&mut self, reason: SkipReason) {
        self.outcome = Some(ChunkOutcome::Skipped {
            reason,
            records: self.records,
        });
    }

    /// Fetches the next page. `None` once the unit has ended, for whatever reason.
    pub async fn next_page(&mut self) -> Option<Vec<Value>> {
        if self.outcome.is_some() {
            return None;
        }
        if self.next_page > 1 {
            tokio::time::sleep(self.settings.delay).await;
        }

        let request = self.request();
        let response = match self.transport.get(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Sensor {}: request failed for {} (page {}): {}",
                    self.sensor_id, self.chunk, self.next_page, e
                );
                self.skip(SkipReason::Transport(e.to_string()));
                return None;
            }
        };
        self.pages += 1;

        if response.status == StatusCode::NOT_FOUND {
            warn!("Sensor {}: 404 Not Found for URL: {}", self.sensor_id, response.url);
            self.skip(SkipReason::NotFound);
            return None;
        }
        if !response.status.is_success() {
            warn!(
                "Sensor {}: HTTP {} - skipping chunk {}. Body: {}",
                self.sensor_id,
                response.status,
                self.chunk,
                preview(&response.body, BODY_PREVIEW_CHARS)
            );
            self.skip(SkipReason::HttpStatus {
                status: response.status,
            });
            return None;
        }

        let results = match response.results() {
            Ok(results) => results,
            Err(e) => {
                warn!("Sensor {}: unreadable page for {}: {}", self.sensor_id, self.chunk, e);
                self.skip(SkipReason::Transport(e.to_string()));
                return None;
            }
        };
        debug!(
            "Sensor {}: page {} of {} returned {} records",
            self.sensor_id,
            self.next_page,
            self.chunk,
            results.len()
        );

        if results.is_empty() {
            self.complete();
            return None;
        }
        self.records += results.len();
        if results.len() < self.page_limit() {
            self.complete();
        } else {
            self.next_page += 1;
        }
        Some(results)
    }

    /// The unit's records as a lazy stream, one record at a time.
    pub fn records(&mut self) -> BoxStream<'_, Value> {
        stream::unfold(self, |pager| async move {
            pager.next_page().await.map(|page| (page, pager))
        })
        .flat_map(stream::iter)
        .boxed()
    }

    /// How the unit ended. A pager dropped before exhaustion reports what it saw so far.
    pub fn finish(self) -> ChunkOutcome {
        self.outcome.unwrap_or(ChunkOutcome::Completed {
            pages: self.pages,
            records: self.records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::scripted::{numbered, ScriptedTransport};
    use chrono::{TimeZone, Utc};
    use tokio::time::Instant;

    fn settings(page_limit: usize, parameters: &[&str]) -> FetchSettings {
        FetchSettings {
            page_limit,
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            delay: Duration::ZERO,
            timeout: Duration::from_secs(60),
        }
    }

    fn chunk() -> TimeChunk {
        TimeChunk {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
        }
    }

    async fn drain<T: Transport + Sync>(
        fetcher: &MeasurementFetcher<'_, T>,
    ) -> (Vec<Value>, ChunkOutcome) {
        let mut pager = fetcher.pager(42, chunk());
        let records: Vec<Value> = pager.records().collect().await;
        (records, pager.finish())
    }

    #[tokio::test]
    async fn not_found_yields_nothing() {
        let transport = ScriptedTransport::new().respond(StatusCode::NOT_FOUND, "{}");
        let fetcher = MeasurementFetcher::new(&transport, settings(1000, &[]));
        let (records, outcome) = drain(&fetcher).await;
        assert!(records.is_empty());
        assert_eq!(
            outcome,
            ChunkOutcome::Skipped {
                reason: SkipReason::NotFound,
                records: 0
            }
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn server_error_skips_without_retry() {
        let body = "x".repeat(5000);
        let transport = ScriptedTransport::new()
            .respond(StatusCode::INTERNAL_SERVER_ERROR, body)
            .results(numbered(0, 3));
        let fetcher = MeasurementFetcher::new(&transport, settings(1000, &[]));
        let (records, outcome) = drain(&fetcher).await;
        assert!(records.is_empty());
        assert_eq!(
            outcome,
            ChunkOutcome::Skipped {
                reason: SkipReason::HttpStatus {
                    status: StatusCode::INTERNAL_SERVER_ERROR
                },
                records: 0
            }
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn full_page_then_empty_page() {
        let transport = ScriptedTransport::new()
            .results(numbered(0, 5))
            .results(vec![]);
        let fetcher = MeasurementFetcher::new(&transport, settings(5, &[]));
        let (records, outcome) = drain(&fetcher).await;
        assert_eq!(records, numbered(0, 5));
        assert_eq!(
            outcome,
            ChunkOutcome::Completed {
                pages: 2,
                records: 5
            }
        );
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.request(0).query_value("page"), Some("1"));
        assert_eq!(transport.request(1).query_value("page"), Some("2"));
    }

    #[tokio::test]
    async fn short_page_ends_pagination() {
        let transport = ScriptedTransport::new()
            .results(numbered(0, 4))
            .results(numbered(4, 2))
            .results(numbered(100, 4));
        let fetcher = MeasurementFetcher::new(&transport, settings(4, &[]));
        let (records, outcome) = drain(&fetcher).await;
        assert_eq!(records.len(), 6);
        assert_eq!(
            outcome,
            ChunkOutcome::Completed {
                pages: 2,
                records: 6
            }
        );
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn failure_after_first_page_keeps_earlier_records() {
        let transport = ScriptedTransport::new()
            .results(numbered(0, 2))
            .respond(StatusCode::TOO_MANY_REQUESTS, "slow down");
        let fetcher = MeasurementFetcher::new(&transport, settings(2, &[]));
        let (records, outcome) = drain(&fetcher).await;
        assert_eq!(records.len(), 2);
        assert!(outcome.is_skipped());
        assert_eq!(outcome.records(), 2);
    }

    #[tokio::test]
    async fn undecodable_body_is_contained() {
        let transport = ScriptedTransport::new().respond(StatusCode::OK, "<html>oops</html>");
        let fetcher = MeasurementFetcher::new(&transport, settings(10, &[]));
        let (records, outcome) = drain(&fetcher).await;
        assert!(records.is_empty());
        assert!(matches!(
            outcome,
            ChunkOutcome::Skipped {
                reason: SkipReason::Transport(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn request_carries_window_and_filter() {
        let transport = ScriptedTransport::new().results(vec![]);
        let fetcher = MeasurementFetcher::new(&transport, settings(1000, &["pm25", "pm10"]));
        drain(&fetcher).await;
        let request = transport.request(0);
        assert_eq!(request.path, "/sensors/42/measurements");
        assert_eq!(
            request.query_value("date_from"),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(request.query_value("date_to"), Some("2024-01-31T00:00:00Z"));
        assert_eq!(request.query_value("limit"), Some("1000"));
        assert_eq!(request.query_value("parameter"), Some("pm25,pm10"));
    }

    #[tokio::test]
    async fn no_filter_without_allow_list() {
        let transport = ScriptedTransport::new().results(vec![]);
        let fetcher = MeasurementFetcher::new(&transport, settings(1000, &[]));
        drain(&fetcher).await;
        assert_eq!(transport.request(0).query_value("parameter"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_pages_but_not_before_the_first() {
        let delay = Duration::from_millis(250);
        let transport = ScriptedTransport::new()
            .results(numbered(0, 2))
            .results(numbered(2, 2))
            .results(numbered(4, 1));
        let fetcher = MeasurementFetcher::new(
            &transport,
            FetchSettings {
                delay,
                ..settings(2, &[])
            },
        );
        let mut pager = fetcher.pager(42, chunk());
        let started = Instant::now();

        assert!(pager.next_page().await.is_some());
        assert!(started.elapsed() < delay);
        while pager.next_page().await.is_some() {}

        let elapsed = started.elapsed();
        assert_eq!(transport.request_count(), 3);
        assert!(elapsed >= delay * 2, "only waited {elapsed:?}");
        assert!(elapsed < delay * 3, "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn zero_page_limit_is_sent_as_one() {
        let transport = ScriptedTransport::new().results(numbered(0, 1));
        let fetcher = MeasurementFetcher::new(&transport, settings(0, &[]));
        let (records, _) = drain(&fetcher).await;
        assert_eq!(records.len(), 1);
        assert_eq!(transport.request(0).query_value("limit"), Some("1"));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn pager_is_lazy() {
        let transport = ScriptedTransport::new().results(numbered(0, 1));
        let fetcher = MeasurementFetcher::new(&transport, settings(10, &[]));
        let pager = fetcher.pager(1, chunk());
        assert_eq!(transport.request_count(), 0);
        assert_eq!(
            pager.finish(),
            ChunkOutcome::Completed {
                pages: 0,
                records: 0
            }
        );
    }
}
