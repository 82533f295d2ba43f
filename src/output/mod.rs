//! Where normalized rows go.
//!
//! Exactly one sink is active per run, chosen from [`OutputConfig`]:
//! a [`TableSink`] that buffers everything and writes one CSV or Parquet file at the
//! end, or an [`NdjsonSink`] that appends each row to a line-delimited file as it is
//! produced. The first trades memory for a single tidy table; the second keeps memory
//! flat regardless of how much is harvested.

pub mod error;
pub mod ndjson;
pub mod table;

use crate::config::OutputConfig;
use crate::types::measurement::MeasurementRow;
use error::OutputError;
use ndjson::NdjsonSink;
use std::path::PathBuf;
use table::TableSink;

/// Receives rows one at a time, in harvest order.
pub trait RowSink {
    fn accept(&mut self, row: MeasurementRow) -> Result<(), OutputError>;
}

/// Collects rows in memory.
impl RowSink for Vec<MeasurementRow> {
    fn accept(&mut self, row: MeasurementRow) -> Result<(), OutputError> {
        self.push(row);
        Ok(())
    }
}

/// What a sink left on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSummary {
    pub path: PathBuf,
    pub rows: usize,
}

pub enum OutputSink {
    Table(TableSink),
    Stream(NdjsonSink),
}

impl OutputSink {
    /// Builds the configured sink. Streaming mode opens its file immediately.
    pub fn from_config(config: &OutputConfig) -> Result<Self, OutputError> {
        Ok(match config {
            OutputConfig::Table { path, format } => {
                OutputSink::Table(TableSink::new(path.clone(), *format))
            }
            OutputConfig::Stream { path } => OutputSink::Stream(NdjsonSink::open(path)?),
        })
    }

    /// Flushes the sink. `None` means buffered mode collected nothing and wrote no file.
    pub async fn finish(self) -> Result<Option<SinkSummary>, OutputError> {
        match self {
            OutputSink::Table(sink) => sink.finish().await,
            OutputSink::Stream(sink) => sink.finish().map(Some),
        }
    }
}

impl RowSink for OutputSink {
    fn accept(&mut self, row: MeasurementRow) -> Result<(), OutputError> {
        match self {
            OutputSink::Table(sink) => sink.accept(row),
            OutputSink::Stream(sink) => sink.accept(row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableFormat;

    #[tokio::test]
    async fn buffered_without_rows_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let sink = OutputSink::from_config(&OutputConfig::Table {
            path: path.clone(),
            format: TableFormat::Csv,
        })
        .unwrap();
        assert_eq!(sink.finish().await.unwrap(), None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn streaming_without_rows_leaves_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ndjson");
        let sink = OutputSink::from_config(&OutputConfig::Stream { path: path.clone() }).unwrap();
        let summary = sink.finish().await.unwrap().unwrap();
        assert_eq!(
            summary,
            SinkSummary {
                path: path.clone(),
                rows: 0
            }
        );
        assert!(path.exists());
    }
}
