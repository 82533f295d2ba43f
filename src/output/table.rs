use crate::config::TableFormat;
use crate::output::error::OutputError;
use crate::output::{RowSink, SinkSummary};
use crate::types::measurement::{value_to_text, MeasurementRow};
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task;

/// Buffers every row in memory and writes a single table when the run ends.
///
/// Memory grows with the number of rows; use [`crate::NdjsonSink`] when that matters.
pub struct TableSink {
    path: PathBuf,
    format: TableFormat,
    rows: Vec<MeasurementRow>,
}

impl TableSink {
    pub fn new(path: impl Into<PathBuf>, format: TableFormat) -> Self {
        Self {
            path: path.into(),
            format,
            rows: Vec::new(),
        }
    }

    /// Writes the buffered rows. With no rows nothing is written and `None` is returned.
    pub async fn finish(self) -> Result<Option<SinkSummary>, OutputError> {
        if self.rows.is_empty() {
            warn!("No measurements collected. Check API key, parameters, or endpoints.");
            return Ok(None);
        }
        let rows = self.rows.len();
        let path = self.path;
        let format = self.format;
        let source_rows = self.rows;

        let written = path.clone();
        task::spawn_blocking(move || {
            let mut df = rows_to_dataframe(&source_rows)
                .map_err(|e| OutputError::FrameBuild(written.clone(), e))?;
            write_table(&mut df, &written, format)
        })
        .await??;

        info!("Saved {} rows to {}", rows, path.display());
        Ok(Some(SinkSummary { path, rows }))
    }
}

impl RowSink for TableSink {
    fn accept(&mut self, row: MeasurementRow) -> Result<(), OutputError> {
        self.rows.push(row);
        Ok(())
    }
}

/// One column per [`MeasurementRow::COLUMNS`] entry, in that order.
pub fn rows_to_dataframe(rows: &[MeasurementRow]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        id_column("location_id", rows, |r| r.location_id),
        text_column("location_name", rows, |r| r.location_name.clone()),
        id_column("sensor_id", rows, |r| r.sensor_id),
        text_column("sensor_parameter", rows, |r| r.sensor_parameter.clone()),
        text_column("parameter", rows, |r| r.fields.parameter.clone()),
        float_column("value", rows, |r| r.fields.value),
        text_column("unit", rows, |r| r.fields.unit.clone()),
        text_column("date_utc", rows, |r| r.fields.date_utc.clone()),
        text_column("date_local", rows, |r| r.fields.date_local.clone()),
        float_column("latitude", rows, |r| r.fields.latitude),
        float_column("longitude", rows, |r| r.fields.longitude),
        text_column("attribution", rows, |r| {
            r.fields.attribution.as_ref().map(value_to_text)
        }),
        text_column("source_name", rows, |r| r.fields.source_name.clone()),
        text_column("raw", rows, |r| Some(value_to_text(&r.fields.raw))),
    ])
}

fn id_column<F>(name: &str, rows: &[MeasurementRow], f: F) -> Column
where
    F: Fn(&MeasurementRow) -> i64,
{
    Column::new(name.into(), rows.iter().map(f).collect::<Vec<_>>())
}

fn float_column<F>(name: &str, rows: &[MeasurementRow], f: F) -> Column
where
    F: Fn(&MeasurementRow) -> Option<f64>,
{
    Column::new(name.into(), rows.iter().map(f).collect::<Vec<_>>())
}

fn text_column<F>(name: &str, rows: &[MeasurementRow], f: F) -> Column
where
    F: Fn(&MeasurementRow) -> Option<String>,
{
    Column::new(name.into(), rows.iter().map(f).collect::<Vec<_>>())
}

fn write_table(df: &mut DataFrame, path: &Path, format: TableFormat) -> Result<(), OutputError> {
    let file = std::fs::File::create(path)
        .map_err(|e| OutputError::Open(path.to_path_buf(), e))?;
    match format {
        TableFormat::Csv => CsvWriter::new(file)
            .include_header(true)
            .finish(df)
            .map_err(|e| OutputError::TableWrite(path.to_path_buf(), e)),
        TableFormat::Parquet => ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(df)
            .map(|_| ())
            .map_err(|e| OutputError::TableWrite(path.to_path_buf(), e)),
    }
}
