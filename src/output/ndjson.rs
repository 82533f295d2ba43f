use crate::output::error::OutputError;
use crate::output::{RowSink, SinkSummary};
use crate::types::measurement::MeasurementRow;
use log::info;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Streams rows to a newline-delimited JSON file as they arrive.
///
/// The file is opened in append mode when the sink is created, so it exists even if
/// the run produces no rows. Each row is written out immediately; nothing is held in
/// memory between rows.
pub struct NdjsonSink {
    path: PathBuf,
    file: File,
    rows: usize,
}

impl NdjsonSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| OutputError::Open(path.clone(), e))?;
        Ok(Self {
            path,
            file,
            rows: 0,
        })
    }

    pub fn finish(mut self) -> Result<SinkSummary, OutputError> {
        self.file
            .flush()
            .map_err(|e| OutputError::WriteIo(self.path.clone(), e))?;
        info!("Streamed {} rows to {}", self.rows, self.path.display());
        Ok(SinkSummary {
            path: self.path,
            rows: self.rows,
        })
    }
}

impl RowSink for NdjsonSink {
    fn accept(&mut self, row: MeasurementRow) -> Result<(), OutputError> {
        let mut line = serde_json::to_vec(&row)
            .map_err(|e| OutputError::Serialize(self.path.clone(), e))?;
        line.push(b'\n');
        self.file
            .write_all(&line)
            .map_err(|e| OutputError::WriteIo(self.path.clone(), e))?;
        self.rows += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::measurement::MeasurementFields;
    use serde_json::{json, Value};

    fn row(value: f64) -> MeasurementRow {
        MeasurementRow {
            location_id: 3,
            location_name: None,
            sensor_id: 30,
            sensor_parameter: Some("pm10".to_string()),
            fields: MeasurementFields {
                parameter: Some("pm10".to_string()),
                value: Some(value),
                unit: None,
                date_utc: None,
                date_local: None,
                latitude: Some(27.7),
                longitude: Some(85.3),
                attribution: Some(json!({ "name": "ICIMOD" })),
                source_name: Some("openaq".to_string()),
                raw: json!({ "value": value }),
            },
        }
    }

    #[test]
    fn creates_file_even_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.ndjson");
        let summary = NdjsonSink::open(&path).unwrap().finish().unwrap();
        assert_eq!(summary.rows, 0);
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.ndjson");
        let mut sink = NdjsonSink::open(&path).unwrap();
        sink.accept(row(1.0)).unwrap();
        sink.accept(row(2.0)).unwrap();
        sink.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["value"], json!(2.0));
        assert_eq!(lines[0]["raw"], json!(r#"{"value":1.0}"#));
        assert_eq!(lines[0]["attribution"], json!(r#"{"name":"ICIMOD"}"#));
    }

    #[test]
    fn appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.ndjson");
        std::fs::write(&path, "{\"earlier\":true}\n").unwrap();
        let mut sink = NdjsonSink::open(&path).unwrap();
        sink.accept(row(5.0)).unwrap();
        sink.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
