use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::{ReportRow, ReportSink};
use crate::error::ReportingError;

/// Writes `Report-<session>.json`, an indented array of every row
pub struct JsonSink {
    path: PathBuf,
    rows: Vec<ReportRow>,
}

impl JsonSink {
    pub fn new(output_dir: &Path, session_id: &str) -> Self {
        Self {
            path: output_dir.join(report_file_name(session_id)),
            rows: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `:` is not allowed in file names on every platform
pub fn report_file_name(session_id: &str) -> String {
    format!("Report-{}.json", session_id.replace(':', "-"))
}

/// Serialize rows as a JSON array indented by one space.
pub fn to_indented_json(rows: &[ReportRow]) -> Result<Vec<u8>, ReportingError> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b" "));
    rows.serialize(&mut serializer)?;
    Ok(buffer)
}

impl ReportSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn accept(&mut self, row: &ReportRow) {
        self.rows.push(row.clone());
    }

    fn finish(&mut self) -> Result<PathBuf, ReportingError> {
        let content = to_indented_json(&self.rows)?;

        let file = File::create(&self.path).map_err(|source| ReportingError::CreateFile {
            path: self.path.display().to_string(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&content)
            .and_then(|_| writer.flush())
            .map_err(|e| ReportingError::Write(e.to_string()))?;

        log::info!("JSON report written to {}", self.path.display());
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("2024-05-01T10:20:30_abc"),
            "Report-2024-05-01T10-20-30_abc.json"
        );
    }

    #[test]
    fn test_json_report_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut sink = JsonSink::new(dir.path(), "2024-05-01T10:20:30_abc");

        let row = ReportRow {
            scenario: "list users".to_string(),
            outcome: "failed".to_string(),
            total_fail: 1,
            ..ReportRow::default()
        };
        sink.accept(&row);
        let path = sink.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n {"));

        let rows: Vec<ReportRow> = serde_json::from_str(&content).unwrap();
        assert_eq!(rows, vec![row]);
    }
}
