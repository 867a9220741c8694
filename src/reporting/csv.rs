use std::path::{Path, PathBuf};

use chrono::Local;

use super::{ReportRow, ReportSink};
use crate::error::ReportingError;

pub const CSV_HEADER: [&str; 9] = [
    "SERVICE",
    "SCENARIO",
    "FINAL STATUS",
    "PASSED NO.",
    "FAILED NO.",
    "REQUEST BODY",
    "RESPONSE BODY",
    "VALIDATION DESCRIPTION",
    "URL",
];

/// Writes `testresult_<timestamp>.csv`
pub struct CsvSink {
    path: PathBuf,
    records: Vec<[String; 9]>,
}

impl CsvSink {
    pub fn new(output_dir: &Path) -> Self {
        let file_name = format!("testresult_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
        Self {
            path: output_dir.join(file_name),
            records: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn accept(&mut self, row: &ReportRow) {
        self.records.push([
            row.service.clone(),
            row.scenario.clone(),
            row.outcome.clone(),
            row.total_pass.to_string(),
            row.total_fail.to_string(),
            row.request_body.clone(),
            row.response_body.clone(),
            row.validation_description.clone(),
            row.url.clone(),
        ]);
    }

    fn finish(&mut self) -> Result<PathBuf, ReportingError> {
        let mut writer = ::csv::Writer::from_path(&self.path).map_err(|e| match e.into_kind() {
            ::csv::ErrorKind::Io(source) => ReportingError::CreateFile {
                path: self.path.display().to_string(),
                source,
            },
            other => ReportingError::Write(format!("{:?}", other)),
        })?;

        writer.write_record(CSV_HEADER)?;
        for record in &self.records {
            writer.write_record(record)?;
        }
        writer
            .flush()
            .map_err(|e| ReportingError::Write(e.to_string()))?;

        log::info!("CSV report written to {}", self.path.display());
        Ok(self.path.clone())
    }
}
