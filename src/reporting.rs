//! Report rows and report sinks
//!
//! Every finished scenario is flattened into a [`ReportRow`] and offered to
//! the sinks selected by the [`OutputFormat`]. Sinks buffer rows and write
//! their file when the run finishes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReportingError;
use crate::scenario::Scenario;

pub mod csv;
pub mod json;
pub mod table;

pub use self::csv::CsvSink;
pub use self::json::JsonSink;
pub use self::table::{print_summary_table, render_summary_table};

/// Flattened, serializable projection of a finished scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub scenario: String,
    pub scenario_id: String,
    pub tag: String,
    pub service: String,
    pub status: u16,
    pub severity: String,
    pub priority: String,
    pub url: String,
    pub method: String,
    pub request_body: String,
    pub headers: String,
    pub project: String,
    pub domain: String,
    pub environment: String,
    pub collection: String,
    pub validators: String,
    pub run_id: String,
    pub execution_time: String,
    pub error_description: String,
    pub response_code: u16,
    pub response_body: String,
    pub response_time: f64,
    pub total_pass: usize,
    pub total_fail: usize,
    pub validation_description: String,
    pub outcome: String,
    pub developer: String,
    pub tester: String,
}

impl ReportRow {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let headers: BTreeMap<&String, &String> = scenario.headers.iter().collect();
        let headers = serde_json::to_string(&headers).unwrap_or_default();
        let validators = serde_json::to_string(&scenario.validators).unwrap_or_default();

        let mut row = ReportRow {
            scenario: scenario.name.clone(),
            scenario_id: scenario.id.clone(),
            tag: scenario.tag.clone(),
            service: scenario.service.clone(),
            status: scenario.status,
            severity: scenario.severity.clone(),
            priority: scenario.priority.clone(),
            url: scenario.url.clone(),
            method: scenario.method.clone(),
            request_body: single_quoted(&scenario.body),
            headers: single_quoted(&headers),
            project: scenario.project.clone(),
            domain: scenario.domain.clone(),
            environment: scenario.environment.clone(),
            collection: scenario.collection.clone(),
            validators,
            run_id: scenario.run_id.clone(),
            execution_time: scenario.execution_time.clone(),
            outcome: scenario.final_status().to_string(),
            developer: scenario.developer.clone(),
            tester: scenario.tester.clone(),
            ..ReportRow::default()
        };

        if let Some(error) = scenario.error_outcome() {
            row.error_description = error.error_desc.clone();
        }

        if let Some(outcome) = scenario.validate_outcome() {
            row.total_pass = outcome.passed;
            row.total_fail = outcome.failed;
            row.validation_description = outcome.actual.clone();
        }

        match &scenario.response {
            Some(response) => {
                row.response_code = response.status;
                row.response_body = single_quoted(&response.body);
                row.response_time = response.time;
            }
            None => {
                row.response_code = 0;
                row.response_body = "null".to_string();
                row.response_time = 0.0;
            }
        }

        row
    }
}

fn single_quoted(text: &str) -> String {
    text.replace('"', "'")
}

/// Which report files a run writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    None,
    Csv,
    Json,
    All,
}

impl OutputFormat {
    pub fn writes_csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::All)
    }

    pub fn writes_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::All)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(OutputFormat::None),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "all" => Ok(OutputFormat::All),
            other => Err(format!(
                "unknown output format '{}', expected csv, json or all",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::None => "none",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::All => "all",
        };
        write!(f, "{}", name)
    }
}

/// Destination for report rows
pub trait ReportSink: Send {
    fn name(&self) -> &str;

    fn accept(&mut self, row: &ReportRow);

    /// Write everything accepted so far and return the written file.
    fn finish(&mut self) -> Result<PathBuf, ReportingError>;
}

/// Sinks selected by `format`, writing into `output_dir`.
pub fn sinks_for(format: OutputFormat, output_dir: &Path, session_id: &str) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();
    if format.writes_csv() {
        sinks.push(Box::new(CsvSink::new(output_dir)));
    }
    if format.writes_json() {
        sinks.push(Box::new(JsonSink::new(output_dir, session_id)));
    }
    sinks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Assertion, ResponseSnapshot, ValidateOutcome, Outcome};

    fn finished_scenario() -> Scenario {
        let mut scenario = Scenario {
            id: "SN-0-abc".to_string(),
            name: "create user".to_string(),
            service: "users".to_string(),
            status: 201,
            url: "http://localhost/users".to_string(),
            method: "POST".to_string(),
            body: r#"{"name": "alice"}"#.to_string(),
            validators: vec![Assertion {
                extract: "data.id".to_string(),
                comparator: "==".to_string(),
                expected: "1".to_string(),
            }
            .into()],
            ..Scenario::default()
        };
        scenario.headers.insert("Accept".to_string(), "application/json".to_string());
        scenario.response = Some(ResponseSnapshot {
            status: 201,
            body: r#"{"data": {"id": "1"}}"#.to_string(),
            time: 0.25,
        });
        scenario.outcome = Some(Outcome::Validated(ValidateOutcome {
            passed: 2,
            failed: 0,
            skipped: 0,
            final_status: "passed".to_string(),
            actual: "Passed -- Expected 201 == 201\n".to_string(),
            checks: Vec::new(),
        }));
        scenario
    }

    #[test]
    fn test_row_from_validated_scenario() {
        let row = ReportRow::from_scenario(&finished_scenario());

        assert_eq!(row.scenario, "create user");
        assert_eq!(row.outcome, "passed");
        assert_eq!(row.total_pass, 2);
        assert_eq!(row.response_code, 201);
        assert_eq!(row.response_time, 0.25);
        assert_eq!(row.request_body, "{'name': 'alice'}");
        assert_eq!(row.response_body, "{'data': {'id': '1'}}");
        assert_eq!(row.headers, "{'Accept':'application/json'}");
        assert!(row.validators.contains("data.id"));
    }

    #[test]
    fn test_row_from_errored_scenario() {
        let mut scenario = finished_scenario();
        scenario.response = None;
        scenario.record_error("connection refused");

        let row = ReportRow::from_scenario(&scenario);
        assert_eq!(row.outcome, "error");
        assert_eq!(row.response_code, 0);
        assert_eq!(row.response_body, "null");
        assert_eq!(row.response_time, 0.0);
        assert_eq!(row.error_description, "connection refused");
        assert_eq!(row.total_pass, 0);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("".parse::<OutputFormat>().unwrap(), OutputFormat::None);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("all".parse::<OutputFormat>().unwrap(), OutputFormat::All);
        assert!("xml".parse::<OutputFormat>().is_err());

        assert!(OutputFormat::All.writes_csv() && OutputFormat::All.writes_json());
        assert!(!OutputFormat::None.writes_csv());
    }

    #[test]
    fn test_row_json_field_names() {
        let value = serde_json::to_value(ReportRow::from_scenario(&finished_scenario())).unwrap();
        for field in ["scenario_id", "request_body", "total_pass", "total_fail", "validation_description", "outcome"] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
    }
}
