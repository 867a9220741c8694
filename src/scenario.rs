//! Scenario data model
//!
//! A [`Scenario`] is loaded as a template, materialized into an
//! execution-ready instance, then mutated in place by its own task through
//! execution and validation until it carries exactly one [`Outcome`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::configuration::scalar_map;

/// Reason recorded for every request/response pipeline failure
pub const ERROR_REASON: &str = "Error parsing response body";

pub const STATUS_PASSED: &str = "passed";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_ERROR: &str = "error";

pub const TAG_URLENCODED: &str = "urlencoded";
pub const TYPE_SOAP: &str = "soap";

/// Auth descriptor carried over from the service definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub values: String,
}

/// One extract-compare-expect check against the response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// JSON path of the value to extract
    #[serde(default)]
    pub extract: String,
    #[serde(default)]
    pub comparator: String,
    /// Expected value, itself a template
    #[serde(default)]
    pub expected: String,
}

/// Validators are declared as `- validate: {extract, comparator, expected}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub validate: Assertion,
}

impl From<Assertion> for Validator {
    fn from(validate: Assertion) -> Self {
        Self { validate }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub body: String,
    /// Elapsed seconds between send and full response arrival
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorOutcome {
    pub reason: String,
    pub error_desc: String,
}

/// Verdict of a single check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    /// The check could not be evaluated and counts neither way
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub expression: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateOutcome {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub final_status: String,
    /// Human readable actual-vs-expected trace, one line per check
    pub actual: String,
    pub checks: Vec<CheckResult>,
}

/// What happened to a scenario. A scenario carries at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Error(ErrorOutcome),
    Validated(ValidateOutcome),
}

/// A declarative HTTP test case
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "scenario")]
    pub name: String,
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub priority: String,
    /// Seconds to wait right before sending
    #[serde(default)]
    pub delay: i64,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub service: String,
    /// Expected status code
    #[serde(default)]
    pub status: u16,
    #[serde(default, deserialize_with = "scalar_map")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "scalar_map")]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub auth: Auth,
    /// Body encoding type, `soap` or anything else
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub body: String,
    /// Body as actually transmitted
    #[serde(default)]
    pub final_body: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub tester: String,
    #[serde(default)]
    pub validators: Vec<Validator>,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub execution_time: String,
    #[serde(default, deserialize_with = "scalar_map")]
    pub masked_fields: HashMap<String, String>,
    #[serde(default, skip_deserializing)]
    pub response: Option<ResponseSnapshot>,
    #[serde(default, skip_deserializing)]
    pub outcome: Option<Outcome>,
}

impl Scenario {
    pub fn is_soap(&self) -> bool {
        self.kind == TYPE_SOAP
    }

    pub fn is_urlencoded(&self) -> bool {
        self.tag == TAG_URLENCODED
    }

    /// Record a pipeline failure. The scenario will not be validated.
    pub fn record_error(&mut self, error_desc: impl Into<String>) {
        self.outcome = Some(Outcome::Error(ErrorOutcome {
            reason: ERROR_REASON.to_string(),
            error_desc: error_desc.into(),
        }));
    }

    pub fn error_outcome(&self) -> Option<&ErrorOutcome> {
        match &self.outcome {
            Some(Outcome::Error(error)) => Some(error),
            _ => None,
        }
    }

    pub fn validate_outcome(&self) -> Option<&ValidateOutcome> {
        match &self.outcome {
            Some(Outcome::Validated(outcome)) => Some(outcome),
            _ => None,
        }
    }

    /// Final status, `error` whenever no validation outcome was produced
    pub fn final_status(&self) -> &str {
        self.validate_outcome()
            .map(|outcome| outcome.final_status.as_str())
            .unwrap_or(STATUS_ERROR)
    }

    /// Headers with every masked field replaced by its mask
    pub fn masked_headers(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(key, value)| {
                let value = self.masked_fields.get(key).unwrap_or(value);
                (key.clone(), value.clone())
            })
            .collect()
    }

    /// Copy of the scenario safe to hand to external consumers
    pub fn redacted(&self) -> Scenario {
        let mut copy = self.clone();
        copy.headers = self.masked_headers();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_from_yaml() {
        let yaml = r#"
- scenario: create user
  service: users
  method: post
  url: "{{host}}/users"
  status: 201
  replicas: 2
  delay: 1
  tag: urlencoded
  type: soap
  headers:
    X-Trace: 42
  params:
    page: 1
  body: '{"name": "{{name}}"}'
  validators:
    - validate:
        extract: data.id
        comparator: "=="
        expected: "{{uuid}}"
"#;
        let scenarios: Vec<Scenario> = serde_yaml::from_str(yaml).unwrap();
        let scenario = &scenarios[0];

        assert_eq!(scenario.name, "create user");
        assert_eq!(scenario.status, 201);
        assert_eq!(scenario.replicas, 2);
        assert!(scenario.is_urlencoded());
        assert!(scenario.is_soap());
        assert_eq!(scenario.headers.get("X-Trace").map(String::as_str), Some("42"));
        assert_eq!(scenario.params.get("page").map(String::as_str), Some("1"));
        assert_eq!(scenario.validators[0].validate.extract, "data.id");
        assert!(scenario.outcome.is_none());
    }

    #[test]
    fn test_negative_delay_is_accepted() {
        let yaml = r#"
- scenario: no wait
  url: http://localhost
  delay: -1
- scenario: short wait
  url: http://localhost
  delay: 2
"#;
        let scenarios: Vec<Scenario> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenarios[0].delay, -1);
        assert_eq!(scenarios[1].delay, 2);
    }

    #[test]
    fn test_final_status_defaults_to_error() {
        let mut scenario = Scenario::default();
        assert_eq!(scenario.final_status(), STATUS_ERROR);

        scenario.record_error("connection refused");
        let error = scenario.error_outcome().unwrap();
        assert_eq!(error.reason, ERROR_REASON);
        assert_eq!(error.error_desc, "connection refused");
        assert!(scenario.validate_outcome().is_none());
        assert_eq!(scenario.final_status(), STATUS_ERROR);
    }

    #[test]
    fn test_redacted_masks_headers_only_on_copy() {
        let mut scenario = Scenario::default();
        scenario.headers.insert("Authorization".to_string(), "Bearer secret".to_string());
        scenario.headers.insert("Accept".to_string(), "application/json".to_string());
        scenario.masked_fields.insert("Authorization".to_string(), "***".to_string());

        let redacted = scenario.redacted();
        assert_eq!(redacted.headers["Authorization"], "***");
        assert_eq!(redacted.headers["Accept"], "application/json");
        assert_eq!(scenario.headers["Authorization"], "Bearer secret");
    }
}
