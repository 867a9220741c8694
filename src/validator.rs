//! Response validation
//!
//! Checks the status code first, then every declared field assertion, and
//! records a [`ValidateOutcome`] on the scenario. A check that cannot be
//! evaluated is skipped and counts neither as passed nor as failed.

use std::sync::Arc;

use crate::evaluator::{Comparison, ExpressionEvaluator, RhaiEvaluator};
use crate::extraction;
use crate::scenario::{
    CheckResult, Outcome, Scenario, ValidateOutcome, Verdict, STATUS_FAILED, STATUS_PASSED,
};
use crate::soap;

pub struct ResponseValidator {
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl ResponseValidator {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Validate the response stored on `scenario` and record the outcome.
    ///
    /// Does nothing when the scenario has no response or already carries an
    /// outcome.
    pub fn apply(&self, scenario: &mut Scenario) {
        if scenario.outcome.is_some() {
            return;
        }
        let Some(response) = scenario.response.as_ref() else {
            return;
        };

        let outcome = self.validate(scenario, response.status, &response.body);
        scenario.outcome = Some(Outcome::Validated(outcome));
    }

    /// Run every check of `scenario` against a status code and body.
    pub fn validate(&self, scenario: &Scenario, status: u16, body: &str) -> ValidateOutcome {
        let mut outcome = ValidateOutcome::default();

        let status_check = Comparison::numbers(i64::from(scenario.status), "==", i64::from(status));
        let verdict = match self.evaluator.evaluate(&status_check) {
            Ok(true) => Verdict::Passed,
            Ok(false) => Verdict::Failed,
            Err(e) => {
                log::warn!("Status check for '{}' could not be evaluated: {}", scenario.name, e);
                Verdict::Failed
            }
        };
        record(&mut outcome, status_check.to_string(), verdict);

        if !scenario.validators.is_empty() {
            let json_body = if scenario.is_soap() {
                match soap::xml_to_json(body) {
                    Ok(json) => json,
                    Err(e) => {
                        log::warn!("Unable to convert SOAP response of '{}': {}", scenario.name, e);
                        body.to_string()
                    }
                }
            } else {
                body.to_string()
            };

            for validator in &scenario.validators {
                let assertion = &validator.validate;
                let extracted = extraction::extract_text(&json_body, &assertion.extract);
                let check = Comparison::texts(
                    extracted,
                    assertion.comparator.clone(),
                    assertion.expected.clone(),
                );

                let verdict = match self.evaluator.evaluate(&check) {
                    Ok(true) => Verdict::Passed,
                    Ok(false) => Verdict::Failed,
                    Err(e) => {
                        log::debug!("Skipping check '{}' of '{}': {}", check, scenario.name, e);
                        Verdict::Skipped {
                            reason: e.to_string(),
                        }
                    }
                };
                record(&mut outcome, check.to_string(), verdict);
            }
        }

        outcome.final_status = if outcome.failed > 0 {
            STATUS_FAILED.to_string()
        } else {
            STATUS_PASSED.to_string()
        };
        outcome
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new(Arc::new(RhaiEvaluator::new()))
    }
}

fn record(outcome: &mut ValidateOutcome, expression: String, verdict: Verdict) {
    let line = match &verdict {
        Verdict::Passed => {
            outcome.passed += 1;
            format!("Passed -- Expected {}\n", expression)
        }
        Verdict::Failed => {
            outcome.failed += 1;
            format!("Failed -- Expected {}\n", expression)
        }
        Verdict::Skipped { reason } => {
            outcome.skipped += 1;
            format!("Skipped -- {} ({})\n", expression, reason)
        }
    };
    outcome.actual.push_str(&line);
    outcome.checks.push(CheckResult { expression, verdict });
}
