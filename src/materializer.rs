//! Turns scenario templates into execution-ready scenarios
//!
//! Materialization assigns an identity, merges service and global defaults,
//! resolves every template field and expands replicas. It never fails:
//! unknown services and unknown keys leave fields empty or placeholders
//! unresolved.

use std::collections::HashMap;

use uuid::Uuid;

use crate::configuration::Configuration;
use crate::scenario::Scenario;
use crate::template;

/// Build a scenario identifier of the form `SN-<index>-<token>`
pub fn scenario_id(index: usize) -> String {
    format!("SN-{}-{}", index, Uuid::now_v7().simple())
}

/// Materialize a single instance of `template`.
pub fn materialize(template: &Scenario, config: &Configuration, index: usize) -> Scenario {
    let mut scenario = template.clone();
    scenario.id = scenario_id(index);

    merge_service(&mut scenario, config);
    resolve_headers(&mut scenario, config);
    resolve_body(&mut scenario, config);
    resolve_validators(&mut scenario, config);
    resolve_url(&mut scenario, config);

    scenario
}

/// Materialize every instance declared by `template`.
///
/// `replicas = N > 0` yields N independent instances, anything else yields
/// one. The first instance is identified by `index`, the others by their
/// replica number.
pub fn replicate(template: &Scenario, config: &Configuration, index: usize) -> Vec<Scenario> {
    let count = usize::try_from(template.replicas).unwrap_or(0).max(1);

    (0..count)
        .map(|replica| {
            let id_index = if replica == 0 { index } else { replica };
            materialize(template, config, id_index)
        })
        .collect()
}

/// Materialize an ordered list of templates into the full run set.
pub fn materialize_all(templates: &[Scenario], config: &Configuration) -> Vec<Scenario> {
    let scenarios: Vec<Scenario> = templates
        .iter()
        .enumerate()
        .flat_map(|(index, template)| replicate(template, config, index))
        .collect();

    log::info!(
        "Materialized {} scenario(s) from {} template(s)",
        scenarios.len(),
        templates.len()
    );
    scenarios
}

/// Copy service metadata and merge headers.
///
/// Header precedence, lowest first: service, global, scenario.
fn merge_service(scenario: &mut Scenario, config: &Configuration) {
    if !scenario.method.is_empty() {
        scenario.method = scenario.method.to_uppercase();
    }

    let declared = std::mem::take(&mut scenario.headers);
    let mut headers: HashMap<String, String> = HashMap::new();

    match config.service(&scenario.service) {
        Some(service) => {
            scenario.project = config.metadata.project.clone();
            scenario.environment = config.metadata.environment.clone();
            scenario.collection = config.metadata.collection.clone();
            scenario.domain = config.metadata.domain.clone();
            scenario.developer = service.developer.clone();
            scenario.tester = service.tester.clone();
            if !service.tag.is_empty() {
                scenario.tag = service.tag.clone();
            }
            if !service.kind.is_empty() {
                scenario.kind = service.kind.clone();
            }
            scenario.auth = service.auth.clone();

            headers.extend(service.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        None => {
            if !scenario.service.is_empty() {
                log::debug!(
                    "Service '{}' not found for scenario '{}'",
                    scenario.service,
                    scenario.name
                );
            }
        }
    }

    headers.extend(config.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
    headers.extend(declared);
    scenario.headers = headers;
}

fn resolve_headers(scenario: &mut Scenario, config: &Configuration) {
    for value in scenario.headers.values_mut() {
        if template::has_placeholder(value) {
            *value = template::resolve_header(value, config);
        }
    }
}

fn resolve_body(scenario: &mut Scenario, config: &Configuration) {
    scenario.masked_fields = config.masked_fields.clone();
    if template::has_placeholder(&scenario.body) {
        scenario.body = template::resolve(&scenario.body, config);
    }
}

fn resolve_validators(scenario: &mut Scenario, config: &Configuration) {
    for validator in &mut scenario.validators {
        let assertion = &mut validator.validate;
        if template::has_placeholder(&assertion.expected) {
            assertion.expected = template::resolve(&assertion.expected, config);
        }
    }
}

fn resolve_url(scenario: &mut Scenario, config: &Configuration) {
    if template::has_placeholder(&scenario.url) {
        scenario.url = template::resolve(&scenario.url, config);
    }

    for value in scenario.params.values_mut() {
        if template::has_placeholder(value) {
            *value = template::resolve(value, config);
        }
    }
}
