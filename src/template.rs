//! `{{name}}` placeholder resolution
//!
//! A placeholder resolves, in order, to a reserved generator (`uuid`, `guid`,
//! `timestamp`), to the value of the same key in the configuration data map,
//! or to itself. Unresolved placeholders pass through untouched and are
//! reported in [`Resolution::unresolved`].

use std::collections::HashMap;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::configuration::Configuration;

pub const GENERATOR_UUID: &str = "uuid";
pub const GENERATOR_GUID: &str = "guid";
pub const GENERATOR_TIMESTAMP: &str = "timestamp";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder pattern is valid"))
}

/// How the `timestamp` generator renders epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampStyle {
    /// Decimal digits, used for bodies, URLs, params and assertions
    #[default]
    Decimal,
    /// The epoch-seconds integer converted straight to a character, used for
    /// header values. Out-of-range values become U+FFFD.
    RawCodePoint,
}

/// Outcome of resolving one template string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: String,
    /// Placeholder names left as-is, in order of appearance
    pub unresolved: Vec<String>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Resolve every placeholder in `template` against the configuration data.
pub fn resolve(template: &str, config: &Configuration) -> String {
    resolve_with(template, &config.data, TimestampStyle::Decimal).value
}

/// Resolve a header value; `timestamp` uses [`TimestampStyle::RawCodePoint`].
pub fn resolve_header(template: &str, config: &Configuration) -> String {
    resolve_with(template, &config.data, TimestampStyle::RawCodePoint).value
}

/// Resolve `template` and report which placeholders were left unresolved.
pub fn resolve_detailed(template: &str, config: &Configuration) -> Resolution {
    resolve_with(template, &config.data, TimestampStyle::Decimal)
}

pub fn resolve_with(
    template: &str,
    data: &HashMap<String, String>,
    style: TimestampStyle,
) -> Resolution {
    let found: Vec<(Range<usize>, &str)> = placeholder_regex()
        .captures_iter(template)
        .filter_map(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str())))
        .collect();

    if found.is_empty() {
        return Resolution {
            value: template.to_string(),
            unresolved: Vec::new(),
        };
    }

    // Splice from the back so earlier ranges stay valid.
    let mut value = template.to_string();
    let mut unresolved = Vec::new();
    for (range, name) in found.into_iter().rev() {
        match lookup(name.trim(), data, style) {
            Some(replacement) => value.replace_range(range, &replacement),
            None => unresolved.push(name.to_string()),
        }
    }
    unresolved.reverse();

    if !unresolved.is_empty() {
        log::debug!("Unresolved placeholders left in template: {:?}", unresolved);
    }

    Resolution { value, unresolved }
}

/// Whether `text` still contains a placeholder
pub fn has_placeholder(text: &str) -> bool {
    placeholder_regex().is_match(text)
}

fn lookup(name: &str, data: &HashMap<String, String>, style: TimestampStyle) -> Option<String> {
    generate(name, style).or_else(|| data.get(name).cloned())
}

/// Value of a reserved generator, `None` for any other name
pub fn generate(name: &str, style: TimestampStyle) -> Option<String> {
    match name {
        GENERATOR_UUID => Some(Uuid::new_v4().to_string()),
        GENERATOR_GUID => Some(Uuid::now_v7().simple().to_string()),
        GENERATOR_TIMESTAMP => {
            let secs = chrono::Utc::now().timestamp();
            Some(match style {
                TimestampStyle::Decimal => secs.to_string(),
                TimestampStyle::RawCodePoint => raw_code_point(secs).to_string(),
            })
        }
        _ => None,
    }
}

fn raw_code_point(value: i64) -> char {
    u32::try_from(value)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}
