use thiserror::Error;

/// Errors that abort a whole run.
///
/// Failures of a single scenario are never reported through this type; they
/// are recorded on the scenario as an error outcome so sibling scenarios keep
/// running.
#[derive(Error, Debug)]
pub enum DashError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Bootstrap token error: {0}")]
    Bootstrap(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Report sink errors
#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Cannot create report file {path}: {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write report: {0}")]
    Write(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<csv::Error> for ReportingError {
    fn from(err: csv::Error) -> Self {
        ReportingError::Write(err.to_string())
    }
}

impl From<serde_json::Error> for ReportingError {
    fn from(err: serde_json::Error) -> Self {
        ReportingError::Serialization(err.to_string())
    }
}

/// Evaluation errors raised by an expression evaluator.
///
/// The validator turns these into skipped assertions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("malformed comparator: {0}")]
    InvalidComparator(String),

    #[error("Error performing comparison: {0}")]
    Evaluation(String),

    #[error("Expression did not produce a boolean: {0}")]
    NotBoolean(String),
}

/// Failures of a single HTTP exchange.
///
/// Recorded on the scenario as an error outcome, never propagated.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to decompress response body: {0}")]
    Decompression(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DashError>;
