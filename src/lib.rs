//! dash - declarative API scenario runner
//!
//! Loads HTTP test scenarios and a shared configuration, resolves templated
//! values, runs every scenario concurrently, validates the responses and
//! aggregates the results into report rows, report files and a terminal
//! summary.

pub mod bootstrap;
pub mod cli;
pub mod configuration;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod extraction;
pub mod materializer;
pub mod outbound;
pub mod reporting;
pub mod scenario;
pub mod soap;
pub mod template;
pub mod validator;

// Re-export commonly used types
pub use configuration::{load_scenarios, BootstrapToken, Configuration, Metadata, RunnerSettings, Service};
pub use dispatcher::{session_id, Dispatcher, RunOptions, RunReport};
pub use error::{DashError, EvaluationError, ReportingError, RequestError, Result};
pub use evaluator::{Comparator, Comparison, ExpressionEvaluator, Operand, RhaiEvaluator};
pub use executor::{RequestExecutor, Transports};
pub use materializer::{materialize, materialize_all, replicate};
pub use outbound::{LogPublisher, MessageKind, MessagePublisher, OutboundBuffer, OutboundMessage};
pub use reporting::{OutputFormat, ReportRow, ReportSink};
pub use scenario::{
    Assertion, Auth, CheckResult, ErrorOutcome, Outcome, ResponseSnapshot, Scenario,
    ValidateOutcome, Validator, Verdict,
};
pub use template::{Resolution, TimestampStyle};
pub use validator::ResponseValidator;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
