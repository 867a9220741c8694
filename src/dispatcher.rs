//! Concurrent scenario dispatch and result collection
//!
//! Every scenario runs in its own task. Finished scenarios come back through
//! a bounded channel sized to the run; the collector stamps them, turns them
//! into report rows and feeds the sinks and the outbound buffer.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use futures::future::join_all;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::configuration::Configuration;
use crate::executor::RequestExecutor;
use crate::materializer;
use crate::outbound::{LogPublisher, MessagePublisher, OutboundBuffer};
use crate::reporting::{self, OutputFormat, ReportRow, ReportSink};
use crate::scenario::Scenario;

/// Identifier shared by every row of a run: `<local time>_<uuid v4>`
pub fn session_id() -> String {
    format!("{}_{}", Local::now().format("%Y-%m-%dT%H:%M:%S"), Uuid::new_v4())
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub session_id: String,
    pub output: OutputFormat,
    /// Echo each report row as JSON
    pub verbose: bool,
    pub output_dir: PathBuf,
    pub print_summary: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            session_id: session_id(),
            output: OutputFormat::None,
            verbose: false,
            output_dir: PathBuf::from("."),
            print_summary: true,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub session_id: String,
    /// One row per scenario, in completion order
    pub rows: Vec<ReportRow>,
    /// Report files written by the sinks
    pub written: Vec<PathBuf>,
    pub outbound: OutboundBuffer,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.count_outcome(crate::scenario::STATUS_PASSED)
    }

    pub fn failed(&self) -> usize {
        self.count_outcome(crate::scenario::STATUS_FAILED)
    }

    pub fn errored(&self) -> usize {
        self.count_outcome(crate::scenario::STATUS_ERROR)
    }

    fn count_outcome(&self, outcome: &str) -> usize {
        self.rows.iter().filter(|row| row.outcome == outcome).count()
    }
}

pub struct Dispatcher {
    executor: Arc<RequestExecutor>,
    publisher: Arc<dyn MessagePublisher>,
}

impl Dispatcher {
    pub fn new(executor: RequestExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            publisher: Arc::new(LogPublisher::default()),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn MessagePublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Materialize `templates` against `config` and run the result.
    pub async fn run_templates(
        &self,
        templates: &[Scenario],
        config: &Configuration,
        options: &RunOptions,
    ) -> RunReport {
        let scenarios = materializer::materialize_all(templates, config);
        self.run(scenarios, options).await
    }

    /// Run every scenario concurrently and collect exactly one row per scenario.
    pub async fn run(&self, scenarios: Vec<Scenario>, options: &RunOptions) -> RunReport {
        let total = scenarios.len();
        log::info!("Dispatching {} scenario(s) for session {}", total, options.session_id);

        let (tx, mut rx) = mpsc::channel::<(usize, Scenario)>(total.max(1));
        let mut pending: Vec<Option<Scenario>> = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);

        for (slot, scenario) in scenarios.into_iter().enumerate() {
            pending.push(Some(scenario.clone()));

            let tx = tx.clone();
            let executor = Arc::clone(&self.executor);
            handles.push(tokio::spawn(async move {
                let mut scenario = scenario;
                executor.execute(&mut scenario).await;
                if tx.send((slot, scenario)).await.is_err() {
                    log::warn!("Result channel closed before scenario {} was reported", slot);
                }
            }));
        }
        drop(tx);

        let mut collector = Collector::new(options);
        let mut received = 0;
        while received < total {
            match rx.recv().await {
                Some((slot, scenario)) => {
                    received += 1;
                    pending[slot] = None;
                    collector.complete(scenario);
                }
                None => break,
            }
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                log::error!("Scenario task ended abnormally: {}", e);
            }
        }

        for mut scenario in pending.into_iter().flatten() {
            scenario.record_error("scenario task ended before reporting a result");
            collector.complete(scenario);
        }

        let report = collector.finish();

        let batch = report.outbound.clone();
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(batch).await {
                log::warn!("Failed to publish outbound messages: {}", e);
            }
        });

        report
    }
}

struct Collector<'a> {
    options: &'a RunOptions,
    sinks: Vec<Box<dyn ReportSink>>,
    rows: Vec<ReportRow>,
    outbound: OutboundBuffer,
}

impl<'a> Collector<'a> {
    fn new(options: &'a RunOptions) -> Self {
        Self {
            options,
            sinks: reporting::sinks_for(options.output, &options.output_dir, &options.session_id),
            rows: Vec::new(),
            outbound: OutboundBuffer::new(),
        }
    }

    fn complete(&mut self, mut scenario: Scenario) {
        scenario.run_id = self.options.session_id.clone();
        scenario.execution_time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let row = ReportRow::from_scenario(&scenario);
        for sink in self.sinks.iter_mut() {
            sink.accept(&row);
        }

        self.outbound.push_scenario(&scenario.redacted());
        self.outbound.push_report(&row);

        if self.options.verbose {
            match serde_json::to_string(&row) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to render report row: {}", e),
            }
        }

        self.rows.push(row);
    }

    fn finish(mut self) -> RunReport {
        let mut written = Vec::new();
        for sink in self.sinks.iter_mut() {
            match sink.finish() {
                Ok(path) => written.push(path),
                Err(e) => log::error!("{} report failed: {}", sink.name(), e),
            }
        }

        if self.options.print_summary {
            reporting::print_summary_table(&self.rows);
        }

        RunReport {
            session_id: self.options.session_id.clone(),
            rows: self.rows,
            written,
            outbound: self.outbound,
        }
    }
}
