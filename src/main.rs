use std::process;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use dash::cli::Cli;
use dash::{
    bootstrap, load_scenarios, materialize_all, session_id, Configuration, Dispatcher, LogPublisher,
    OutputFormat, RequestExecutor, ResponseValidator, RunOptions, RunnerSettings, Transports, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    println!("🤗 DASH v{} 🤗", VERSION);

    if cli.output == OutputFormat::None {
        log::info!("No output format passed, reports will not be written");
    }

    tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n🛑 Interrupted, results of this run are discarded");
            process::exit(130);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let started = Instant::now();

    let settings = RunnerSettings::load(cli.settings.as_deref()).context("Failed to load runner settings")?;
    let transports = Arc::new(Transports::new(&settings).context("Failed to build HTTP transports")?);

    let config = Configuration::from_yaml_file(&cli.config).context("Failed to load test configuration")?;
    let config = bootstrap::acquire_token(config, &transports)
        .await
        .context("Failed to acquire bootstrap token")?;

    let templates = load_scenarios(&cli.scenarios).context("Failed to load test scenarios")?;
    let scenarios = materialize_all(&templates, &config);

    println!("⚙️  Running {} test scenario(s)...", scenarios.len());

    let options = RunOptions {
        session_id: session_id(),
        output: cli.output,
        verbose: cli.verbose,
        output_dir: settings.output_dir.clone(),
        print_summary: true,
    };

    let executor = RequestExecutor::new(transports, Arc::new(ResponseValidator::default()));
    let dispatcher = Dispatcher::new(executor)
        .with_publisher(Arc::new(LogPublisher::new(settings.brokers.clone(), settings.topic.clone())));

    let report = dispatcher.run(scenarios, &options).await;

    println!("Testing completed!! ⌛");
    for path in &report.written {
        println!("📄 {}", path.display());
    }
    println!("Run {} in {:?}", report.rows.len(), started.elapsed());

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    let log_level = if verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&log_level)).init();
}
