use std::path::PathBuf;

use clap::Parser;

use crate::reporting::OutputFormat;

/// dash - run declarative API test scenarios
#[derive(Parser, Debug)]
#[command(name = "dash")]
#[command(about = "Run declarative API test scenarios concurrently and report the results")]
#[command(version = crate::VERSION)]
pub struct Cli {
    /// Test configuration file (yaml)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Scenario file or directory of scenario files
    #[arg(short, long)]
    pub scenarios: PathBuf,

    /// Report output: csv, json or all
    #[arg(short, long, default_value = "none", value_parser = parse_output_format)]
    pub output: OutputFormat,

    /// Echo every report row as JSON and enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Runner settings file (proxy, timeout, output directory)
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}
