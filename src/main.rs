use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use defbench::config::BenchConfig;
use defbench::display;
use defbench::history;
use defbench::types::OutputFormat;
use defbench::workloads::Workload;

#[derive(Parser)]
#[command(name = "defbench", version, about = "Benchmark small workloads for time, memory and output")]
struct Cli {
    /// Workloads to run (all when omitted)
    #[arg(value_enum)]
    workloads: Vec<Workload>,

    /// Invocations per workload (defaults to the configured repeat)
    #[arg(short, long)]
    repeat: Option<usize>,

    /// Label for the runs instead of the workload name
    #[arg(short, long)]
    name: Option<String>,

    #[arg(long, value_enum, default_value = "default")]
    format: OutputFormat,

    #[arg(long)]
    json: bool,

    /// Print history averages after the runs
    #[arg(long)]
    summary: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("DEFBENCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = BenchConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let workloads = if cli.workloads.is_empty() {
        Workload::ALL.to_vec()
    } else {
        cli.workloads
    };

    let mut runs = Vec::with_capacity(workloads.len());
    for workload in workloads {
        let run = workload
            .run(&config, cli.repeat, cli.name.as_deref())
            .with_context(|| format!("benchmarking {}", workload.label()))?;
        tracing::info!(workload = workload.label(), time = run.time(), "workload finished");
        runs.push(run);
    }

    let output = if cli.json {
        display::format_json(&runs)
    } else {
        match cli.format {
            OutputFormat::Short => display::format_short(&runs),
            OutputFormat::Default => runs
                .iter()
                .map(|r| display::format_default(r))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    };
    println!("{}", output.trim_end());

    if cli.summary {
        println!("{}", display::format_summary(history::global()));
    }

    Ok(())
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
