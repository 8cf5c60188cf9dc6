#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod prompt;
mod telemetry;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use cachebench_core::{Environment, Prompter};
use cachebench_ingest::KustoConnector;
use cachebench_runtime::{CycleOptions, CycleReport, Pipeline, SshTransport};
use clap::ValueEnum;

use crate::config::Cli;
use crate::prompt::TerminalPrompter;
use crate::telemetry::LogFormat;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "cachebench_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "cachebench_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "cachebench_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing(cli.log_format)?;
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting cachebench"
    );

    cli.log();
    cli.validate().context("invalid command-line options")?;

    let prompter = Arc::new(TerminalPrompter::new());
    let pipeline = Pipeline::new(
        cli.files.pipeline_settings(),
        SshTransport::new(cli.endpoint.ssh_config()),
        KustoConnector::new(cli.warehouse.clone()),
    )
    .with_prompter(prompter.clone());

    loop {
        let options = cycle_options(&cli, &prompter).await?;
        let report = pipeline.run_cycle(&options).await;
        print_report(&report, cli.log_format)?;

        if cli.once {
            if report.state.is_failed() {
                anyhow::bail!("benchmark cycle ended in {}", report.state);
            }
            return Ok(());
        }

        if !prompter.confirm("Do you want to continue?").await {
            return Ok(());
        }
    }
}

/// Resolves the environment and load of the next cycle, asking for
/// whatever the command line left open.
async fn cycle_options(cli: &Cli, prompter: &TerminalPrompter) -> anyhow::Result<CycleOptions> {
    let environment = match cli.run.environment {
        Some(environment) => environment,
        None => prompter
            .select(
                "Please select the performance environment to run benchmark?",
                Environment::value_variants(),
            )
            .await
            .context("no environment selected")?,
    };

    let standard = match cli.run.is_standard() {
        Some(standard) => standard,
        None => {
            prompter
                .confirm("Would you like to run standard benchmarking?")
                .await
        }
    };

    Ok(CycleOptions {
        environment,
        mode: cli.run.mode(standard),
        custom: cli.endpoint.custom_endpoint(),
    })
}

/// Writes the cycle report to stdout.
fn print_report(report: &CycleReport, format: LogFormat) -> anyhow::Result<()> {
    if format == LogFormat::Json {
        let line = serde_json::to_string(report).context("failed to serialize cycle report")?;
        println!("{line}");
        return Ok(());
    }

    println!();
    println!("Environment:      {}", report.environment);
    println!("Result:           {}", report.state);
    println!(
        "Runs:             {} planned, {} rejected, {} failed",
        report.planned,
        report.rejected,
        report.failed_commands.len()
    );
    println!("Artifacts:        {} staged, {} ingested", report.staged, report.ingested);
    if let Some(rows) = report.row_count {
        println!("Rows in table:    {rows}");
    }
    if let Some(elapsed) = report.elapsed() {
        println!("Elapsed:          {elapsed:#}");
    }
    println!();

    Ok(())
}
