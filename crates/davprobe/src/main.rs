//! davprobe - WebDAV round-trip data-integrity stress harness.

// Use mimalloc for reduced allocation latency (enabled by default).
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use davprobe::cli::{Cli, CliConfig};
use davprobe::progress::RoundProgressReporter;
use davprobe::report::{breakdown_lines, export_json};
use davprobe::{Harness, HttpConnector, RoundProgress};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit code when the error count exceeds `--fail-threshold`.
const EXIT_THRESHOLD_EXCEEDED: u8 = 1;
/// Exit code for configuration and startup errors.
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

/// Route logs through indicatif so they appear above the progress bar.
/// `RUST_LOG` wins over `-v`/`-q`.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        })
    });

    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(indicatif_layer.get_stderr_writer()),
        )
        .with(indicatif_layer)
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.into_config().context("Failed to build configuration")?;

    if !config.quiet {
        print_banner(&config);
    }

    let connector = HttpConnector::new(config.run.timeout, config.run.max_response_bytes());
    let mut harness = Harness::new(config.run.clone(), connector);

    let run = harness.config();
    let reporter = if !config.quiet && std::io::stderr().is_terminal() {
        RoundProgressReporter::new(run.total_rounds(), run.clients, run.files_per_client, config.color)
    } else {
        RoundProgressReporter::hidden(run.total_rounds(), run.clients, run.files_per_client)
    };
    let callback = |round: &RoundProgress| reporter.update(round);
    let report = harness.run_with_progress(Some(&callback));
    reporter.finish();

    // The summary line is the one thing on stdout
    println!("{}", report.tally);

    if !config.quiet {
        for line in breakdown_lines(&report, config.color) {
            eprintln!("{line}");
        }
    }

    if let Some(path) = &config.json {
        export_json(&report, &config.run, path)
            .with_context(|| format!("Failed to export JSON to {}", path.display()))?;
        if !config.quiet {
            eprintln!("Report exported to: {}", path.display());
        }
    }

    if config.exceeds_threshold(&report.tally) {
        tracing::warn!(
            errors = report.tally.total_errors(),
            threshold = config.fail_threshold,
            "Error count exceeds threshold"
        );
        return Ok(ExitCode::from(EXIT_THRESHOLD_EXCEEDED));
    }

    Ok(ExitCode::SUCCESS)
}

/// Print a compact one-line banner with the run parameters.
fn print_banner(config: &CliConfig) {
    use owo_colors::OwoColorize;

    let run = &config.run;
    let details = format!(
        "{} clients x {} files, {}-{} bytes, download {}, seed {}",
        run.clients,
        run.files_per_client,
        run.min_size,
        run.max_size,
        run.download_policy,
        run.seed
    );

    eprintln!();
    if config.color {
        eprintln!("{}: {} ({details})", "davprobe".cyan().bold(), run.endpoint);
    } else {
        eprintln!("davprobe: {} ({details})", run.endpoint);
    }
    eprintln!();
}
