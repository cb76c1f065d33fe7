//! Run summaries: the one-line tally, a colored breakdown and JSON export.

use crate::config::{Endpoint, RunConfig};
use crate::harness::{RoundFailure, RunReport};
use crate::tally::Tally;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

/// JSON-serializable run report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    pub metadata: ReportMetadata<'a>,
    pub tally: Tally,
    pub elapsed_secs: f64,
    pub throughput_bytes_per_sec: f64,
    pub failed_rounds: &'a [RoundFailure],
}

/// Report metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata<'a> {
    pub timestamp: String,
    pub davprobe_version: &'static str,
    pub endpoint: &'a Endpoint,
    pub clients: usize,
    pub files_per_client: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub seed: u64,
    pub timeout_secs: f64,
    pub download_policy: &'static str,
    pub refused_sessions: usize,
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a RunReport, config: &'a RunConfig) -> Self {
        Self {
            metadata: ReportMetadata {
                timestamp: chrono::Utc::now().to_rfc3339(),
                davprobe_version: env!("CARGO_PKG_VERSION"),
                endpoint: &config.endpoint,
                clients: config.clients,
                files_per_client: config.files_per_client,
                min_size: config.min_size,
                max_size: config.max_size,
                seed: report.seed,
                timeout_secs: config.timeout.as_secs_f64(),
                download_policy: config.download_policy.name(),
                refused_sessions: report.refused_sessions,
            },
            tally: report.tally,
            elapsed_secs: report.elapsed.as_secs_f64(),
            throughput_bytes_per_sec: report.throughput(),
            failed_rounds: &report.failed_rounds,
        }
    }
}

/// Export a run report as pretty JSON.
pub fn export_json(report: &RunReport, config: &RunConfig, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport::new(report, config))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Format a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Multi-line breakdown written to stderr after a run.
pub fn breakdown_lines(report: &RunReport, color: bool) -> Vec<String> {
    let tally = &report.tally;
    let f = &tally.failures;

    let headline = format!(
        "{} rounds in {:.2}s, {} transferred ({}/s), seed {}",
        tally.rounds(),
        report.elapsed.as_secs_f64(),
        format_size(tally.total_size * 2),
        format_size(report.throughput() as u64),
        report.seed
    );

    let verdict = if tally.is_clean() {
        if color {
            "all transfers verified".green().bold().to_string()
        } else {
            "all transfers verified".to_string()
        }
    } else {
        let text = format!("{} failed transfers", tally.total_errors());
        if color { text.red().bold().to_string() } else { text }
    };

    let mut lines = vec![headline, format!("  {verdict}")];
    if !tally.is_clean() {
        lines.push(format!(
            "  upload:   {} rejected, {} transport",
            f.put_status, f.put_transport
        ));
        let integrity = if color && f.integrity > 0 {
            format!("{} integrity", f.integrity).red().to_string()
        } else {
            format!("{} integrity", f.integrity)
        };
        lines.push(format!(
            "  download: {} rejected, {} transport, {integrity}",
            f.get_status, f.get_transport
        ));
        lines.push(format!(
            "  skipped:  {} transfers ({} sessions refused, {} payloads not staged)",
            f.skipped, report.refused_sessions, f.io_creation
        ));
    }
    lines
}
