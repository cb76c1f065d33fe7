//! Command-line interface for the verification harness.

use crate::config::{
    DEFAULT_CLIENTS, DEFAULT_FILES_PER_CLIENT, DEFAULT_HOST, DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE,
    DEFAULT_PATH_TEMPLATE, DEFAULT_PORT, DEFAULT_TIMEOUT, DownloadPolicy, Endpoint, FileConfig,
    RunConfig,
};
use crate::tally::Tally;
use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

/// WebDAV round-trip data-integrity stress harness.
///
/// Uploads generated payloads to a WebDAV server, downloads them back and
/// compares CRC-32 checksums. Prints one summary line on stdout:
/// good_put=..,error_put=..,good_get=..,error_get=..,total_size=..
#[derive(Parser, Debug)]
#[command(name = "davprobe")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Reference run: 9 clients x 9 files against a local server
    davprobe --host 192.168.56.103 --port 6601

    # Unique path per round, fail the run on any error
    davprobe --path-template '/{client}/{file}.bin' --fail-threshold 0

    # Replay a previous run's payload sizes
    davprobe --seed 1234567890 --json report.json
")]
pub struct Cli {
    /// WebDAV server host [default: 127.0.0.1]
    #[arg(long, env = "DAVPROBE_HOST")]
    pub host: Option<String>,

    /// WebDAV server port [default: 6601]
    #[arg(short = 'p', long, env = "DAVPROBE_PORT")]
    pub port: Option<u16>,

    /// Resource path template; `{client}` and `{file}` are replaced with
    /// 1-based indices [default: /1/2/{file}.jpg]
    #[arg(long, value_name = "TEMPLATE")]
    pub path_template: Option<String>,

    /// Number of simulated clients, each a fresh session [default: 9]
    #[arg(short = 'c', long)]
    pub clients: Option<usize>,

    /// Files uploaded and verified per client [default: 9]
    #[arg(short = 'f', long)]
    pub files_per_client: Option<usize>,

    /// Smallest payload size in bytes [default: 1024]
    #[arg(long, value_name = "BYTES")]
    pub min_size: Option<usize>,

    /// Largest payload size in bytes [default: 100000]
    #[arg(long, value_name = "BYTES")]
    pub max_size: Option<usize>,

    /// Seed for payload sizes (random if not set)
    #[arg(long, env = "DAVPROBE_SEED")]
    pub seed: Option<u64>,

    /// Timeout for connecting and for each request, in seconds [default: 5]
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Whether to download after a failed upload [default: always]
    #[arg(long, value_enum)]
    pub download_policy: Option<DownloadPolicy>,

    /// Directory for temporary payload files [default: system temp dir]
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Exit with status 1 when upload plus download errors exceed this count
    #[arg(long, value_name = "COUNT")]
    pub fail_threshold: Option<u64>,

    /// Export the run report to a JSON file
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// TOML file with defaults for any of the options above
    #[arg(long, value_name = "PATH", env = "DAVPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print the summary line
    #[arg(short, long)]
    pub quiet: bool,

    /// When to use colored output
    #[arg(long, value_enum, default_value = "auto")]
    pub color: ColorChoice,
}

/// Everything the binary needs after parsing.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub run: RunConfig,
    pub fail_threshold: Option<u64>,
    pub json: Option<PathBuf>,
    pub color: bool,
    pub quiet: bool,
}

impl CliConfig {
    /// True when the run should exit non-zero.
    pub fn exceeds_threshold(&self, tally: &Tally) -> bool {
        self.fail_threshold
            .is_some_and(|threshold| tally.total_errors() > threshold)
    }
}

impl Cli {
    /// Resolve flags, config file and defaults into a validated configuration.
    ///
    /// Precedence: command-line flags (and their environment variables), then
    /// the config file, then built-in defaults.
    pub fn into_config(self) -> Result<CliConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let endpoint = Endpoint::new(
            self.host.or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            self.port.or(file.port).unwrap_or(DEFAULT_PORT),
            self.path_template
                .or(file.path_template)
                .unwrap_or_else(|| DEFAULT_PATH_TEMPLATE.to_string()),
        );

        let seed = self.seed.or(file.seed).unwrap_or_else(rand::random);

        let mut run = RunConfig::new(endpoint, seed);
        run.clients = self.clients.or(file.clients).unwrap_or(DEFAULT_CLIENTS);
        run.files_per_client = self
            .files_per_client
            .or(file.files_per_client)
            .unwrap_or(DEFAULT_FILES_PER_CLIENT);
        run.min_size = self.min_size.or(file.min_size).unwrap_or(DEFAULT_MIN_SIZE);
        run.max_size = self.max_size.or(file.max_size).unwrap_or(DEFAULT_MAX_SIZE);
        run.timeout = self
            .timeout_secs
            .or(file.timeout_secs)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        run.download_policy = self
            .download_policy
            .or(file.download_policy)
            .unwrap_or_default();
        if let Some(dir) = self.work_dir.or(file.work_dir) {
            run.work_dir = dir;
        }

        run.validate().context("Invalid run configuration")?;

        Ok(CliConfig {
            run,
            fail_threshold: self.fail_threshold.or(file.fail_threshold),
            json: self.json,
            color: resolve_color(self.color),
            quiet: self.quiet,
        })
    }
}

/// Resolve `--color` against the terminal and `NO_COLOR`. Human-readable
/// output goes to stderr, so that is the stream checked.
fn resolve_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["davprobe"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--seed", "5", "--color", "never"]).into_config().unwrap();
        let run = &config.run;
        assert_eq!(run.endpoint.host, DEFAULT_HOST);
        assert_eq!(run.endpoint.port, DEFAULT_PORT);
        assert_eq!(run.endpoint.path_template, DEFAULT_PATH_TEMPLATE);
        assert_eq!(run.clients, 9);
        assert_eq!(run.files_per_client, 9);
        assert_eq!(run.min_size, 1024);
        assert_eq!(run.max_size, 100_000);
        assert_eq!(run.seed, 5);
        assert_eq!(run.timeout, Duration::from_secs(5));
        assert_eq!(run.download_policy, DownloadPolicy::Always);
        assert!(config.fail_threshold.is_none());
        assert!(!config.color);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--host",
            "dav.example",
            "-p",
            "8080",
            "--path-template",
            "/{client}/{file}.bin",
            "-c",
            "2",
            "-f",
            "3",
            "--min-size",
            "10",
            "--max-size",
            "20",
            "--timeout-secs",
            "1",
            "--download-policy",
            "after-upload",
            "--fail-threshold",
            "0",
        ])
        .into_config()
        .unwrap();

        let run = &config.run;
        assert_eq!(run.endpoint.base_url(), "http://dav.example:8080");
        assert_eq!(run.clients, 2);
        assert_eq!(run.files_per_client, 3);
        assert_eq!(run.min_size, 10);
        assert_eq!(run.max_size, 20);
        assert_eq!(run.timeout, Duration::from_secs(1));
        assert_eq!(run.download_policy, DownloadPolicy::AfterUpload);
        assert_eq!(config.fail_threshold, Some(0));
    }

    #[test]
    fn test_config_file_fills_gaps_and_flags_win() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "host = \"10.0.0.5\"\nport = 7000\nclients = 4\nfail_threshold = 3"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["--config", &path, "--port", "7100"])
            .into_config()
            .unwrap();
        assert_eq!(config.run.endpoint.host, "10.0.0.5");
        assert_eq!(config.run.endpoint.port, 7100);
        assert_eq!(config.run.clients, 4);
        assert_eq!(config.fail_threshold, Some(3));
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let err = parse(&["--min-size", "500", "--max-size", "100"])
            .into_config()
            .unwrap_err();
        assert!(format!("{err:#}").contains("exceeds max size"));
    }

    #[test]
    fn test_threshold() {
        let mut config = parse(&["--fail-threshold", "1"]).into_config().unwrap();
        let mut tally = Tally {
            error_get: 1,
            ..Tally::default()
        };
        assert!(!config.exceeds_threshold(&tally));
        tally.error_put = 1;
        assert!(config.exceeds_threshold(&tally));

        config.fail_threshold = None;
        assert!(!config.exceeds_threshold(&tally));
    }
}
