//! Run configuration.
//!
//! A [`RunConfig`] is built from CLI flags, optionally layered over a TOML
//! file (see [`FileConfig`]), and validated once before the harness starts.

use crate::error::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default WebDAV host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default WebDAV port.
pub const DEFAULT_PORT: u16 = 6601;
/// Default resource path template.
pub const DEFAULT_PATH_TEMPLATE: &str = "/1/2/{file}.jpg";
/// Default number of simulated clients.
pub const DEFAULT_CLIENTS: usize = 9;
/// Default number of files uploaded per client.
pub const DEFAULT_FILES_PER_CLIENT: usize = 9;
/// Default smallest payload size in bytes.
pub const DEFAULT_MIN_SIZE: usize = 1024;
/// Default largest payload size in bytes.
pub const DEFAULT_MAX_SIZE: usize = 100_000;
/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Remote WebDAV endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Resource path template with `{client}` and `{file}` placeholders.
    pub path_template: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, path_template: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path_template: path_template.into(),
        }
    }

    /// Base URL for requests, without a trailing slash.
    pub fn base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            // Bare IPv6 literal
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Resolve the resource path for a round. Indices are 1-based.
    pub fn resource_path(&self, client: usize, file: usize) -> String {
        self.path_template
            .replace("{client}", &client.to_string())
            .replace("{file}", &file.to_string())
    }

    /// Full URL for a resource path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PATH_TEMPLATE)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base_url(), self.path_template)
    }
}

/// Whether a download is attempted after a failed upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadPolicy {
    /// Always download, even when the upload failed. The download then
    /// checks whatever the server already holds at that path.
    #[default]
    Always,
    /// Skip the download when the upload failed.
    AfterUpload,
}

impl DownloadPolicy {
    pub fn name(self) -> &'static str {
        match self {
            DownloadPolicy::Always => "always",
            DownloadPolicy::AfterUpload => "after-upload",
        }
    }
}

impl fmt::Display for DownloadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully resolved configuration for one harness run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoint: Endpoint,
    /// Number of simulated clients (transport sessions).
    pub clients: usize,
    /// Files uploaded and verified per client.
    pub files_per_client: usize,
    /// Smallest payload size in bytes (inclusive).
    pub min_size: usize,
    /// Largest payload size in bytes (inclusive).
    pub max_size: usize,
    /// Seed for payload size selection.
    pub seed: u64,
    /// Per-call timeout for session setup and each request.
    pub timeout: Duration,
    pub download_policy: DownloadPolicy,
    /// Directory for temporary payload files.
    pub work_dir: PathBuf,
}

impl RunConfig {
    /// Create a configuration with default run parameters for an endpoint.
    pub fn new(endpoint: Endpoint, seed: u64) -> Self {
        Self {
            endpoint,
            clients: DEFAULT_CLIENTS,
            files_per_client: DEFAULT_FILES_PER_CLIENT,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            seed,
            timeout: DEFAULT_TIMEOUT,
            download_policy: DownloadPolicy::default(),
            work_dir: std::env::temp_dir(),
        }
    }

    /// Total number of file rounds the run schedules.
    pub fn total_rounds(&self) -> u64 {
        (self.clients as u64) * (self.files_per_client as u64)
    }

    /// Cap on response bytes read by a download: twice the largest payload,
    /// at least 1 MiB.
    pub fn max_response_bytes(&self) -> u64 {
        (self.max_size as u64).saturating_mul(2).max(1 << 20)
    }

    /// Check the configuration before a run.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.endpoint.host.is_empty() {
            return Err(ProbeError::Config("host must not be empty".to_string()));
        }
        if self.endpoint.port == 0 {
            return Err(ProbeError::Config("port must be non-zero".to_string()));
        }
        if !self.endpoint.path_template.starts_with('/') {
            return Err(ProbeError::Config(format!(
                "path template must start with '/': {}",
                self.endpoint.path_template
            )));
        }
        if self.clients == 0 {
            return Err(ProbeError::Config("clients must be at least 1".to_string()));
        }
        if self.files_per_client == 0 {
            return Err(ProbeError::Config(
                "files per client must be at least 1".to_string(),
            ));
        }
        if self.min_size == 0 {
            return Err(ProbeError::Config("min size must be at least 1 byte".to_string()));
        }
        if self.min_size > self.max_size {
            return Err(ProbeError::Config(format!(
                "min size ({}) exceeds max size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.timeout.is_zero() {
            return Err(ProbeError::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Values read from a TOML config file. Every field is optional; CLI flags
/// take precedence over anything set here.
///
/// ```toml
/// host = "192.168.56.103"
/// port = 6601
/// path_template = "/{client}/{file}.bin"
/// clients = 4
/// files_per_client = 20
/// min_size = 1024
/// max_size = 1048576
/// timeout_secs = 10
/// download_policy = "after-upload"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path_template: Option<String>,
    pub clients: Option<usize>,
    pub files_per_client: Option<usize>,
    pub min_size: Option<usize>,
    pub max_size: Option<usize>,
    pub seed: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub download_policy: Option<DownloadPolicy>,
    pub work_dir: Option<PathBuf>,
    pub fail_threshold: Option<u64>,
}

impl FileConfig {
    /// Load a config file from disk.
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ProbeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> ProbeResult<Self> {
        toml::from_str(contents).map_err(|e| ProbeError::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }
}
