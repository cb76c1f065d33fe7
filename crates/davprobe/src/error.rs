//! Error types for the verification harness.
//!
//! Local failures (temporary payload files, configuration) are reported as
//! [`ProbeError`]. Remote failures are [`TransportError`]s, which never leave
//! the verifier: they are converted into failed transfer outcomes.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the harness itself.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A temporary payload file could not be created, written or read back.
    #[error("Failed to prepare payload file in {}: {source}", .dir.display())]
    IoCreation {
        /// Directory the payload file was created in.
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The payload read back from disk does not match what was generated.
    #[error("Payload file read back {actual} bytes with crc {actual_crc:08x}, expected {expected} bytes with crc {expected_crc:08x}")]
    ReadBackMismatch {
        expected: usize,
        actual: usize,
        expected_crc: u32,
        actual_crc: u32,
    },

    /// Invalid run configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A configuration file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("Failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Result type for harness operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors reported by a transport session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be reached.
    #[error("Connection to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },

    /// The call did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// IO error while sending or receiving.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Any other client-side failure.
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// True if this error means the call hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}
