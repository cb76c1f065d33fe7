//! WebDAV round-trip data-integrity stress harness.
//!
//! `davprobe` repeatedly stages payload files, uploads each one to a WebDAV
//! server, downloads it back and compares CRC-32 checksums, tallying
//! successes and failures for uploads and downloads.
//!
//! # Example
//!
//! ```no_run
//! use davprobe::{Endpoint, Harness, HttpConnector, RunConfig};
//! use std::time::Duration;
//!
//! let config = RunConfig::new(Endpoint::new("192.168.56.103", 6601, "/1/2/{file}.jpg"), 42);
//! config.validate()?;
//!
//! let connector = HttpConnector::new(Duration::from_secs(5), 1 << 20);
//! let report = Harness::new(config, connector).run();
//! println!("{}", report.tally);
//! # Ok::<(), davprobe::ProbeError>(())
//! ```
//!
//! # Failure classes
//!
//! - **IO creation**: the local payload file could not be staged. The round
//!   is abandoned and counted as failed.
//! - **Transport**: a non-success status, connection error or timeout.
//! - **Integrity**: status 200 but the downloaded bytes do not match the
//!   upload. This is the failure the harness exists to find.
//!
//! None of these abort a run.

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod payload;
pub mod progress;
pub mod report;
pub mod tally;
pub mod transport;
pub mod verifier;

pub use config::{DownloadPolicy, Endpoint, RunConfig};
pub use error::{ProbeError, ProbeResult, TransportError};
pub use harness::{Harness, RoundProgress, RunReport};
pub use payload::{ContentGenerator, Payload};
pub use tally::{ResultAggregator, Tally};
pub use transport::{Connector, HttpConnector, Transport};
pub use verifier::{FailureKind, TransferOutcome, TransferVerifier};
