//! Upload and download verification.
//!
//! Correctness is round-trip: a download only succeeds when the bytes that
//! come back hash to the checksum recorded when the payload was generated.
//! Transport errors stop here and become failed outcomes.

use crate::payload::{Payload, crc32};
use crate::transport::{STATUS_CREATED, STATUS_OK, Transport};
use serde::Serialize;
use std::fmt;

/// Why a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum FailureKind {
    /// Connection error or timeout.
    Transport,
    /// The server answered with an unexpected status.
    Status(u16),
    /// Status 200 but the body does not match the uploaded content.
    Integrity,
    /// The transfer was never attempted.
    Skipped,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => f.write_str("transport error"),
            FailureKind::Status(code) => write!(f, "status {code}"),
            FailureKind::Integrity => f.write_str("checksum mismatch"),
            FailureKind::Skipped => f.write_str("skipped"),
        }
    }
}

/// Result of one upload or download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Success { bytes: usize },
    Failure { kind: FailureKind, bytes: usize },
}

impl TransferOutcome {
    pub fn failure(kind: FailureKind, bytes: usize) -> Self {
        TransferOutcome::Failure { kind, bytes }
    }

    pub fn skipped(bytes: usize) -> Self {
        Self::failure(FailureKind::Skipped, bytes)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    /// Failure reason, if any.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TransferOutcome::Success { .. } => None,
            TransferOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            TransferOutcome::Success { bytes } | TransferOutcome::Failure { bytes, .. } => *bytes,
        }
    }
}

/// Drives uploads and downloads over one transport session.
pub struct TransferVerifier<T: Transport> {
    transport: T,
}

impl<T: Transport> TransferVerifier<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// PUT the payload to `path`. Only 201 Created counts as success.
    pub fn upload(&mut self, path: &str, payload: &Payload) -> TransferOutcome {
        let bytes = payload.size();
        match self.transport.put(path, payload.content()) {
            Ok(STATUS_CREATED) => {
                tracing::debug!(path, bytes, "Upload succeeded");
                TransferOutcome::Success { bytes }
            }
            Ok(status) => {
                tracing::warn!(path, bytes, status, "Upload rejected");
                TransferOutcome::failure(FailureKind::Status(status), bytes)
            }
            Err(e) => {
                tracing::warn!(path, bytes, timed_out = e.is_timeout(), error = %e, "Upload failed");
                TransferOutcome::failure(FailureKind::Transport, bytes)
            }
        }
    }

    /// GET `path` and check the body against `expected_crc`. Only 200 OK with
    /// a matching checksum counts as success.
    pub fn download(&mut self, path: &str, expected_crc: u32, expected_len: usize) -> TransferOutcome {
        match self.transport.get(path) {
            Ok((STATUS_OK, body)) => {
                let actual_crc = crc32(&body);
                if actual_crc == expected_crc {
                    tracing::debug!(path, bytes = body.len(), "Download verified");
                    TransferOutcome::Success { bytes: body.len() }
                } else {
                    tracing::error!(
                        path,
                        expected_crc = format_args!("{expected_crc:08x}"),
                        actual_crc = format_args!("{actual_crc:08x}"),
                        expected_len,
                        actual_len = body.len(),
                        "Integrity mismatch: downloaded content differs from upload"
                    );
                    TransferOutcome::failure(FailureKind::Integrity, body.len())
                }
            }
            Ok((status, body)) => {
                tracing::warn!(path, status, "Download rejected");
                TransferOutcome::failure(FailureKind::Status(status), body.len())
            }
            Err(e) => {
                tracing::warn!(path, timed_out = e.is_timeout(), error = %e, "Download failed");
                TransferOutcome::failure(FailureKind::Transport, 0)
            }
        }
    }
}
