//! Result aggregation.
//!
//! The aggregator is owned by the harness and handed to each round by
//! `&mut`; execution is sequential so no synchronization is involved.

use crate::verifier::{FailureKind, TransferOutcome};
use serde::Serialize;
use std::fmt;

/// Why failed transfers failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureBreakdown {
    /// Uploads answered with a status other than 201.
    pub put_status: u64,
    /// Uploads that hit a connection error or timeout.
    pub put_transport: u64,
    /// Downloads answered with a status other than 200.
    pub get_status: u64,
    /// Downloads that hit a connection error or timeout.
    pub get_transport: u64,
    /// Downloads with status 200 whose checksum did not match.
    pub integrity: u64,
    /// Transfers never attempted (session refused, payload not staged,
    /// download skipped by policy). Counted once per transfer.
    pub skipped: u64,
    /// Rounds abandoned because the local payload file could not be staged.
    pub io_creation: u64,
}

/// Final counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub good_put: u64,
    pub error_put: u64,
    pub good_get: u64,
    pub error_get: u64,
    /// Sum of payload sizes over every generated round.
    pub total_size: u64,
    pub failures: FailureBreakdown,
}

impl Tally {
    /// Number of rounds recorded.
    pub fn rounds(&self) -> u64 {
        self.good_put + self.error_put
    }

    /// Upload plus download failures.
    pub fn total_errors(&self) -> u64 {
        self.error_put + self.error_get
    }

    pub fn is_clean(&self) -> bool {
        self.total_errors() == 0
    }
}

impl fmt::Display for Tally {
    /// The one-line summary: `good_put=..,error_put=..,good_get=..,error_get=..,total_size=..`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "good_put={},error_put={},good_get={},error_get={},total_size={}",
            self.good_put, self.error_put, self.good_get, self.error_get, self.total_size
        )
    }
}

/// Accumulates transfer outcomes into a [`Tally`].
#[derive(Debug, Default)]
pub struct ResultAggregator {
    tally: Tally,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one round: its upload outcome, its download outcome and the
    /// payload size.
    pub fn record(&mut self, put: TransferOutcome, get: TransferOutcome, size: usize) {
        let tally = &mut self.tally;

        match put.failure_kind() {
            None => tally.good_put += 1,
            Some(kind) => {
                tally.error_put += 1;
                match kind {
                    // Uploads never report Integrity; keep that counter for downloads
                    FailureKind::Status(_) | FailureKind::Integrity => {
                        tally.failures.put_status += 1;
                    }
                    FailureKind::Transport => tally.failures.put_transport += 1,
                    FailureKind::Skipped => tally.failures.skipped += 1,
                }
            }
        }

        match get.failure_kind() {
            None => tally.good_get += 1,
            Some(kind) => {
                tally.error_get += 1;
                match kind {
                    FailureKind::Status(_) => tally.failures.get_status += 1,
                    FailureKind::Transport => tally.failures.get_transport += 1,
                    FailureKind::Integrity => tally.failures.integrity += 1,
                    FailureKind::Skipped => tally.failures.skipped += 1,
                }
            }
        }

        tally.total_size += size as u64;
    }

    /// Record a round that never ran because its session could not connect.
    pub fn record_skipped(&mut self) {
        self.record(TransferOutcome::skipped(0), TransferOutcome::skipped(0), 0);
    }

    /// Record a round abandoned because its payload could not be staged.
    pub fn record_io_failure(&mut self) {
        self.record_skipped();
        self.tally.failures.io_creation += 1;
    }

    /// Counts so far.
    pub fn summarize(&self) -> Tally {
        self.tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(bytes: usize) -> TransferOutcome {
        TransferOutcome::Success { bytes }
    }

    #[test]
    fn test_summary_line_format() {
        let tally = Tally {
            good_put: 80,
            error_put: 1,
            good_get: 79,
            error_get: 2,
            total_size: 4_123_456,
            failures: FailureBreakdown::default(),
        };
        assert_eq!(
            tally.to_string(),
            "good_put=80,error_put=1,good_get=79,error_get=2,total_size=4123456"
        );
    }

    #[test]
    fn test_record_success() {
        let mut agg = ResultAggregator::new();
        agg.record(ok(5000), ok(5000), 5000);

        let tally = agg.summarize();
        assert_eq!(tally.good_put, 1);
        assert_eq!(tally.good_get, 1);
        assert_eq!(tally.total_size, 5000);
        assert!(tally.is_clean());
    }

    #[test]
    fn test_record_failures_by_kind() {
        let mut agg = ResultAggregator::new();
        agg.record(
            TransferOutcome::failure(FailureKind::Status(500), 100),
            TransferOutcome::failure(FailureKind::Status(404), 0),
            100,
        );
        agg.record(ok(200), TransferOutcome::failure(FailureKind::Integrity, 200), 200);
        agg.record(
            TransferOutcome::failure(FailureKind::Transport, 300),
            TransferOutcome::failure(FailureKind::Transport, 0),
            300,
        );

        let tally = agg.summarize();
        assert_eq!(tally.good_put, 1);
        assert_eq!(tally.error_put, 2);
        assert_eq!(tally.good_get, 0);
        assert_eq!(tally.error_get, 3);
        assert_eq!(tally.total_size, 600);
        assert_eq!(tally.failures.put_status, 1);
        assert_eq!(tally.failures.put_transport, 1);
        assert_eq!(tally.failures.get_status, 1);
        assert_eq!(tally.failures.get_transport, 1);
        assert_eq!(tally.failures.integrity, 1);
        assert_eq!(tally.total_errors(), 5);
    }

    #[test]
    fn test_integrity_counter_only_tracks_downloads() {
        let mut agg = ResultAggregator::new();
        agg.record(
            TransferOutcome::failure(FailureKind::Integrity, 10),
            ok(10),
            10,
        );

        let tally = agg.summarize();
        assert_eq!(tally.error_put, 1);
        assert_eq!(tally.failures.put_status, 1);
        assert_eq!(tally.failures.integrity, 0);
    }

    #[test]
    fn test_skipped_rounds_count_as_errors() {
        let mut agg = ResultAggregator::new();
        agg.record_skipped();
        agg.record_io_failure();

        let tally = agg.summarize();
        assert_eq!(tally.error_put, 2);
        assert_eq!(tally.error_get, 2);
        assert_eq!(tally.failures.skipped, 4);
        assert_eq!(tally.failures.io_creation, 1);
        assert_eq!(tally.total_size, 0);
        assert_eq!(tally.rounds(), 2);
    }
}
