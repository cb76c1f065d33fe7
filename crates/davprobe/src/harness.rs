//! The verification loop.
//!
//! For every simulated client the harness opens a fresh transport session,
//! then runs one round per file: stage a payload, upload it, download it,
//! compare checksums, record both outcomes and release the payload file.
//! Every scheduled round records exactly one upload and one download
//! outcome, so `good_put + error_put` always equals the number of rounds.

use crate::config::{DownloadPolicy, RunConfig};
use crate::payload::ContentGenerator;
use crate::tally::{ResultAggregator, Tally};
use crate::transport::{Connector, Transport};
use crate::verifier::{FailureKind, TransferOutcome, TransferVerifier};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Progress update emitted after each round.
#[derive(Debug, Clone, Copy)]
pub struct RoundProgress {
    /// Client (session) index, 1-based.
    pub client: usize,
    /// File index within the session, 1-based.
    pub file: usize,
    /// Rounds recorded so far.
    pub completed: u64,
    /// Rounds scheduled in total.
    pub total: u64,
    /// Upload plus download failures so far.
    pub errors: u64,
}

/// Callback for receiving round progress updates.
pub type RoundProgressCallback<'a> = &'a dyn Fn(&RoundProgress);

/// A round with at least one failed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundFailure {
    pub client: usize,
    pub file: usize,
    pub path: String,
    pub size: usize,
    /// Upload failure, if the upload failed.
    pub upload: Option<FailureKind>,
    /// Download failure, if the download failed.
    pub download: Option<FailureKind>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub tally: Tally,
    /// Seed the payload sizes were drawn from.
    pub seed: u64,
    pub elapsed: Duration,
    /// Sessions whose connection could not be established.
    pub refused_sessions: usize,
    pub failed_rounds: Vec<RoundFailure>,
}

impl RunReport {
    /// Bytes per second over the whole run, counting each round's payload
    /// once for the upload and once for the download.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.tally.total_size * 2) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives sessions and rounds against one endpoint.
pub struct Harness<C: Connector> {
    config: RunConfig,
    connector: C,
    generator: ContentGenerator,
    rng: ChaCha8Rng,
}

impl<C: Connector> Harness<C> {
    /// Create a harness. The configuration should already be validated.
    pub fn new(config: RunConfig, connector: C) -> Self {
        let generator = ContentGenerator::new(config.work_dir.clone());
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            connector,
            generator,
            rng,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every session to completion.
    pub fn run(&mut self) -> RunReport {
        self.run_with_progress(None)
    }

    /// Run every session, reporting after each round.
    pub fn run_with_progress(&mut self, progress: Option<RoundProgressCallback<'_>>) -> RunReport {
        // Every run replays the same sizes for the configured seed
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let start = Instant::now();
        let total = self.config.total_rounds();
        let mut aggregator = ResultAggregator::new();
        let mut failed_rounds = Vec::new();
        let mut refused_sessions = 0;
        let mut completed = 0u64;

        tracing::info!(
            endpoint = %self.config.endpoint,
            clients = self.config.clients,
            files_per_client = self.config.files_per_client,
            seed = self.config.seed,
            "Starting verification run"
        );

        for client in 1..=self.config.clients {
            let span = tracing::info_span!("session", client);
            let _guard = span.enter();

            let mut verifier = match self.connector.connect(&self.config.endpoint) {
                Ok(transport) => Some(TransferVerifier::new(transport)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        rounds = self.config.files_per_client,
                        "Session could not connect, skipping its rounds"
                    );
                    refused_sessions += 1;
                    None
                }
            };

            for file in 1..=self.config.files_per_client {
                // Sizes are drawn for skipped rounds too so a seed always maps
                // the same size to the same (client, file)
                let size = self.next_size();
                let path = self.config.endpoint.resource_path(client, file);

                let (put, get) = match verifier.as_mut() {
                    Some(verifier) => self.run_round(verifier, &mut aggregator, client, file, size, &path),
                    None => {
                        aggregator.record_skipped();
                        (TransferOutcome::skipped(0), TransferOutcome::skipped(0))
                    }
                };

                if !put.is_success() || !get.is_success() {
                    failed_rounds.push(RoundFailure {
                        client,
                        file,
                        path,
                        size,
                        upload: put.failure_kind(),
                        download: get.failure_kind(),
                    });
                }

                completed += 1;
                if let Some(callback) = progress {
                    callback(&RoundProgress {
                        client,
                        file,
                        completed,
                        total,
                        errors: aggregator.summarize().total_errors(),
                    });
                }
            }
        }

        let tally = aggregator.summarize();
        let elapsed = start.elapsed();
        tracing::info!(%tally, elapsed_ms = elapsed.as_millis(), "Verification run finished");

        RunReport {
            tally,
            seed: self.config.seed,
            elapsed,
            refused_sessions,
            failed_rounds,
        }
    }

    /// One generate/upload/download/record round. The payload file is
    /// removed when this returns.
    fn run_round<T: Transport>(
        &self,
        verifier: &mut TransferVerifier<T>,
        aggregator: &mut ResultAggregator,
        client: usize,
        file: usize,
        size: usize,
        path: &str,
    ) -> (TransferOutcome, TransferOutcome) {
        let label = format!("{client}_{file}");
        let payload = match self.generator.generate(size, &label) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(file, size, error = %e, "Could not stage payload, abandoning round");
                aggregator.record_io_failure();
                return (TransferOutcome::skipped(0), TransferOutcome::skipped(0));
            }
        };

        let put = verifier.upload(path, &payload);
        let get = match self.config.download_policy {
            DownloadPolicy::AfterUpload if !put.is_success() => {
                tracing::debug!(path, "Upload failed, skipping download");
                TransferOutcome::skipped(0)
            }
            _ => verifier.download(path, payload.checksum(), payload.size()),
        };

        aggregator.record(put, get, payload.size());
        (put, get)
    }

    fn next_size(&mut self) -> usize {
        self.rng
            .random_range(self.config.min_size..=self.config.max_size)
    }
}
