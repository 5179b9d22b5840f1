//! Transfer orchestration.
//!
//! `run` is the single entry point: it consults the state store to skip
//! requests already proven correct, drives the rest through a
//! semaphore-bounded pool of workers, converts every worker failure into a
//! failed record (nothing propagates to the caller), and returns after the
//! last task has finished and the progress reporter has flushed.
//!
//! Results are persisted in the order attempts complete, not submission
//! order; per-identifier interleaving is impossible because the store
//! serializes `upsert`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ferry_core::config::TransferConfig;
use ferry_core::ports::TransferAgent;
use ferry_core::transfer::{TransferOutcome, TransferRecord, TransferRequest};

use crate::progress;
use crate::state::StateStore;
use crate::worker::{self, WorkerContext};

/// Metadata kept per spawned task so a panicked worker can still be
/// attributed to its request.
struct TaskMeta {
    file_name: String,
    checksum: Option<String>,
    destination: String,
}

/// Top-level coordinator for one batch of transfer requests.
pub struct TransferOrchestrator {
    config: TransferConfig,
    agent: Arc<dyn TransferAgent>,
    store: Arc<StateStore>,
    cancel: CancellationToken,
}

impl TransferOrchestrator {
    /// Create an orchestrator; the state store lives at
    /// `config.state_file`.
    pub fn new(config: TransferConfig, agent: Arc<dyn TransferAgent>) -> Self {
        let store = Arc::new(StateStore::new(&config.state_file, config.backup_interval));
        Self {
            config,
            agent,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Clone of the run-wide cancellation token, for signal wiring.
    ///
    /// Setting it is one-way: no new agent process is spawned afterwards
    /// and running agents are terminated promptly.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The underlying state store.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Run a batch of requests with at most `concurrency` agents active.
    ///
    /// Returns one outcome per attempted request. Never fails: worker
    /// errors and panics become failed outcomes and failed records.
    pub async fn run(
        &self,
        requests: Vec<TransferRequest>,
        concurrency: usize,
    ) -> HashMap<String, TransferOutcome> {
        let mut results = HashMap::new();

        let snapshot = self.store.load().await;
        let pending: Vec<TransferRequest> = requests
            .into_iter()
            .filter(|request| {
                let done = snapshot
                    .get(&request.file_name)
                    .is_some_and(TransferRecord::is_verified_complete);
                if done {
                    info!(
                        file = %request.file_name,
                        "Skipping: already transferred and verified"
                    );
                }
                !done
            })
            .collect();

        if pending.is_empty() {
            info!("No files to transfer; all are already completed and verified");
            return results;
        }

        info!(
            count = pending.len(),
            concurrency, "Starting transfers"
        );
        let started = Instant::now();

        let (progress, reporter) = progress::channel(self.config.combined_log.clone());
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let mut tasks = JoinSet::new();
        let mut meta: HashMap<tokio::task::Id, TaskMeta> = HashMap::new();

        for (index, request) in pending.into_iter().enumerate() {
            let ctx = WorkerContext {
                worker_id: format!("worker-{}", index + 1),
                agent: Arc::clone(&self.agent),
                log_dir: self.config.log_dir.clone(),
                cancel: self.cancel.clone(),
                progress: progress.clone(),
            };
            let semaphore = Arc::clone(&semaphore);

            let task_meta = TaskMeta {
                file_name: request.file_name.clone(),
                checksum: request.checksum.clone(),
                destination: request
                    .destination_in(&self.config.output_dir)
                    .display()
                    .to_string(),
            };

            let handle = tasks.spawn(async move {
                // Wait for a pool slot, bailing out if the run stops first
                // so cancellation never queues more agent processes.
                let permit = tokio::select! {
                    biased;
                    () = ctx.cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };

                let outcome = match permit {
                    None => Ok(TransferOutcome::stopped()),
                    Some(_permit) => worker::execute(&ctx, &request).await,
                };
                (request, outcome)
            });
            meta.insert(handle.id(), task_meta);
        }

        // Senders for finished workers are dropped with their contexts; the
        // orchestrator's own handle keeps the reporter alive until the end.
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, (request, outcome))) => {
                    meta.remove(&id);
                    let destination = request
                        .destination_in(&self.config.output_dir)
                        .display()
                        .to_string();
                    let (outcome, record) = match outcome {
                        Ok(outcome) => {
                            let record = self.build_record(&request, &outcome, &destination);
                            (outcome, record)
                        }
                        Err(e) => {
                            warn!(file = %request.file_name, error = %e, "Worker error");
                            let message = format!("error: {e}");
                            let record = TransferRecord::failed(
                                request.checksum.as_deref(),
                                &destination,
                                self.agent.name(),
                                &message,
                            );
                            (
                                TransferOutcome::failed(message, std::time::Duration::ZERO),
                                record,
                            )
                        }
                    };
                    self.persist(&request.file_name, record).await;
                    results.insert(request.file_name, outcome);
                }
                Err(join_err) => {
                    // A worker panicked; attribute it via the task metadata.
                    let Some(task_meta) = meta.remove(&join_err.id()) else {
                        error!(error = %join_err, "Unattributable worker failure");
                        continue;
                    };
                    error!(file = %task_meta.file_name, error = %join_err, "Worker panicked");
                    let message = format!("error: {join_err}");
                    let record = TransferRecord::failed(
                        task_meta.checksum.as_deref(),
                        &task_meta.destination,
                        self.agent.name(),
                        &message,
                    );
                    self.persist(&task_meta.file_name, record).await;
                    results.insert(
                        task_meta.file_name,
                        TransferOutcome::failed(message, std::time::Duration::ZERO),
                    );
                }
            }
        }

        // Close the pipe and wait for the reporter's final flush.
        drop(progress);
        if let Err(e) = reporter.await {
            warn!(error = %e, "Progress reporter ended abnormally");
        }

        info!(
            "All transfers completed or interrupted in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        results
    }

    /// Translate an outcome into the record the invariant allows.
    ///
    /// A clean exit only counts as `completed` when a checksum was there
    /// to verify; a zero-exit transfer without one is persisted as failed
    /// ("completed without checksum verification") so it stays eligible
    /// for a verified re-attempt.
    fn build_record(
        &self,
        request: &TransferRequest,
        outcome: &TransferOutcome,
        destination: &str,
    ) -> TransferRecord {
        if outcome.success {
            match &request.checksum {
                Some(checksum) => {
                    TransferRecord::completed(checksum, destination, self.agent.name())
                }
                None => TransferRecord::failed(
                    None,
                    destination,
                    self.agent.name(),
                    "completed without checksum verification",
                ),
            }
        } else {
            TransferRecord::failed(
                request.checksum.as_deref(),
                destination,
                self.agent.name(),
                &outcome.message,
            )
        }
    }

    /// Upsert one record; persistence failures are logged, never fatal to
    /// the run.
    async fn persist(&self, file_name: &str, record: TransferRecord) {
        if let Err(e) = self.store.upsert(file_name, record).await {
            error!(file = %file_name, error = %e, "Failed to persist transfer record");
        }
    }
}
