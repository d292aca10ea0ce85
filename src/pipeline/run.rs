use crate::credentials::CredentialPool;
use crate::error::RunError;
use crate::models::{RunId, WorkItem};
use crate::pipeline::dispatch::{Dispatcher, TaskOutcome};
use crate::pipeline::sink::{FailedCounty, ResultSink, RunManifest};
use crate::pipeline::traits::{ChargingModel, LoadPlotter};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Dispatches work items and feeds each outcome to the sink as it arrives.
pub struct ProjectionPipeline<M, P>
where
    M: ChargingModel + 'static,
    P: LoadPlotter + 'static,
{
    pub dispatcher: Dispatcher<M>,
    pub sink: Arc<ResultSink<P>>,
    pub run_id: RunId,
    deadline: Option<(Instant, Duration)>,
}

impl<M, P> ProjectionPipeline<M, P>
where
    M: ChargingModel + 'static,
    P: LoadPlotter + 'static,
{
    pub fn new(dispatcher: Dispatcher<M>, sink: ResultSink<P>) -> Self {
        Self {
            dispatcher,
            sink: Arc::new(sink),
            run_id: RunId::new(),
            deadline: None,
        }
    }

    /// Fails the run once `limit` has elapsed from now, across all batches.
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some((Instant::now() + limit, limit));
        self
    }

    /// Runs one batch to completion. Individual county failures are recorded in the
    /// manifest; only the run deadline ends the batch early.
    pub async fn run_batch(
        &self,
        items: Vec<WorkItem>,
        pool: &CredentialPool,
        tag: Option<String>,
    ) -> Result<RunManifest, RunError> {
        let mut manifest = RunManifest::new(self.run_id, tag);
        let mut completions = self.dispatcher.dispatch(items, pool);

        loop {
            let next = match self.deadline {
                Some((at, limit)) => match tokio::time::timeout_at(at, completions.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let pending = completions.pending();
                        completions.abort_all();
                        error!(pending, "run deadline exceeded; aborting outstanding tasks");
                        return Err(RunError::DeadlineExceeded {
                            secs: limit.as_secs(),
                            pending,
                        });
                    }
                },
                None => completions.next().await,
            };
            let Some(outcome) = next else {
                break;
            };
            self.consume(outcome, &mut manifest).await;
        }

        manifest.finished_at = Some(Utc::now());
        if let Err(e) = self.sink.write_manifest(&manifest) {
            warn!(error = %e, "failed to write run manifest");
        }
        info!(
            tag = manifest.tag.as_deref().unwrap_or("all"),
            succeeded = manifest.succeeded.len(),
            failed = manifest.failed.len(),
            "batch finished"
        );
        Ok(manifest)
    }

    /// Records a failure, or persists the task off the runtime threads since plotting and
    /// CSV writes block.
    async fn consume(&self, outcome: TaskOutcome, manifest: &mut RunManifest) {
        let TaskOutcome { id, county, result } = outcome;
        let task = match result {
            Ok(task) => task,
            Err(e) => {
                error!(work_item = %id, county = %county, error = %e, "county failed");
                manifest.failed.push(FailedCounty {
                    work_item: id,
                    county,
                    reason: e.to_string(),
                });
                return;
            }
        };
        let sink = Arc::clone(&self.sink);
        let persisted = tokio::task::spawn_blocking(move || sink.persist(&task))
            .await
            .unwrap_or_else(|e| Err(anyhow::anyhow!("persist task failed: {e}")));
        match persisted {
            Ok(persisted) => {
                info!(work_item = %id, county = %county, "finished county");
                manifest.succeeded.push(persisted);
            }
            Err(e) => {
                error!(work_item = %id, county = %county, error = %e, "failed to persist county");
                manifest.failed.push(FailedCounty {
                    work_item: id,
                    county,
                    reason: format!("{e:#}"),
                });
            }
        }
    }
}
