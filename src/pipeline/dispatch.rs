use crate::credentials::CredentialPool;
use crate::error::TaskError;
use crate::fleet::{self, FleetFloor};
use crate::models::{
    Credential, ModelResult, ScenarioRecord, TemperatureRecord, WorkItem, WorkItemId,
};
use crate::pipeline::traits::ChargingModel;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug)]
pub struct DispatchConfig {
    /// Upper bound on concurrently running model calls.
    pub concurrency: usize,
    pub call_timeout: Duration,
    pub floor: FleetFloor,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            call_timeout: Duration::from_secs(600),
            floor: FleetFloor::default(),
        }
    }
}

/// A work item whose model call succeeded, with its result already rescaled.
#[derive(Clone, Debug)]
pub struct CompletedTask {
    pub id: WorkItemId,
    pub county: String,
    pub tag: Option<String>,
    /// Scenario table as assembled, before any fleet substitution.
    pub scenarios: Vec<ScenarioRecord>,
    pub scale_factors: Vec<f64>,
    pub result: ModelResult,
}

/// Per-item outcome, always tagged with the item it came from.
#[derive(Debug)]
pub struct TaskOutcome {
    pub id: WorkItemId,
    pub county: String,
    pub result: Result<CompletedTask, TaskError>,
}

pub struct Dispatcher<M: ChargingModel> {
    model: Arc<M>,
    config: DispatchConfig,
}

impl<M: ChargingModel + 'static> Dispatcher<M> {
    pub fn new(model: Arc<M>, config: DispatchConfig) -> Self {
        Self { model, config }
    }

    /// Spawns one task per item, in submission order, each with `pool.assign(position)`.
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, items: Vec<WorkItem>, pool: &CredentialPool) -> Completions {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut set = JoinSet::new();
        let mut pending = HashMap::new();

        for (position, item) in items.into_iter().enumerate() {
            let credential = pool.assign(position).clone();
            let id = item.id;
            let county = item.county.clone();
            debug!(work_item = %id, county = %county, credential = %credential, "task submitted");
            let handle = set.spawn(run_task(
                Arc::clone(&self.model),
                item,
                credential,
                Arc::clone(&semaphore),
                self.config,
            ));
            pending.insert(handle.id(), (id, county));
        }
        info!(
            tasks = pending.len(),
            concurrency = self.config.concurrency,
            credentials = pool.len(),
            "dispatched"
        );
        Completions { set, pending }
    }
}

async fn run_task<M: ChargingModel>(
    model: Arc<M>,
    item: WorkItem,
    credential: Credential,
    semaphore: Arc<Semaphore>,
    config: DispatchConfig,
) -> TaskOutcome {
    let WorkItem {
        id,
        county,
        tag,
        temperatures,
        scenarios,
    } = item;

    let result = match semaphore.acquire_owned().await {
        Ok(_permit) => {
            call_model(
                model.as_ref(),
                &county,
                &temperatures,
                &scenarios,
                &credential,
                config,
            )
            .await
        }
        Err(e) => Err(TaskError::Aborted {
            county: county.clone(),
            reason: e.to_string(),
        }),
    };

    TaskOutcome {
        id,
        county: county.clone(),
        result: result.map(|(result, scale_factors)| CompletedTask {
            id,
            county,
            tag,
            scenarios,
            scale_factors,
            result,
        }),
    }
}

async fn call_model<M: ChargingModel + ?Sized>(
    model: &M,
    county: &str,
    temperatures: &[TemperatureRecord],
    scenarios: &[ScenarioRecord],
    credential: &Credential,
    config: DispatchConfig,
) -> Result<(ModelResult, Vec<f64>), TaskError> {
    let corrected = fleet::correct(county, scenarios, config.floor);
    debug!(county, credential = %credential, "calling charging model");
    let call = model.run(&corrected.scenarios, temperatures, credential, county);
    let mut result = match tokio::time::timeout(config.call_timeout, call).await {
        Err(_) => {
            return Err(TaskError::Timeout {
                county: county.to_string(),
                secs: config.call_timeout.as_secs(),
            })
        }
        Ok(Err(source)) => {
            return Err(TaskError::Model {
                county: county.to_string(),
                source,
            })
        }
        Ok(Ok(result)) => result,
    };
    fleet::rescale(&mut result, &corrected.scale_factors);
    Ok((result, corrected.scale_factors))
}

/// Outcomes in completion order.
pub struct Completions {
    set: JoinSet<TaskOutcome>,
    pending: HashMap<task::Id, (WorkItemId, String)>,
}

impl Completions {
    /// Next finished task, or `None` once every submitted task has been returned.
    /// A task that panicked or was aborted comes back as `TaskError::Aborted`.
    pub async fn next(&mut self) -> Option<TaskOutcome> {
        loop {
            match self.set.join_next_with_id().await? {
                Ok((task_id, outcome)) => {
                    self.pending.remove(&task_id);
                    return Some(outcome);
                }
                Err(e) => {
                    let Some((id, county)) = self.pending.remove(&e.id()) else {
                        continue;
                    };
                    return Some(TaskOutcome {
                        id,
                        county: county.clone(),
                        result: Err(TaskError::Aborted {
                            county,
                            reason: e.to_string(),
                        }),
                    });
                }
            }
        }
    }

    /// Tasks not yet returned by [`Completions::next`].
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn abort_all(&mut self) {
        self.set.abort_all();
    }
}
