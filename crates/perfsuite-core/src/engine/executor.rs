use super::assembler::{assemble, PlanSnapshot};
use super::dispatch::Dispatcher;
use super::results::{RecordedExecution, ResultRecorder};
use crate::errors::Result;
use crate::model::{ExecutionConfig, RowId};
use crate::storage::store::now_rfc3339;
use crate::storage::Store;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize)]
pub struct PlanRunOutcome {
    pub plan_version_id: RowId,
    pub plan_name: String,
    pub version: String,
    pub config: ExecutionConfig,
    pub recorded: RecordedExecution,
}

impl PlanRunOutcome {
    pub fn passed(&self) -> bool {
        self.recorded.execution.is_passed()
    }
}

/// Assemble, dispatch and persist a single plan version.
#[derive(Clone)]
pub struct PlanExecutor {
    store: Store,
    dispatcher: Dispatcher,
    recorder: ResultRecorder,
}

impl PlanExecutor {
    pub fn new(store: Store, dispatcher: Dispatcher) -> Self {
        Self {
            recorder: ResultRecorder::new(store.clone()),
            store,
            dispatcher,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn run_plan_version(
        &self,
        plan_version_id: RowId,
        cancel: &CancellationToken,
    ) -> Result<PlanRunOutcome> {
        let snapshot = PlanSnapshot::load(&self.store, plan_version_id)?;
        let config = assemble(&snapshot);

        let started_at = now_rfc3339();
        let output = self.dispatcher.dispatch(&config, cancel).await?;
        let ended_at = now_rfc3339();

        let recorded = self.recorder.record(
            plan_version_id,
            snapshot.metric.id,
            &started_at,
            &ended_at,
            &output,
        )?;

        Ok(PlanRunOutcome {
            plan_version_id,
            plan_name: snapshot.plan.name,
            version: snapshot.plan_version.version,
            config,
            recorded,
        })
    }
}
