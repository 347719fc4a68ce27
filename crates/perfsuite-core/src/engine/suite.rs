use super::executor::{PlanExecutor, PlanRunOutcome};
use crate::errors::{OrchestrationError, Result};
use crate::model::{RowId, SuiteExecution, SuiteRunStatus};
use crate::on_error::{log_plan_failure, FailurePolicy};
use crate::storage::store::now_rfc3339;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize)]
pub struct PlanFailure {
    pub plan_version_id: RowId,
    pub order: i64,
    pub message: String,
    pub retriable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteRunReport {
    pub suite_id: RowId,
    pub suite_name: String,
    pub suite_version: String,
    pub suite_execution: SuiteExecution,
    pub outcomes: Vec<PlanRunOutcome>,
    pub failures: Vec<PlanFailure>,
    /// Plans that never started because the run stopped early.
    pub skipped_plan_version_ids: Vec<RowId>,
}

impl SuiteRunReport {
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
            && self.skipped_plan_version_ids.is_empty()
            && self.outcomes.iter().all(PlanRunOutcome::passed)
    }
}

/// Runs the plans of a suite's latest version one after another.
pub struct SuiteSequencer {
    executor: PlanExecutor,
    policy: FailurePolicy,
}

impl SuiteSequencer {
    pub fn new(executor: PlanExecutor, policy: FailurePolicy) -> Self {
        Self { executor, policy }
    }

    pub async fn run_suite(
        &self,
        test_suite_id: RowId,
        cancel: &CancellationToken,
    ) -> Result<SuiteRunReport> {
        let store = self.executor.store();
        let suite = store.get_test_suite(test_suite_id)?;
        let version = store
            .latest_suite_version(suite.id)?
            .ok_or_else(|| OrchestrationError::not_found("TestSuiteVersion", format!("suite {}", suite.id)))?;

        let plans = store.suite_version_plans(version.id)?;
        if plans.is_empty() {
            return Err(OrchestrationError::StructuralFailure(format!(
                "suite '{}' version {} has no test plans",
                suite.name, version.version
            )));
        }

        tracing::info!(
            event = "perfsuite.suite.start",
            suite_id = suite.id,
            suite = %suite.name,
            suite_version = %version.version,
            plans = plans.len(),
            policy = ?self.policy,
        );

        let started_at = now_rfc3339();
        let mut outcomes = Vec::with_capacity(plans.len());
        let mut failures = Vec::new();
        let mut skipped = Vec::new();
        let mut stopped = false;
        let mut cancelled = false;

        // Strictly sequential, ascending order.
        for plan in &plans {
            if stopped {
                skipped.push(plan.plan_version_id);
                continue;
            }
            if cancel.is_cancelled() {
                failures.push(PlanFailure {
                    plan_version_id: plan.plan_version_id,
                    order: plan.order,
                    message: OrchestrationError::Cancelled.to_string(),
                    retriable: false,
                });
                stopped = true;
                cancelled = true;
                continue;
            }

            match self
                .executor
                .run_plan_version(plan.plan_version_id, cancel)
                .await
            {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    log_plan_failure(self.policy, version.id, plan.plan_version_id, plan.order, &e);
                    let was_cancelled = matches!(e, OrchestrationError::Cancelled);
                    failures.push(PlanFailure {
                        plan_version_id: plan.plan_version_id,
                        order: plan.order,
                        message: e.to_string(),
                        retriable: e.is_retriable(),
                    });
                    cancelled |= was_cancelled;
                    if was_cancelled || self.policy.stops_on_error() {
                        stopped = true;
                    }
                }
            }
        }
        let ended_at = now_rfc3339();

        // Aborted only when work was actually cut short.
        let status = if cancelled || !skipped.is_empty() {
            SuiteRunStatus::Aborted
        } else if failures.is_empty() {
            SuiteRunStatus::Completed
        } else {
            SuiteRunStatus::Partial
        };

        let execution_ids: Vec<RowId> = outcomes
            .iter()
            .map(|o| o.recorded.execution.id)
            .collect();
        let suite_execution =
            store.insert_suite_execution(version.id, &started_at, &ended_at, status, &execution_ids)?;

        tracing::info!(
            event = "perfsuite.suite.done",
            suite_id = suite.id,
            suite_execution_id = suite_execution.id,
            status = status.as_str(),
            executed = outcomes.len(),
            failed = failures.len(),
            skipped = skipped.len(),
        );

        Ok(SuiteRunReport {
            suite_id: suite.id,
            suite_name: suite.name,
            suite_version: version.version,
            suite_execution,
            outcomes,
            failures,
            skipped_plan_version_ids: skipped,
        })
    }
}
