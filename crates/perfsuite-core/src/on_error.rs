// on_error.rs - What a suite run does when one plan's pipeline errors.
//
// A plan that runs and fails its thresholds is a result, not an error. This
// policy only applies when resolution, dispatch or persistence fails.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing plan (default).
    ///
    /// Later plans may rely on device or app state left by earlier ones, so
    /// running them after a failure rarely measures what was intended.
    #[default]
    Abort,

    /// Record the failure and carry on with the next plan.
    Continue,
}

impl FailurePolicy {
    pub fn stops_on_error(&self) -> bool {
        matches!(self, FailurePolicy::Abort)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Some(FailurePolicy::Abort),
            "continue" => Some(FailurePolicy::Continue),
            _ => None,
        }
    }
}

/// Structured record of a plan failing inside a suite run.
pub fn log_plan_failure(
    policy: FailurePolicy,
    suite_version_id: i64,
    plan_version_id: i64,
    order: i64,
    error: &crate::errors::OrchestrationError,
) {
    tracing::warn!(
        event = "perfsuite.suite.plan_failed",
        suite_version_id,
        plan_version_id,
        order,
        retriable = error.is_retriable(),
        action = if policy.stops_on_error() { "abort" } else { "continue" },
        "plan at position {} failed: {}", order, error
    );
}
