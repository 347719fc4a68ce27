use crate::errors::Result;
use crate::model::{RowId, RunOutput, TestExecution, TestMetricOutputResult, SUCCESS_KEY};
use crate::storage::Store;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RecordedExecution {
    pub execution: TestExecution,
    /// (output name, stored result)
    pub results: Vec<(String, TestMetricOutputResult)>,
    /// Output keys with no matching declared output.
    pub ignored_keys: Vec<String>,
}

/// Reads the runner verdict. A missing `"success"` key counts as failure.
pub fn passed_from(output: &RunOutput) -> bool {
    output
        .get(SUCCESS_KEY)
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "pass" | "passed"
            )
        })
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct ResultRecorder {
    store: Store,
}

impl ResultRecorder {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Persists one execution and a result row per recognised output key.
    pub fn record(
        &self,
        plan_version_id: RowId,
        metric_id: RowId,
        started_at: &str,
        ended_at: &str,
        output: &RunOutput,
    ) -> Result<RecordedExecution> {
        let passed = passed_from(output);
        let mut matched = Vec::new();
        let mut names = Vec::new();
        let mut ignored_keys = Vec::new();

        for (key, value) in output.iter().filter(|(k, _)| k.as_str() != SUCCESS_KEY) {
            match self.store.find_metric_output(metric_id, key)? {
                Some(def) => {
                    matched.push((def.id, value.clone()));
                    names.push(key.clone());
                }
                None => {
                    tracing::warn!(
                        event = "perfsuite.results.unknown_output",
                        plan_version_id,
                        metric_id,
                        key = %key,
                        "runner returned undeclared output '{}'", key
                    );
                    ignored_keys.push(key.clone());
                }
            }
        }

        let (execution, rows) =
            self.store
                .insert_execution(plan_version_id, started_at, ended_at, passed, &matched)?;

        tracing::info!(
            event = "perfsuite.results.recorded",
            execution_id = execution.id,
            plan_version_id,
            passed = %execution.passed,
            outputs = rows.len(),
            ignored = ignored_keys.len(),
        );

        Ok(RecordedExecution {
            execution,
            results: names.into_iter().zip(rows).collect(),
            ignored_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(pairs: &[(&str, &str)]) -> RunOutput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn success_key_is_read_leniently() {
        assert!(passed_from(&out(&[("success", "true")])));
        assert!(passed_from(&out(&[("success", " TRUE ")])));
        assert!(passed_from(&out(&[("success", "1")])));
        assert!(!passed_from(&out(&[("success", "false")])));
        assert!(!passed_from(&out(&[("success", "maybe")])));
    }

    #[test]
    fn missing_success_key_is_failure() {
        assert!(!passed_from(&out(&[("out1", "42")])));
    }
}
