use crate::errors::{OrchestrationError, Result};
use crate::model::{CreateTestPlanRequest, ParameterValueRequest, RowId, TestPlan, TestPlanVersion};
use crate::resolver::EntityResolver;
use crate::storage::store::{NewPlanVersion, NewThreshold};
use crate::storage::Store;
use std::collections::HashSet;

/// `"1"` for the first version, otherwise the previous integer plus one.
pub fn next_version(latest: Option<&str>) -> Result<String> {
    match latest {
        None => Ok("1".to_string()),
        Some(v) => {
            let n: u64 = v.trim().parse().map_err(|_| {
                OrchestrationError::PersistenceFailure(format!(
                    "stored version '{v}' is not an integer"
                ))
            })?;
            Ok((n + 1).to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatedPlanVersion {
    pub plan: TestPlan,
    pub plan_created: bool,
    pub version: TestPlanVersion,
    pub suite_order: Option<i64>,
}

pub struct TestPlanVersioning {
    store: Store,
    resolver: EntityResolver,
}

impl TestPlanVersioning {
    pub fn new(store: Store, resolver: EntityResolver) -> Self {
        Self { store, resolver }
    }

    /// Resolves every reference in `req` first, then writes the version and
    /// its children in one transaction. Nothing is written when any lookup fails,
    /// apart from devices and apps the resolver registers along the way.
    pub async fn create_version(&self, req: &CreateTestPlanRequest) -> Result<CreatedPlanVersion> {
        let metric = self
            .store
            .find_metric_by_name(&req.metric)?
            .ok_or_else(|| OrchestrationError::not_found("Metric", &req.metric))?;
        let execution_type = self
            .store
            .find_execution_type_by_name(&req.execution_type)?
            .ok_or_else(|| OrchestrationError::not_found("ExecutionType", &req.execution_type))?;

        let device = self.resolver.resolve_device(&req.device).await?;
        let app = self.resolver.resolve_app(&req.app, &req.app_version).await?;

        let mut thresholds = Vec::with_capacity(req.thresholds.len());
        for t in &req.thresholds {
            let threshold_type = self
                .store
                .find_threshold_type_by_name(&t.threshold_type)?
                .ok_or_else(|| OrchestrationError::not_found("ThresholdType", &t.threshold_type))?;
            let output = self
                .store
                .find_metric_output(metric.id, &t.output)?
                .ok_or_else(|| {
                    OrchestrationError::InvalidReference(format!(
                        "output '{}' is not declared by metric '{}'",
                        t.output, metric.name
                    ))
                })?;
            if !t.target_value.is_finite() {
                return Err(OrchestrationError::InvalidReference(format!(
                    "threshold on '{}' has a non-finite target",
                    t.output
                )));
            }
            thresholds.push(NewThreshold {
                target_value: t.target_value,
                threshold_type_id: threshold_type.id,
                metric_output_id: output.id,
            });
        }

        ensure_unique_names(&req.metric_params, "metric")?;
        let mut metric_params = Vec::with_capacity(req.metric_params.len());
        for p in &req.metric_params {
            let def = self
                .store
                .find_metric_parameter(metric.id, &p.name)?
                .ok_or_else(|| {
                    OrchestrationError::not_found(
                        "MetricParameter",
                        format!("{}.{}", metric.name, p.name),
                    )
                })?;
            metric_params.push((def.id, p.value.clone()));
        }

        ensure_unique_names(&req.execution_type_params, "execution type")?;
        let mut execution_type_params = Vec::with_capacity(req.execution_type_params.len());
        for p in &req.execution_type_params {
            let def = self
                .store
                .find_execution_type_parameter(execution_type.id, &p.name)?
                .ok_or_else(|| {
                    OrchestrationError::not_found(
                        "ExecutionTypeParameter",
                        format!("{}.{}", execution_type.name, p.name),
                    )
                })?;
            execution_type_params.push((def.id, p.value.clone()));
        }

        if let Some(id) = req.test_suite_version_id {
            self.store.get_suite_version(id)?;
        }

        let inserted = self.store.insert_plan_version(&NewPlanVersion {
            plan_name: req.name.clone(),
            metric_id: metric.id,
            notes: req.notes.clone(),
            app_package: req.app_package.clone(),
            main_activity: req.main_activity.clone(),
            device_id: device.device.id,
            app_version_id: app.app_version.id,
            execution_type_id: execution_type.id,
            thresholds,
            metric_params,
            execution_type_params,
            suite_version_id: req.test_suite_version_id,
        })?;

        tracing::info!(
            event = "perfsuite.plan.version_created",
            plan_id = inserted.plan.id,
            plan = %inserted.plan.name,
            plan_version_id = inserted.version.id,
            version = %inserted.version.version,
            suite_order = ?inserted.suite_order,
            "created {} v{}", inserted.plan.name, inserted.version.version
        );

        Ok(CreatedPlanVersion {
            plan: inserted.plan,
            plan_created: inserted.plan_created,
            version: inserted.version,
            suite_order: inserted.suite_order,
        })
    }

    pub fn latest_version_id(&self, test_plan_id: RowId) -> Result<Option<RowId>> {
        Ok(self.store.latest_plan_version(test_plan_id)?.map(|v| v.id))
    }
}

fn ensure_unique_names(params: &[ParameterValueRequest], scope: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for p in params {
        if !seen.insert(p.name.as_str()) {
            return Err(OrchestrationError::InvalidReference(format!(
                "{scope} parameter '{}' given more than once",
                p.name
            )));
        }
    }
    Ok(())
}
