//! Translation from relational rows to the flat configuration a runner consumes.

use crate::errors::Result;
use crate::model::*;
use crate::storage::Store;
use std::collections::BTreeMap;

/// All rows that make up one plan version, loaded read-only.
#[derive(Debug, Clone)]
pub struct PlanSnapshot {
    pub plan_version: TestPlanVersion,
    pub plan: TestPlan,
    pub metric: Metric,
    pub execution_type: ExecutionType,
    pub device: Device,
    pub os_version: OsVersion,
    pub os: OperatingSystem,
    pub app_version: AppVersion,
    pub app: App,
    pub metric_params: Vec<(TestMetricParameterValue, MetricParameter)>,
    pub execution_type_params: Vec<(TestExecutionTypeParameterValue, ExecutionTypeParameter)>,
    pub thresholds: Vec<(TestThreshold, ThresholdType, MetricOutput)>,
}

impl PlanSnapshot {
    pub fn load(store: &Store, plan_version_id: RowId) -> Result<Self> {
        let plan_version = store.get_plan_version(plan_version_id)?;
        let plan = store.get_test_plan(plan_version.test_plan_id)?;
        let metric = store.get_metric(plan.metric_id)?;
        let execution_type = store.get_execution_type(plan_version.execution_type_id)?;
        let device = store.get_device(plan_version.device_id)?;
        let os_version = store.get_os_version(device.os_version_id)?;
        let os = store.get_os(os_version.os_id)?;
        let app_version = store.get_app_version(plan_version.app_version_id)?;
        let app = store.get_app(app_version.app_id)?;

        Ok(Self {
            metric_params: store.metric_parameter_values(plan_version.id)?,
            execution_type_params: store.execution_type_parameter_values(plan_version.id)?,
            thresholds: store.thresholds_for(plan_version.id)?,
            plan_version,
            plan,
            metric,
            execution_type,
            device,
            os_version,
            os,
            app_version,
            app,
        })
    }
}

/// Pure: the same snapshot always yields the same configuration.
pub fn assemble(s: &PlanSnapshot) -> ExecutionConfig {
    let metric_params: BTreeMap<String, String> = s
        .metric_params
        .iter()
        .map(|(value, def)| (def.name.clone(), value.value.clone()))
        .collect();

    let execution_type_params: BTreeMap<String, String> = s
        .execution_type_params
        .iter()
        .map(|(value, def)| (def.name.clone(), value.value.clone()))
        .collect();

    let test_thresholds = s
        .thresholds
        .iter()
        .map(|(t, kind, output)| ThresholdSpec {
            target_value: t.target_value,
            threshold_type: kind.name.clone(),
            output_name: output.name.clone(),
        })
        .collect();

    ExecutionConfig {
        execution_type_name: s.execution_type.name.clone(),
        metric_name: s.metric.name.clone(),
        metric_params,
        execution_type_params,
        test_thresholds,
        device_name: s.device.name.clone(),
        device_serial_number: s.device.serial_number.clone(),
        platform: s.os.name.clone(),
        app_name: s.app.name.clone(),
        app_version: s.app_version.version.clone(),
        app_package: s.plan_version.app_package.clone(),
        main_activity: s.plan_version.main_activity.clone(),
    }
}

pub fn load_config(store: &Store, plan_version_id: RowId) -> Result<ExecutionConfig> {
    Ok(assemble(&PlanSnapshot::load(store, plan_version_id)?))
}
