use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type RowId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingSystem {
    pub id: RowId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsVersion {
    pub id: RowId,
    pub version: String,
    pub os_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: RowId,
    pub name: String,
    pub serial_number: Option<String>,
    pub os_version_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: RowId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppVersion {
    pub id: RowId,
    pub app_id: RowId,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: RowId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricParameter {
    pub id: RowId,
    pub name: String,
    pub param_type: String,
    pub metric_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricOutput {
    pub id: RowId,
    pub name: String,
    pub unit: String,
    pub metric_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionType {
    pub id: RowId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTypeParameter {
    pub id: RowId,
    pub name: String,
    pub param_type: String,
    pub execution_type_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdType {
    pub id: RowId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPlan {
    pub id: RowId,
    pub name: String,
    pub metric_id: RowId,
}

/// Immutable snapshot of a plan's configuration. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPlanVersion {
    pub id: RowId,
    pub version: String,
    pub created_at: String,
    pub notes: String,
    pub app_package: String,
    pub main_activity: String,
    pub test_plan_id: RowId,
    pub device_id: RowId,
    pub app_version_id: RowId,
    pub execution_type_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestThreshold {
    pub id: RowId,
    pub target_value: f64,
    pub test_plan_version_id: RowId,
    pub threshold_type_id: RowId,
    pub metric_output_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetricParameterValue {
    pub id: RowId,
    pub value: String,
    pub test_plan_version_id: RowId,
    pub metric_parameter_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionTypeParameterValue {
    pub id: RowId,
    pub value: String,
    pub test_plan_version_id: RowId,
    pub execution_type_parameter_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: RowId,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteVersion {
    pub id: RowId,
    pub version: String,
    pub created_at: String,
    pub notes: String,
    pub test_suite_id: RowId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteVersionPlan {
    pub suite_version_id: RowId,
    pub plan_version_id: RowId,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecution {
    pub id: RowId,
    pub started_at: String,
    pub ended_at: String,
    pub passed: String,
    pub test_plan_version_id: RowId,
}

impl TestExecution {
    pub fn is_passed(&self) -> bool {
        self.passed == "true"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetricOutputResult {
    pub id: RowId,
    pub value: String,
    pub metric_output_id: RowId,
    pub test_execution_id: RowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteRunStatus {
    /// Every plan ran through the pipeline.
    Completed,
    /// Some plans errored, but no plan was skipped.
    Partial,
    /// Cancelled, or stopped at a failing plan with later plans skipped.
    Aborted,
}

impl SuiteRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteRunStatus::Completed => "completed",
            SuiteRunStatus::Partial => "partial",
            SuiteRunStatus::Aborted => "aborted",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => SuiteRunStatus::Completed,
            "partial" => SuiteRunStatus::Partial,
            _ => SuiteRunStatus::Aborted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteExecution {
    pub id: RowId,
    pub started_at: String,
    pub ended_at: String,
    pub test_suite_version_id: RowId,
    pub status: SuiteRunStatus,
    pub test_execution_ids: Vec<RowId>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Input for creating a plan version. Entities are named loosely and resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTestPlanRequest {
    pub name: String,
    pub metric: String,
    pub execution_type: String,
    pub device: String,
    pub app: String,
    pub app_version: String,
    #[serde(default)]
    pub notes: String,
    pub app_package: String,
    #[serde(default)]
    pub main_activity: String,
    #[serde(default)]
    pub thresholds: Vec<ThresholdRequest>,
    #[serde(default)]
    pub metric_params: Vec<ParameterValueRequest>,
    #[serde(default)]
    pub execution_type_params: Vec<ParameterValueRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_suite_version_id: Option<RowId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdRequest {
    pub target_value: f64,
    #[serde(rename = "type")]
    pub threshold_type: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterValueRequest {
    pub name: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Execution configuration handed to runners
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub target_value: f64,
    pub threshold_type: String,
    pub output_name: String,
}

/// Flat, storage-free view of a plan version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub execution_type_name: String,
    pub metric_name: String,
    pub metric_params: BTreeMap<String, String>,
    pub execution_type_params: BTreeMap<String, String>,
    pub test_thresholds: Vec<ThresholdSpec>,
    pub device_name: String,
    pub device_serial_number: Option<String>,
    pub platform: String,
    pub app_name: String,
    pub app_version: String,
    pub app_package: String,
    pub main_activity: String,
}

/// Raw runner output. `"success"` carries the verdict, other keys are output names.
pub type RunOutput = BTreeMap<String, String>;

pub const SUCCESS_KEY: &str = "success";
