mod common;

use common::{count, output, plan_request, Harness};
use perfsuite_core::engine::assembler::load_config;
use perfsuite_core::engine::PlatformRunner;
use perfsuite_core::errors::OrchestrationError;
use perfsuite_core::model::ParameterValueRequest;
use perfsuite_core::providers::fake::ScriptedRunner;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn single_plan_runs_and_persists_results() {
    let h = Harness::new();
    let created = h
        .versioning()
        .create_version(&plan_request("PlanA", "com.example.a"))
        .await
        .unwrap();

    let runner = Arc::new(
        ScriptedRunner::new("android").push_output(output(&[("success", "true"), ("out1", "42")])),
    );
    let executor = h.executor(vec![runner.clone() as Arc<dyn PlatformRunner>], Duration::from_secs(5));

    let outcome = executor
        .run_plan_version(created.version.id, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.passed());
    assert_eq!(outcome.recorded.execution.passed, "true");
    assert_eq!(outcome.recorded.execution.test_plan_version_id, created.version.id);
    assert!(outcome.recorded.execution.started_at <= outcome.recorded.execution.ended_at);

    let results = h.store.output_results(outcome.recorded.execution.id).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.value, "42");
    assert_eq!(results[0].1.name, "out1");

    let received = runner.received();
    assert_eq!(received.len(), 1);
    let config = &received[0];
    assert_eq!(config.platform, "Android");
    assert_eq!(config.device_name, "deviceA");
    assert_eq!(config.device_serial_number.as_deref(), Some("serialA"));
    assert_eq!(config.app_version, "1.0");
    assert_eq!(config.test_thresholds.len(), 1);
    assert_eq!(config.test_thresholds[0].threshold_type, "MAX");
    assert_eq!(config.test_thresholds[0].target_value, 100.0);
    assert_eq!(config.test_thresholds[0].output_name, "out1");
}

#[tokio::test]
async fn failed_test_is_recorded_not_raised() {
    let h = Harness::new();
    let created = h
        .versioning()
        .create_version(&plan_request("PlanA", "com.example.a"))
        .await
        .unwrap();
    let runner: Arc<dyn PlatformRunner> = Arc::new(
        ScriptedRunner::new("Android").push_output(output(&[("success", "false"), ("out1", "250")])),
    );

    let outcome = h
        .executor(vec![runner], Duration::from_secs(5))
        .run_plan_version(created.version.id, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.passed());
    assert_eq!(h.store.list_executions(created.version.id).unwrap().len(), 1);
}

#[tokio::test]
async fn runner_error_writes_no_execution() {
    let h = Harness::new();
    let created = h
        .versioning()
        .create_version(&plan_request("PlanA", "com.example.a"))
        .await
        .unwrap();
    let runner: Arc<dyn PlatformRunner> =
        Arc::new(ScriptedRunner::new("Android").push_failure("adb: device offline"));

    let err = h
        .executor(vec![runner], Duration::from_secs(5))
        .run_plan_version(created.version.id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::RunnerFailure { .. }));
    assert!(err.to_string().contains("device offline"));
    assert_eq!(count(&h.store, "test_executions"), 0);
}

#[tokio::test]
async fn platform_without_runner_is_unsupported() {
    let h = Harness::new();
    let created = h
        .versioning()
        .create_version(&plan_request("PlanA", "com.example.a"))
        .await
        .unwrap();
    let ios_only: Arc<dyn PlatformRunner> = Arc::new(ScriptedRunner::new("iOS"));

    let err = h
        .executor(vec![ios_only], Duration::from_secs(5))
        .run_plan_version(created.version.id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::UnsupportedPlatform(ref p) if p == "Android"));
}

#[tokio::test]
async fn assembled_params_are_keyed_by_definition_name() {
    let h = Harness::new();
    let mut req = plan_request("PlanA", "com.example.a");
    req.metric_params.push(ParameterValueRequest {
        name: "trace".into(),
        value: "true".into(),
    });
    req.execution_type_params.push(ParameterValueRequest {
        name: "warmup_runs".into(),
        value: "1".into(),
    });
    let created = h.versioning().create_version(&req).await.unwrap();

    let config = load_config(&h.store, created.version.id).unwrap();
    assert_eq!(config.metric_name, "metricA");
    assert_eq!(config.execution_type_name, "cold_start");
    assert_eq!(config.metric_params.get("iterations").map(String::as_str), Some("3"));
    assert_eq!(config.metric_params.get("trace").map(String::as_str), Some("true"));
    assert_eq!(config.execution_type_params.len(), 1);
    assert_eq!(config.execution_type_params["warmup_runs"], "1");
    assert_eq!(config.app_package, "com.example.a");
    assert_eq!(config.main_activity, ".MainActivity");
}

#[tokio::test]
async fn unknown_plan_version_is_not_found() {
    let h = Harness::new();
    let err = load_config(&h.store, 77).unwrap_err();
    assert!(matches!(err, OrchestrationError::NotFound { .. }));
}

#[tokio::test]
async fn undeclared_output_is_logged_and_skipped() {
    let h = Harness::new();
    let created = h
        .versioning()
        .create_version(&plan_request("PlanA", "com.example.a"))
        .await
        .unwrap();
    let runner: Arc<dyn PlatformRunner> = Arc::new(ScriptedRunner::new("Android").push_output(
        output(&[("success", "true"), ("out1", "42"), ("frame_drops", "3")]),
    ));
    let executor = h.executor(vec![runner], Duration::from_secs(5));

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let buffer_clone = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_writer(move || MockWriter(buffer_clone.clone()))
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let outcome = executor
        .run_plan_version(created.version.id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.recorded.ignored_keys, vec!["frame_drops".to_string()]);
    assert_eq!(outcome.recorded.results.len(), 1);

    let logged = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(logged.contains("\"event\":\"perfsuite.results.unknown_output\""));
    assert!(logged.contains("\"key\":\"frame_drops\""));
    assert!(logged.contains("\"level\":\"WARN\""));
}

struct MockWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
