use crate::errors::{OrchestrationError, Result};
use crate::model::{ExecutionConfig, RunOutput};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Platform-specific execution capability.
///
/// The returned map carries `"success"` plus one entry per measured output.
#[async_trait]
pub trait PlatformRunner: Send + Sync {
    /// Platform name this runner serves, matched case-insensitively.
    fn platform(&self) -> &'static str;

    async fn run(&self, config: &ExecutionConfig) -> anyhow::Result<RunOutput>;
}

/// Name-keyed runner lookup. Keys are stored lowercased.
#[derive(Clone, Default)]
pub struct RunnerRegistry {
    runners: BTreeMap<String, Arc<dyn PlatformRunner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, runner: Arc<dyn PlatformRunner>) {
        self.runners
            .insert(runner.platform().to_ascii_lowercase(), runner);
    }

    pub fn with(mut self, runner: Arc<dyn PlatformRunner>) -> Self {
        self.register(runner);
        self
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn PlatformRunner>> {
        self.runners.get(&platform.to_ascii_lowercase()).cloned()
    }

    pub fn platforms(&self) -> Vec<String> {
        self.runners.keys().cloned().collect()
    }
}

/// Routes configurations to runners with a bounded wait per invocation.
#[derive(Clone)]
pub struct Dispatcher {
    registry: RunnerRegistry,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: RunnerRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &RunnerRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        config: &ExecutionConfig,
        cancel: &CancellationToken,
    ) -> Result<RunOutput> {
        let runner = self.registry.get(&config.platform).ok_or_else(|| {
            tracing::error!(
                event = "perfsuite.dispatch.unsupported_platform",
                platform = %config.platform,
                known = ?self.registry.platforms(),
                "no runner for platform {}", config.platform
            );
            OrchestrationError::UnsupportedPlatform(config.platform.clone())
        })?;

        if cancel.is_cancelled() {
            return Err(OrchestrationError::Cancelled);
        }

        tracing::info!(
            event = "perfsuite.dispatch.start",
            platform = runner.platform(),
            device = %config.device_name,
            app = %config.app_name,
            app_version = %config.app_version,
            metric = %config.metric_name,
            timeout_secs = self.timeout.as_secs(),
        );

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
            res = tokio::time::timeout(self.timeout, runner.run(config)) => res,
        };

        match outcome {
            Ok(Ok(output)) => {
                tracing::info!(
                    event = "perfsuite.dispatch.done",
                    platform = runner.platform(),
                    keys = output.len(),
                );
                Ok(output)
            }
            Ok(Err(e)) => Err(OrchestrationError::RunnerFailure {
                platform: runner.platform().to_string(),
                message: format!("{e:#}"),
            }),
            Err(_) => Err(OrchestrationError::Timeout {
                platform: runner.platform().to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fake::ScriptedRunner;

    fn config(platform: &str) -> ExecutionConfig {
        ExecutionConfig {
            execution_type_name: "cold_start".into(),
            metric_name: "launch_time".into(),
            metric_params: Default::default(),
            execution_type_params: Default::default(),
            test_thresholds: vec![],
            device_name: "deviceA".into(),
            device_serial_number: None,
            platform: platform.into(),
            app_name: "appA".into(),
            app_version: "1.0".into(),
            app_package: "com.example".into(),
            main_activity: ".Main".into(),
        }
    }

    #[tokio::test]
    async fn matches_platform_case_insensitively() {
        let registry = RunnerRegistry::new().with(Arc::new(ScriptedRunner::new("android")));
        let dispatcher = Dispatcher::new(registry, Duration::from_secs(5));
        let out = dispatcher
            .dispatch(&config("ANDROID"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.get("success").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn unknown_platform_is_an_error() {
        let registry = RunnerRegistry::new().with(Arc::new(ScriptedRunner::new("android")));
        let dispatcher = Dispatcher::new(registry, Duration::from_secs(5));
        let err = dispatcher
            .dispatch(&config("windows"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::UnsupportedPlatform(p) if p == "windows"));
    }

    #[tokio::test]
    async fn slow_runner_times_out() {
        let runner = ScriptedRunner::new("ios").with_delay(Duration::from_millis(200));
        let registry = RunnerRegistry::new().with(Arc::new(runner));
        let dispatcher = Dispatcher::new(registry, Duration::from_millis(20));
        let err = dispatcher
            .dispatch(&config("iOS"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Timeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_stops_in_flight_run() {
        let runner = ScriptedRunner::new("android").with_delay(Duration::from_secs(30));
        let registry = RunnerRegistry::new().with(Arc::new(runner));
        let dispatcher = Dispatcher::new(registry, Duration::from_secs(60));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = dispatcher
            .dispatch(&config("android"), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Cancelled));
    }

    #[tokio::test]
    async fn runner_errors_are_wrapped() {
        let runner = ScriptedRunner::new("android").push_failure("adb: device offline");
        let registry = RunnerRegistry::new().with(Arc::new(runner));
        let dispatcher = Dispatcher::new(registry, Duration::from_secs(5));
        let err = dispatcher
            .dispatch(&config("android"), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            OrchestrationError::RunnerFailure { platform, message } => {
                assert_eq!(platform, "android");
                assert!(message.contains("device offline"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
