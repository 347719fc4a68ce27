use crate::command::{run_checked, ToolCommand};
use crate::measure::{format_measure, is_cold_start, mean, RunPlan, LAUNCH_TIME_MS};
use crate::packages::package_path;
use anyhow::Context;
use async_trait::async_trait;
use perfsuite_core::engine::PlatformRunner;
use perfsuite_core::model::{ExecutionConfig, RunOutput, SUCCESS_KEY};
use perfsuite_core::thresholds::evaluate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Drives a simulator through `xcrun simctl`. Launch time is wall clock
/// around `simctl launch`.
pub struct IosRunner {
    xcrun: String,
    packages_dir: PathBuf,
    tool: Arc<dyn ToolCommand>,
}

impl IosRunner {
    pub fn new(xcrun: impl Into<String>, packages_dir: impl Into<PathBuf>, tool: Arc<dyn ToolCommand>) -> Self {
        Self {
            xcrun: xcrun.into(),
            packages_dir: packages_dir.into(),
            tool,
        }
    }

    async fn simctl(&self, args: &[&str]) -> anyhow::Result<String> {
        let mut full = vec!["simctl"];
        full.extend_from_slice(args);
        run_checked(self.tool.as_ref(), &self.xcrun, &full).await
    }

    async fn boot(&self, udid: &str) -> anyhow::Result<()> {
        let out = self.tool.run(&self.xcrun, &["simctl", "boot", udid]).await?;
        // Booting an already booted simulator is not an error for us.
        if out.success() || out.stderr.contains("Booted") {
            return Ok(());
        }
        anyhow::bail!("simctl boot {} failed: {}", udid, out.stderr.trim())
    }
}

#[async_trait]
impl PlatformRunner for IosRunner {
    fn platform(&self) -> &'static str {
        "iOS"
    }

    async fn run(&self, config: &ExecutionConfig) -> anyhow::Result<RunOutput> {
        let udid = config
            .device_serial_number
            .as_deref()
            .filter(|s| !s.is_empty())
            .with_context(|| format!("simulator '{}' has no udid", config.device_name))?;
        let plan = RunPlan::from_config(config)?;

        let bundle = package_path(&self.packages_dir, &config.app_name, &config.app_version, "app");
        if !bundle.exists() {
            anyhow::bail!("package not found: {}", bundle.display());
        }
        let bundle = bundle.to_string_lossy().into_owned();

        self.boot(udid).await?;
        self.simctl(&["install", udid, &bundle]).await?;

        let cold = is_cold_start(config);
        let mut samples = Vec::new();
        for run in 0..plan.total() {
            if cold {
                // Exit status ignored, terminate fails when the app is not running.
                let _ = self
                    .tool
                    .run(&self.xcrun, &["simctl", "terminate", udid, &config.app_package])
                    .await?;
            }
            let started = Instant::now();
            self.simctl(&["launch", udid, &config.app_package]).await?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            tracing::debug!(
                event = "perfsuite.ios.launch",
                udid = %udid,
                run,
                warmup = plan.is_warmup(run),
                elapsed_ms,
            );
            if !plan.is_warmup(run) {
                samples.push(elapsed_ms.round());
            }
        }

        let mut out = RunOutput::new();
        if let Some(v) = mean(&samples) {
            out.insert(LAUNCH_TIME_MS.to_string(), format_measure(v));
        }
        let verdict = evaluate(&config.test_thresholds, &out);
        out.insert(SUCCESS_KEY.to_string(), verdict.passed.to_string());
        Ok(out)
    }
}
