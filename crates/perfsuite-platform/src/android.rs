use crate::command::{run_checked, ToolCommand};
use crate::measure::{
    format_measure, is_cold_start, mean, parse_total_pss, parse_total_time, RunPlan,
    LAUNCH_TIME_MS, MEMORY_PSS_KB,
};
use crate::packages::package_path;
use anyhow::Context;
use async_trait::async_trait;
use perfsuite_core::engine::PlatformRunner;
use perfsuite_core::model::{ExecutionConfig, RunOutput, SUCCESS_KEY};
use perfsuite_core::thresholds::evaluate;
use std::path::PathBuf;
use std::sync::Arc;

/// Drives a device or emulator through `adb`.
pub struct AndroidRunner {
    adb: String,
    packages_dir: PathBuf,
    tool: Arc<dyn ToolCommand>,
}

impl AndroidRunner {
    pub fn new(adb: impl Into<String>, packages_dir: impl Into<PathBuf>, tool: Arc<dyn ToolCommand>) -> Self {
        Self {
            adb: adb.into(),
            packages_dir: packages_dir.into(),
            tool,
        }
    }

    async fn adb(&self, serial: &str, args: &[&str]) -> anyhow::Result<String> {
        let mut full = vec!["-s", serial];
        full.extend_from_slice(args);
        run_checked(self.tool.as_ref(), &self.adb, &full).await
    }
}

/// Which outputs a run should measure: the metric's own output plus any
/// output a threshold refers to.
fn wanted_outputs(config: &ExecutionConfig) -> (bool, bool) {
    let referenced = |name: &str| config.test_thresholds.iter().any(|t| t.output_name == name);
    let memory_metric = config.metric_name.to_ascii_lowercase().contains("memory");
    let launch = !memory_metric || referenced(LAUNCH_TIME_MS);
    let memory = memory_metric || referenced(MEMORY_PSS_KB);
    (launch, memory)
}

#[async_trait]
impl PlatformRunner for AndroidRunner {
    fn platform(&self) -> &'static str {
        "Android"
    }

    async fn run(&self, config: &ExecutionConfig) -> anyhow::Result<RunOutput> {
        let serial = config
            .device_serial_number
            .as_deref()
            .filter(|s| !s.is_empty())
            .with_context(|| format!("device '{}' has no adb serial", config.device_name))?;
        if config.main_activity.is_empty() {
            anyhow::bail!("plan for {} has no main_activity", config.app_package);
        }
        let plan = RunPlan::from_config(config)?;
        let (want_launch, want_memory) = wanted_outputs(config);

        let apk = package_path(&self.packages_dir, &config.app_name, &config.app_version, "apk");
        if !apk.exists() {
            anyhow::bail!("package not found: {}", apk.display());
        }
        let apk = apk.to_string_lossy().into_owned();
        self.adb(serial, &["install", "-r", &apk]).await?;

        let component = format!("{}/{}", config.app_package, config.main_activity);
        let cold = is_cold_start(config);
        let mut launch_samples = Vec::new();
        let mut memory_samples = Vec::new();

        for run in 0..plan.total() {
            if cold {
                self.adb(serial, &["shell", "am", "force-stop", &config.app_package])
                    .await?;
            }
            let started = self
                .adb(serial, &["shell", "am", "start", "-W", "-n", &component])
                .await?;
            let total_time = parse_total_time(&started)
                .with_context(|| format!("no TotalTime in `am start` output for {}", component))?;

            let pss = if want_memory {
                let meminfo = self
                    .adb(serial, &["shell", "dumpsys", "meminfo", &config.app_package])
                    .await?;
                Some(parse_total_pss(&meminfo).with_context(|| {
                    format!("no TOTAL PSS in meminfo for {}", config.app_package)
                })?)
            } else {
                None
            };

            tracing::debug!(
                event = "perfsuite.android.launch",
                serial = %serial,
                run,
                warmup = plan.is_warmup(run),
                total_time_ms = total_time,
                pss_kb = ?pss,
            );
            if plan.is_warmup(run) {
                continue;
            }
            launch_samples.push(total_time as f64);
            if let Some(kb) = pss {
                memory_samples.push(kb as f64);
            }
        }

        let mut out = RunOutput::new();
        if want_launch {
            if let Some(v) = mean(&launch_samples) {
                out.insert(LAUNCH_TIME_MS.to_string(), format_measure(v));
            }
        }
        if let Some(v) = mean(&memory_samples) {
            out.insert(MEMORY_PSS_KB.to_string(), format_measure(v));
        }

        let verdict = evaluate(&config.test_thresholds, &out);
        out.insert(SUCCESS_KEY.to_string(), verdict.passed.to_string());
        Ok(out)
    }
}
