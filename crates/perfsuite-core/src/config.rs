use crate::errors::ConfigError;
use crate::model::CreateTestPlanRequest;
use crate::on_error::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod path_resolver;

pub const DEFAULT_CONFIG_FILE: &str = "perfsuite.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    pub db: PathBuf,
    pub packages_dir: PathBuf,
    pub runner: RunnerSettings,
    pub suite: SuiteSettings,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            db: PathBuf::from(".perfsuite/perf.db"),
            packages_dir: PathBuf::from("packages"),
            runner: RunnerSettings::default(),
            suite: SuiteSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub timeout_seconds: u64,
    pub adb_path: String,
    pub xcrun_path: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 600,
            adb_path: "adb".into(),
            xcrun_path: "xcrun".into(),
        }
    }
}

impl RunnerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteSettings {
    pub on_failure: FailurePolicy,
}

/// Loads `perfsuite.yaml`. A missing file yields defaults.
///
/// Unknown keys fail in strict mode and are logged otherwise. Relative paths
/// are resolved against the directory holding the file.
pub fn load_config(path: &Path, strict: bool) -> Result<PerfConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(
            event = "perfsuite.config.defaults",
            path = %path.display(),
            "config file not found, using defaults"
        );
        return Ok(PerfConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw, strict)
        .map_err(|e| ConfigError(format!("{} (file: {})", e, path.display())))?;

    let r = path_resolver::PathResolver::new(path);
    r.resolve_in_place(&mut cfg.db);
    r.resolve_in_place(&mut cfg.packages_dir);
    Ok(cfg)
}

pub fn parse_config(raw: &str, strict: bool) -> Result<PerfConfig, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(PerfConfig::default());
    }

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let cfg: PerfConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    // x- prefixed keys are free-form extension points.
    let unknown: Vec<_> = ignored_keys
        .into_iter()
        .filter(|k| !k.starts_with("x-"))
        .collect();
    if !unknown.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields detected in strict mode: {:?}",
                unknown
            )));
        }
        tracing::warn!(
            event = "perfsuite.config.unknown_keys",
            keys = ?unknown,
            "ignored unknown config fields"
        );
    }

    if cfg.runner.timeout_seconds == 0 {
        return Err(ConfigError("runner.timeout_seconds must be > 0".into()));
    }
    Ok(cfg)
}

/// Applies `PERFSUITE_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(cfg: &mut PerfConfig) -> Result<(), ConfigError> {
    apply_overrides(cfg, |k| std::env::var(k).ok())
}

fn apply_overrides(
    cfg: &mut PerfConfig,
    get: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(db) = get("PERFSUITE_DB").filter(|v| !v.trim().is_empty()) {
        cfg.db = PathBuf::from(db);
    }
    if let Some(dir) = get("PERFSUITE_PACKAGES_DIR").filter(|v| !v.trim().is_empty()) {
        cfg.packages_dir = PathBuf::from(dir);
    }
    if let Some(raw) = get("PERFSUITE_RUNNER_TIMEOUT_SECS") {
        let secs: u64 = raw.trim().parse().map_err(|_| {
            ConfigError(format!("PERFSUITE_RUNNER_TIMEOUT_SECS: '{}' is not a number", raw))
        })?;
        if secs == 0 {
            return Err(ConfigError("PERFSUITE_RUNNER_TIMEOUT_SECS must be > 0".into()));
        }
        cfg.runner.timeout_seconds = secs;
    }
    Ok(())
}

pub fn load_plan_request(path: &Path) -> Result<CreateTestPlanRequest, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read plan {}: {}", path.display(), e)))?;
    serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError(format!("failed to parse plan {}: {}", path.display(), e)))
}

pub const SAMPLE_CONFIG: &str = r#"db: .perfsuite/perf.db
packages_dir: packages
runner:
  timeout_seconds: 600
  adb_path: adb
  xcrun_path: xcrun
suite:
  on_failure: abort
"#;

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
