//! Parsers for tool output and the iteration plan shared by both runners.

use perfsuite_core::model::ExecutionConfig;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const LAUNCH_TIME_MS: &str = "launch_time_ms";
pub const MEMORY_PSS_KB: &str = "memory_pss_kb";

fn total_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*TotalTime:\s*(\d+)").expect("static regex"))
}

fn total_pss_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*TOTAL(?:\s+PSS:)?\s+(\d+)").expect("static regex"))
}

/// `TotalTime` from `am start -W`, in milliseconds.
pub fn parse_total_time(output: &str) -> Option<u64> {
    total_time_re()
        .captures(output)
        .and_then(|c| c[1].parse().ok())
}

/// Total PSS from `dumpsys meminfo <package>`, in kB.
pub fn parse_total_pss(output: &str) -> Option<u64> {
    total_pss_re()
        .captures(output)
        .and_then(|c| c[1].parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbDevice {
    pub serial: String,
    pub state: String,
    pub model: Option<String>,
}

/// Rows of `adb devices -l`. The header and daemon chatter are skipped.
pub fn parse_adb_devices(output: &str) -> Vec<AdbDevice> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of devices") && !l.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?.to_string();
            let state = parts.next()?.to_string();
            let model = parts
                .find_map(|p| p.strip_prefix("model:"))
                .map(|m| m.replace('_', " "));
            Some(AdbDevice {
                serial,
                state,
                model,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SimctlList {
    devices: BTreeMap<String, Vec<SimctlEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimctlEntry {
    udid: String,
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default = "available")]
    is_available: bool,
}

fn available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulator {
    pub udid: String,
    pub name: String,
    pub state: String,
    pub os_name: String,
    pub os_version: String,
}

/// `com.apple.CoreSimulator.SimRuntime.iOS-17-2` becomes `("iOS", "17.2")`.
pub fn parse_runtime(key: &str) -> Option<(String, String)> {
    let tail = key.rsplit('.').next()?;
    let (os, version) = tail.split_once('-')?;
    Some((os.to_string(), version.replace('-', ".")))
}

/// Available simulators from `xcrun simctl list devices --json`.
pub fn parse_simctl_devices(json: &str) -> anyhow::Result<Vec<Simulator>> {
    let list: SimctlList = serde_json::from_str(json)?;
    let mut out = Vec::new();
    for (runtime, entries) in list.devices {
        let Some((os_name, os_version)) = parse_runtime(&runtime) else {
            continue;
        };
        for e in entries.into_iter().filter(|e| e.is_available) {
            out.push(Simulator {
                udid: e.udid,
                name: e.name,
                state: e.state,
                os_name: os_name.clone(),
                os_version: os_version.clone(),
            });
        }
    }
    Ok(out)
}

/// Upper bound on launches per run, warmup included.
pub const MAX_LAUNCHES: u32 = 1_000;

/// How many launches to make and how many of them to discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub iterations: u32,
    pub warmup_runs: u32,
}

impl RunPlan {
    pub fn from_config(config: &ExecutionConfig) -> anyhow::Result<Self> {
        let iterations = count_param(&config.metric_params, "iterations", 1)?;
        if iterations == 0 {
            anyhow::bail!("metric parameter 'iterations' must be at least 1");
        }
        let warmup_runs = count_param(&config.execution_type_params, "warmup_runs", 0)?;
        match iterations.checked_add(warmup_runs) {
            Some(total) if total <= MAX_LAUNCHES => Ok(Self {
                iterations,
                warmup_runs,
            }),
            _ => anyhow::bail!(
                "iterations ({}) plus warmup_runs ({}) exceeds {} launches",
                iterations,
                warmup_runs,
                MAX_LAUNCHES
            ),
        }
    }

    pub fn total(&self) -> u32 {
        self.iterations.saturating_add(self.warmup_runs)
    }

    pub fn is_warmup(&self, run: u32) -> bool {
        run < self.warmup_runs
    }
}

fn count_param(params: &BTreeMap<String, String>, key: &str, default: u32) -> anyhow::Result<u32> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("parameter '{}' must be a whole number, got '{}'", key, raw)),
    }
}

/// Cold starts stop the app before each launch.
pub fn is_cold_start(config: &ExecutionConfig) -> bool {
    config.execution_type_name.to_ascii_lowercase().contains("cold")
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Whole numbers print without a fraction.
pub fn format_measure(v: f64) -> String {
    if v.fract().abs() < 1e-9 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}
