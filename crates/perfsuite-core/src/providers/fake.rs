//! In-memory collaborators for tests and dry runs.

use super::{AppDescriptor, AppPackageRegistry, DeviceDescriptor, DeviceInventory};
use crate::engine::dispatch::PlatformRunner;
use crate::model::{ExecutionConfig, RunOutput};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct FakeDeviceInventory {
    devices: Vec<DeviceDescriptor>,
    lookups: AtomicUsize,
}

impl FakeDeviceInventory {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceInventory for FakeDeviceInventory {
    async fn get_device_by_name(&self, name: &str) -> anyhow::Result<Option<DeviceDescriptor>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.iter().find(|d| d.device_name == name).cloned())
    }

    fn source_name(&self) -> &'static str {
        "fake"
    }
}

/// Package folder stand-in: app name -> available versions.
#[derive(Default)]
pub struct FakePackageRegistry {
    apps: BTreeMap<String, Vec<String>>,
    app_lookups: AtomicUsize,
    version_lookups: AtomicUsize,
}

impl FakePackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        self.apps
            .entry(name.to_string())
            .or_default()
            .push(version.to_string());
        self
    }

    pub fn app_lookups(&self) -> usize {
        self.app_lookups.load(Ordering::SeqCst)
    }

    pub fn version_lookups(&self) -> usize {
        self.version_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppPackageRegistry for FakePackageRegistry {
    async fn get_app_by_name_from_folder(&self, name: &str) -> anyhow::Result<Option<AppDescriptor>> {
        self.app_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.apps.contains_key(name).then(|| AppDescriptor {
            name: name.to_string(),
        }))
    }

    async fn get_app_version_by_name_from_folder(
        &self,
        name: &str,
        version: &str,
    ) -> anyhow::Result<Option<String>> {
        self.version_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .apps
            .get(name)
            .and_then(|versions| versions.iter().find(|v| *v == version).cloned()))
    }
}

/// Shared, ordered record of runner start/finish events.
pub type EventLog = Arc<Mutex<Vec<String>>>;

enum Scripted {
    Output(RunOutput),
    Fail(String),
}

/// Runner that replays queued outputs and records every invocation.
pub struct ScriptedRunner {
    platform: &'static str,
    script: Mutex<VecDeque<Scripted>>,
    fallback: RunOutput,
    delay: Option<Duration>,
    log: EventLog,
    configs: Mutex<Vec<ExecutionConfig>>,
}

impl ScriptedRunner {
    pub fn new(platform: &'static str) -> Self {
        Self {
            platform,
            script: Mutex::new(VecDeque::new()),
            fallback: RunOutput::from([("success".to_string(), "true".to_string())]),
            delay: None,
            log: Arc::new(Mutex::new(Vec::new())),
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Output returned once the queue is empty.
    pub fn with_default_output(mut self, output: RunOutput) -> Self {
        self.fallback = output;
        self
    }

    pub fn push_output(self, output: RunOutput) -> Self {
        guard(&self.script).push_back(Scripted::Output(output));
        self
    }

    pub fn push_failure(self, message: &str) -> Self {
        guard(&self.script).push_back(Scripted::Fail(message.to_string()));
        self
    }

    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    pub fn received(&self) -> Vec<ExecutionConfig> {
        guard(&self.configs).clone()
    }
}

#[async_trait]
impl PlatformRunner for ScriptedRunner {
    fn platform(&self) -> &'static str {
        self.platform
    }

    async fn run(&self, config: &ExecutionConfig) -> anyhow::Result<RunOutput> {
        guard(&self.configs).push(config.clone());
        guard(&self.log).push(format!("start:{}", config.app_package));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = guard(&self.script).pop_front();
        let result = match next {
            Some(Scripted::Output(out)) => Ok(out),
            Some(Scripted::Fail(msg)) => Err(anyhow::anyhow!(msg)),
            None => Ok(self.fallback.clone()),
        };

        guard(&self.log).push(format!("end:{}", config.app_package));
        result
    }
}
