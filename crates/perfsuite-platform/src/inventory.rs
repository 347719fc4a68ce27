use crate::command::{run_checked, ToolCommand};
use crate::measure::{parse_adb_devices, parse_simctl_devices};
use async_trait::async_trait;
use perfsuite_core::providers::{DeviceDescriptor, DeviceInventory};
use std::sync::Arc;

/// Devices attached to `adb`, matched by model name or serial. The
/// descriptor always carries the model name.
pub struct AdbDeviceInventory {
    adb: String,
    tool: Arc<dyn ToolCommand>,
}

impl AdbDeviceInventory {
    pub fn new(adb: impl Into<String>, tool: Arc<dyn ToolCommand>) -> Self {
        Self {
            adb: adb.into(),
            tool,
        }
    }

    async fn getprop(&self, serial: &str, prop: &str) -> anyhow::Result<String> {
        let out = run_checked(
            self.tool.as_ref(),
            &self.adb,
            &["-s", serial, "shell", "getprop", prop],
        )
        .await?;
        Ok(out.trim().to_string())
    }
}

#[async_trait]
impl DeviceInventory for AdbDeviceInventory {
    async fn get_device_by_name(&self, name: &str) -> anyhow::Result<Option<DeviceDescriptor>> {
        let listing = run_checked(self.tool.as_ref(), &self.adb, &["devices", "-l"]).await?;

        for dev in parse_adb_devices(&listing) {
            if dev.state != "device" {
                continue;
            }
            let model = match dev.model.clone() {
                Some(m) => m,
                None => match self.getprop(&dev.serial, "ro.product.model").await {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(
                            event = "perfsuite.inventory.device_skipped",
                            serial = %dev.serial,
                            error = %format!("{e:#}"),
                            "could not read model of {}", dev.serial
                        );
                        continue;
                    }
                },
            };
            if model != name && dev.serial != name {
                continue;
            }
            let os_version = self.getprop(&dev.serial, "ro.build.version.release").await?;
            return Ok(Some(DeviceDescriptor {
                device_name: model,
                serial_number: Some(dev.serial),
                os_name: "Android".into(),
                os_version,
            }));
        }
        Ok(None)
    }

    fn source_name(&self) -> &'static str {
        "adb"
    }
}

/// Simulators known to `xcrun simctl`. A booted simulator wins over a
/// shut-down one with the same name.
pub struct SimctlDeviceInventory {
    xcrun: String,
    tool: Arc<dyn ToolCommand>,
}

impl SimctlDeviceInventory {
    pub fn new(xcrun: impl Into<String>, tool: Arc<dyn ToolCommand>) -> Self {
        Self {
            xcrun: xcrun.into(),
            tool,
        }
    }
}

#[async_trait]
impl DeviceInventory for SimctlDeviceInventory {
    async fn get_device_by_name(&self, name: &str) -> anyhow::Result<Option<DeviceDescriptor>> {
        let json = run_checked(
            self.tool.as_ref(),
            &self.xcrun,
            &["simctl", "list", "devices", "--json"],
        )
        .await?;
        let mut matches: Vec<_> = parse_simctl_devices(&json)?
            .into_iter()
            .filter(|s| s.name == name)
            .collect();
        matches.sort_by_key(|s| s.state != "Booted");

        Ok(matches.into_iter().next().map(|s| DeviceDescriptor {
            device_name: s.name,
            serial_number: Some(s.udid),
            os_name: s.os_name,
            os_version: s.os_version,
        }))
    }

    fn source_name(&self) -> &'static str {
        "simctl"
    }
}

/// Asks each inventory in turn. A failing source is skipped unless every
/// source failed.
pub struct CompositeInventory {
    sources: Vec<Arc<dyn DeviceInventory>>,
}

impl CompositeInventory {
    pub fn new(sources: Vec<Arc<dyn DeviceInventory>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl DeviceInventory for CompositeInventory {
    async fn get_device_by_name(&self, name: &str) -> anyhow::Result<Option<DeviceDescriptor>> {
        let mut errors = Vec::new();
        for source in &self.sources {
            match source.get_device_by_name(name).await {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        event = "perfsuite.inventory.source_failed",
                        source = source.source_name(),
                        error = %format!("{e:#}"),
                    );
                    errors.push(e);
                }
            }
        }
        if !self.sources.is_empty() && errors.len() == self.sources.len() {
            let first = errors.remove(0);
            return Err(first.context("every device inventory failed"));
        }
        Ok(None)
    }

    fn source_name(&self) -> &'static str {
        "composite"
    }
}
