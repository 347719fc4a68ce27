use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod fake;

/// What the platform device listing knows about a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub device_name: String,
    pub serial_number: Option<String>,
    pub os_name: String,
    pub os_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub name: String,
}

/// Device listing tooling (emulator/simulator inventories).
#[async_trait]
pub trait DeviceInventory: Send + Sync {
    async fn get_device_by_name(&self, name: &str) -> anyhow::Result<Option<DeviceDescriptor>>;
    fn source_name(&self) -> &'static str;
}

/// Installable-package directory.
#[async_trait]
pub trait AppPackageRegistry: Send + Sync {
    async fn get_app_by_name_from_folder(&self, name: &str) -> anyhow::Result<Option<AppDescriptor>>;

    /// Returns the version string when a package for `name` at `version` exists.
    async fn get_app_version_by_name_from_folder(
        &self,
        name: &str,
        version: &str,
    ) -> anyhow::Result<Option<String>>;
}
