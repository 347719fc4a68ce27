//! Get-or-create resolution of devices, operating systems and apps.
//!
//! Each step reports whether the row was already stored, freshly created, or
//! could not be produced from any source. The fallback order is always
//! datastore, then the external collaborator, then creation.

use crate::errors::{OrchestrationError, Result};
use crate::model::{App, AppVersion, Device, OperatingSystem, OsVersion};
use crate::providers::{AppPackageRegistry, DeviceDescriptor, DeviceInventory};
use crate::storage::Store;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found(T),
    Created(T),
    NotFound,
}

impl<T> Resolution<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Resolution::Found(v) | Resolution::Created(v) => Some(v),
            Resolution::NotFound => None,
        }
    }

    pub fn require(self, entity: &'static str, key: impl Into<String>) -> Result<T> {
        self.into_option()
            .ok_or_else(|| OrchestrationError::not_found(entity, key))
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedDevice {
    pub device: Device,
    pub os: OperatingSystem,
    pub os_version: OsVersion,
}

#[derive(Debug, Clone)]
pub struct ResolvedApp {
    pub app: App,
    pub app_version: AppVersion,
}

#[derive(Clone)]
pub struct EntityResolver {
    store: Store,
    inventory: Arc<dyn DeviceInventory>,
    packages: Arc<dyn AppPackageRegistry>,
}

impl EntityResolver {
    pub fn new(
        store: Store,
        inventory: Arc<dyn DeviceInventory>,
        packages: Arc<dyn AppPackageRegistry>,
    ) -> Self {
        Self {
            store,
            inventory,
            packages,
        }
    }

    pub async fn resolve_device(&self, name: &str) -> Result<ResolvedDevice> {
        let descriptor = self.describe_device(name).await?.require("Device", name)?;

        let os = self
            .resolve_operating_system(&descriptor.os_name)?
            .require("OperatingSystem", &descriptor.os_name)?;
        let os_version = self
            .resolve_os_version(&os, &descriptor.os_version)?
            .require("OSVersion", &descriptor.os_version)?;

        let device = match self.resolve_device_row(&descriptor, &os, &os_version)? {
            Resolution::Found(d) => d,
            Resolution::Created(d) => {
                tracing::info!(
                    event = "perfsuite.resolver.device_created",
                    device_id = d.id,
                    name = %d.name,
                    os = %os.name,
                    os_version = %os_version.version,
                    "registered device {}", d.name
                );
                d
            }
            Resolution::NotFound => return Err(OrchestrationError::not_found("Device", name)),
        };

        Ok(ResolvedDevice {
            device,
            os,
            os_version,
        })
    }

    pub async fn resolve_app(&self, name: &str, version: &str) -> Result<ResolvedApp> {
        let app = self.resolve_app_row(name).await?.require("App", name)?;
        let app_version = self
            .resolve_app_version_row(&app, version)
            .await?
            .require("AppVersion", format!("{name}@{version}"))?;
        Ok(ResolvedApp { app, app_version })
    }

    /// Inventory lookup. `NotFound` when no listing knows the name.
    pub async fn describe_device(&self, name: &str) -> Result<Resolution<DeviceDescriptor>> {
        let found = self
            .inventory
            .get_device_by_name(name)
            .await
            .map_err(|e| OrchestrationError::CollaboratorFailure {
                collaborator: "device inventory",
                message: format!("{e:#}"),
            })?;
        Ok(match found {
            Some(d) => Resolution::Found(d),
            None => {
                tracing::warn!(
                    event = "perfsuite.resolver.device_unknown",
                    name = %name,
                    source = self.inventory.source_name(),
                    "device {} not listed by inventory", name
                );
                Resolution::NotFound
            }
        })
    }

    pub fn resolve_operating_system(&self, name: &str) -> Result<Resolution<OperatingSystem>> {
        if let Some(os) = self.store.find_os_by_name(name)? {
            return Ok(Resolution::Found(os));
        }
        Ok(Resolution::Created(self.store.insert_os(name)?))
    }

    /// Looks only within `os`; a version string known under another OS is not reused.
    pub fn resolve_os_version(
        &self,
        os: &OperatingSystem,
        version: &str,
    ) -> Result<Resolution<OsVersion>> {
        if let Some(v) = self.store.find_os_version(os.id, version)? {
            return Ok(Resolution::Found(v));
        }
        Ok(Resolution::Created(
            self.store.insert_os_version(os.id, version)?,
        ))
    }

    /// iOS devices are keyed by serial number, everything else by name. A
    /// non-iOS device with a known serial is matched on the serial first.
    pub fn resolve_device_row(
        &self,
        descriptor: &DeviceDescriptor,
        os: &OperatingSystem,
        os_version: &OsVersion,
    ) -> Result<Resolution<Device>> {
        let serial = descriptor
            .serial_number
            .as_deref()
            .filter(|s| !s.trim().is_empty());

        let existing = if is_ios(&os.name) {
            let Some(serial) = serial else {
                return Err(OrchestrationError::InvalidReference(format!(
                    "iOS device '{}' has no serial number",
                    descriptor.device_name
                )));
            };
            self.store.find_device_by_serial(serial)?
        } else {
            match serial {
                Some(serial) => match self.store.find_device_by_serial(serial)? {
                    Some(device) => Some(device),
                    None => self.store.find_device_by_name(&descriptor.device_name)?,
                },
                None => self.store.find_device_by_name(&descriptor.device_name)?,
            }
        };

        if let Some(device) = existing {
            return Ok(Resolution::Found(device));
        }

        let device =
            self.store
                .insert_device(&descriptor.device_name, serial, os_version.id)?;
        Ok(Resolution::Created(device))
    }

    pub async fn resolve_app_row(&self, name: &str) -> Result<Resolution<App>> {
        if let Some(app) = self.store.find_app_by_name(name)? {
            return Ok(Resolution::Found(app));
        }

        let listed = self
            .packages
            .get_app_by_name_from_folder(name)
            .await
            .map_err(registry_failure)?;
        match listed {
            Some(desc) => {
                let app = self.store.insert_app(&desc.name)?;
                tracing::info!(
                    event = "perfsuite.resolver.app_created",
                    app_id = app.id,
                    name = %app.name,
                    "registered app {}", app.name
                );
                Ok(Resolution::Created(app))
            }
            None => Ok(Resolution::NotFound),
        }
    }

    pub async fn resolve_app_version_row(
        &self,
        app: &App,
        version: &str,
    ) -> Result<Resolution<AppVersion>> {
        if let Some(v) = self.store.find_app_version(app.id, version)? {
            return Ok(Resolution::Found(v));
        }

        let listed = self
            .packages
            .get_app_version_by_name_from_folder(&app.name, version)
            .await
            .map_err(registry_failure)?;
        match listed {
            Some(found) => {
                let row = self.store.insert_app_version(app.id, &found)?;
                tracing::info!(
                    event = "perfsuite.resolver.app_version_created",
                    app_id = app.id,
                    app_version_id = row.id,
                    version = %row.version,
                    "registered {} {}", app.name, row.version
                );
                Ok(Resolution::Created(row))
            }
            None => Ok(Resolution::NotFound),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

pub(crate) fn is_ios(os_name: &str) -> bool {
    os_name.eq_ignore_ascii_case("ios")
}

fn registry_failure(e: anyhow::Error) -> OrchestrationError {
    OrchestrationError::CollaboratorFailure {
        collaborator: "app package registry",
        message: format!("{e:#}"),
    }
}
