use std::path::Path;
use std::sync::Arc;

use perfsuite_core::config::RunnerSettings;
use perfsuite_core::engine::RunnerRegistry;
use perfsuite_core::providers::DeviceInventory;

pub mod android;
pub mod command;
pub mod inventory;
pub mod ios;
pub mod measure;
pub mod packages;

use command::{SystemCommand, ToolCommand};

pub fn default_runners(settings: &RunnerSettings, packages_dir: &Path) -> RunnerRegistry {
    runners_with(settings, packages_dir, Arc::new(SystemCommand))
}

pub fn runners_with(
    settings: &RunnerSettings,
    packages_dir: &Path,
    tool: Arc<dyn ToolCommand>,
) -> RunnerRegistry {
    RunnerRegistry::new()
        .with(Arc::new(android::AndroidRunner::new(
            settings.adb_path.clone(),
            packages_dir,
            tool.clone(),
        )))
        .with(Arc::new(ios::IosRunner::new(
            settings.xcrun_path.clone(),
            packages_dir,
            tool,
        )))
}

pub fn default_inventory(settings: &RunnerSettings) -> Arc<dyn DeviceInventory> {
    inventory_with(settings, Arc::new(SystemCommand))
}

pub fn inventory_with(settings: &RunnerSettings, tool: Arc<dyn ToolCommand>) -> Arc<dyn DeviceInventory> {
    Arc::new(inventory::CompositeInventory::new(vec![
        Arc::new(inventory::AdbDeviceInventory::new(settings.adb_path.clone(), tool.clone())),
        Arc::new(inventory::SimctlDeviceInventory::new(settings.xcrun_path.clone(), tool)),
    ]))
}
