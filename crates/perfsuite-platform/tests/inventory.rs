mod support;

use perfsuite_core::config::RunnerSettings;
use perfsuite_core::providers::fake::FakePackageRegistry;
use perfsuite_core::providers::{AppPackageRegistry, DeviceInventory};
use perfsuite_core::resolver::EntityResolver;
use perfsuite_core::storage::Store;
use perfsuite_platform::inventory::{AdbDeviceInventory, SimctlDeviceInventory};
use perfsuite_platform::packages::FolderPackageRegistry;
use std::sync::Arc;
use support::ScriptedTool;

const ADB_DEVICES: &str = "List of devices attached\n\
emulator-5554  device product:sdk_gphone64 model:Pixel_6 device:emu64a transport_id:1\n\
R58N12         offline transport_id:2\n";

const SIMCTL: &str = r#"{"devices":{
  "com.apple.CoreSimulator.SimRuntime.iOS-16-4":[
    {"udid":"OLD","name":"iPhone 15","state":"Shutdown","isAvailable":true}
  ],
  "com.apple.CoreSimulator.SimRuntime.iOS-17-2":[
    {"udid":"NEW","name":"iPhone 15","state":"Booted","isAvailable":true}
  ]}}"#;

#[tokio::test]
async fn adb_matches_model_name() {
    let tool = Arc::new(
        ScriptedTool::new()
            .on("devices -l", ADB_DEVICES)
            .on("getprop ro.build.version.release", "13\n"),
    );
    let inventory = AdbDeviceInventory::new("adb", tool.clone());

    let found = inventory.get_device_by_name("Pixel 6").await.unwrap().unwrap();
    assert_eq!(found.serial_number.as_deref(), Some("emulator-5554"));
    assert_eq!(found.os_name, "Android");
    assert_eq!(found.os_version, "13");
    assert_eq!(found.device_name, "Pixel 6");

    // Offline devices are never queried.
    assert_eq!(tool.calls_matching("-s R58N12"), 0);
    assert!(inventory.get_device_by_name("Galaxy S24").await.unwrap().is_none());
}

#[tokio::test]
async fn adb_lookup_by_serial_reports_model_name() {
    let tool = Arc::new(
        ScriptedTool::new()
            .on("devices -l", ADB_DEVICES)
            .on("getprop ro.build.version.release", "13\n"),
    );
    let inventory = AdbDeviceInventory::new("adb", tool);

    let found = inventory.get_device_by_name("emulator-5554").await.unwrap().unwrap();
    assert_eq!(found.device_name, "Pixel 6");
    assert_eq!(found.serial_number.as_deref(), Some("emulator-5554"));
}

#[tokio::test]
async fn serial_then_model_resolves_one_device_row() {
    let tool = Arc::new(
        ScriptedTool::new()
            .on("devices -l", ADB_DEVICES)
            .on("getprop ro.build.version.release", "13\n"),
    );
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    let resolver = EntityResolver::new(
        store.clone(),
        Arc::new(AdbDeviceInventory::new("adb", tool)),
        Arc::new(FakePackageRegistry::new()),
    );

    let by_serial = resolver.resolve_device("emulator-5554").await.unwrap();
    let by_model = resolver.resolve_device("Pixel 6").await.unwrap();

    assert_eq!(by_serial.device.id, by_model.device.id);
    assert_eq!(by_model.device.name, "Pixel 6");
    let conn = store.conn.lock().unwrap();
    let devices: i64 = conn
        .query_row("SELECT COUNT(*) FROM devices", [], |r| r.get(0))
        .unwrap();
    assert_eq!(devices, 1);
}

#[tokio::test]
async fn adb_skips_device_whose_model_cannot_be_read() {
    let listing = "List of devices attached\n\
dead-1         device transport_id:3\n\
emulator-5554  device product:sdk_gphone64 model:Pixel_6 device:emu64a transport_id:1\n";
    let tool = Arc::new(
        ScriptedTool::new()
            .on("devices -l", listing)
            .fail("-s dead-1 shell getprop", "error: closed")
            .on("getprop ro.build.version.release", "14\n"),
    );
    let inventory = AdbDeviceInventory::new("adb", tool.clone());

    let found = inventory.get_device_by_name("Pixel 6").await.unwrap().unwrap();
    assert_eq!(found.serial_number.as_deref(), Some("emulator-5554"));
    assert_eq!(found.os_version, "14");
    assert_eq!(tool.calls_matching("-s dead-1 shell getprop ro.product.model"), 1);
}

#[tokio::test]
async fn simctl_prefers_booted_simulator() {
    let tool = Arc::new(ScriptedTool::new().on("simctl list devices --json", SIMCTL));
    let inventory = SimctlDeviceInventory::new("xcrun", tool);

    let found = inventory.get_device_by_name("iPhone 15").await.unwrap().unwrap();
    assert_eq!(found.serial_number.as_deref(), Some("NEW"));
    assert_eq!(found.os_name, "iOS");
    assert_eq!(found.os_version, "17.2");
}

#[tokio::test]
async fn composite_skips_failing_source() {
    let tool = Arc::new(
        ScriptedTool::new()
            .fail("adb devices", "adb: command not found")
            .on("simctl list devices --json", SIMCTL),
    );
    let inventory = perfsuite_platform::inventory_with(&RunnerSettings::default(), tool);

    let found = inventory.get_device_by_name("iPhone 15").await.unwrap();
    assert!(found.is_some());
    assert!(inventory.get_device_by_name("Nokia").await.unwrap().is_none());
}

#[tokio::test]
async fn composite_fails_when_every_source_fails() {
    let tool = Arc::new(
        ScriptedTool::new()
            .fail("adb devices", "adb: command not found")
            .fail("simctl", "xcrun: error: unable to find utility"),
    );
    let inventory = perfsuite_platform::inventory_with(&RunnerSettings::default(), tool);
    assert!(inventory.get_device_by_name("Pixel 6").await.is_err());
}

#[tokio::test]
async fn folder_registry_finds_apps_and_versions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("shop-5.2.0.apk"), b"apk").unwrap();
    std::fs::create_dir(dir.path().join("shop-5.3.0.app")).unwrap();
    std::fs::write(dir.path().join("README.md"), b"docs").unwrap();
    let registry = FolderPackageRegistry::new(dir.path());

    let app = registry.get_app_by_name_from_folder("shop").await.unwrap();
    assert_eq!(app.unwrap().name, "shop");
    assert!(registry.get_app_by_name_from_folder("README").await.unwrap().is_none());

    assert_eq!(
        registry.get_app_version_by_name_from_folder("shop", "5.2.0").await.unwrap(),
        Some("5.2.0".to_string())
    );
    assert_eq!(
        registry.get_app_version_by_name_from_folder("shop", "5.3.0").await.unwrap(),
        Some("5.3.0".to_string())
    );
    assert!(registry
        .get_app_version_by_name_from_folder("shop", "9.9")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn folder_registry_reports_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FolderPackageRegistry::new(dir.path().join("absent"));
    assert!(registry.get_app_by_name_from_folder("shop").await.is_err());
}
