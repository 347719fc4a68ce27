mod support;

use perfsuite_core::engine::PlatformRunner;
use perfsuite_platform::android::AndroidRunner;
use perfsuite_platform::ios::IosRunner;
use std::sync::Arc;
use support::{config, max, total_time, ScriptedTool};

fn packages_with(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for f in files {
        std::fs::write(dir.path().join(f), b"pkg").unwrap();
    }
    dir
}

#[tokio::test]
async fn android_averages_measured_launches_after_warmup() {
    let dir = packages_with(&["appA-1.0.apk"]);
    let tool = Arc::new(
        ScriptedTool::new()
            .on("am start", &total_time(900))
            .on("am start", &total_time(400))
            .on("am start", &total_time(500)),
    );
    let runner = AndroidRunner::new("adb", dir.path(), tool.clone());

    let mut cfg = config("Android", Some("emulator-5554"));
    cfg.metric_params.insert("iterations".into(), "2".into());
    cfg.execution_type_params.insert("warmup_runs".into(), "1".into());
    cfg.test_thresholds = vec![max("launch_time_ms", 500.0)];

    let out = runner.run(&cfg).await.unwrap();
    assert_eq!(out["launch_time_ms"], "450");
    assert_eq!(out["success"], "true");
    assert!(!out.contains_key("memory_pss_kb"));

    let apk = dir.path().join("appA-1.0.apk");
    assert_eq!(
        tool.calls()[0],
        format!("adb -s emulator-5554 install -r {}", apk.display())
    );
    assert_eq!(tool.calls_matching("am start -W -n com.example.a/.MainActivity"), 3);
    assert_eq!(tool.calls_matching("am force-stop com.example.a"), 3);
}

#[tokio::test]
async fn android_threshold_breach_reports_failure() {
    let dir = packages_with(&["appA-1.0.apk"]);
    let tool = Arc::new(ScriptedTool::new().on("am start", &total_time(750)));
    let runner = AndroidRunner::new("adb", dir.path(), tool);

    let mut cfg = config("Android", Some("emulator-5554"));
    cfg.test_thresholds = vec![max("launch_time_ms", 500.0)];

    let out = runner.run(&cfg).await.unwrap();
    assert_eq!(out["launch_time_ms"], "750");
    assert_eq!(out["success"], "false");
}

#[tokio::test]
async fn android_memory_metric_reads_pss() {
    let dir = packages_with(&["appA-1.0.apk"]);
    let tool = Arc::new(
        ScriptedTool::new()
            .on("am start", &total_time(300))
            .on("dumpsys meminfo", "App Summary\n  TOTAL PSS:    84512   TOTAL RSS: 99000\n"),
    );
    let runner = AndroidRunner::new("adb", dir.path(), tool.clone());

    let mut cfg = config("Android", Some("emulator-5554"));
    cfg.metric_name = "memory_usage".into();
    cfg.execution_type_name = "warm_start".into();

    let out = runner.run(&cfg).await.unwrap();
    assert_eq!(out["memory_pss_kb"], "84512");
    assert!(!out.contains_key("launch_time_ms"));
    assert_eq!(tool.calls_matching("force-stop"), 0);
}

#[tokio::test]
async fn android_requires_package_and_serial() {
    let dir = packages_with(&[]);
    let tool = Arc::new(ScriptedTool::new());
    let runner = AndroidRunner::new("adb", dir.path(), tool.clone());

    let err = runner.run(&config("Android", Some("emulator-5554"))).await.unwrap_err();
    assert!(err.to_string().contains("package not found"));

    let err = runner.run(&config("Android", None)).await.unwrap_err();
    assert!(err.to_string().contains("no adb serial"));
    assert!(tool.calls().is_empty());
}

#[tokio::test]
async fn android_install_failure_propagates() {
    let dir = packages_with(&["appA-1.0.apk"]);
    let tool = Arc::new(ScriptedTool::new().fail("install", "INSTALL_FAILED_INSUFFICIENT_STORAGE"));
    let runner = AndroidRunner::new("adb", dir.path(), tool);

    let err = runner.run(&config("Android", Some("emulator-5554"))).await.unwrap_err();
    assert!(format!("{err:#}").contains("INSTALL_FAILED_INSUFFICIENT_STORAGE"));
}

#[tokio::test]
async fn android_rejects_bad_iteration_count() {
    let dir = packages_with(&["appA-1.0.apk"]);
    let runner = AndroidRunner::new("adb", dir.path(), Arc::new(ScriptedTool::new()));
    let mut cfg = config("Android", Some("emulator-5554"));
    cfg.metric_params.insert("iterations".into(), "lots".into());

    let err = runner.run(&cfg).await.unwrap_err();
    assert!(err.to_string().contains("iterations"));
}

#[tokio::test]
async fn ios_tolerates_booted_simulator() {
    let dir = packages_with(&["appA-1.0.app"]);
    let tool = Arc::new(
        ScriptedTool::new()
            .fail("simctl boot", "Unable to boot device in current state: Booted")
            .fail("simctl terminate", "found nothing to terminate"),
    );
    let runner = IosRunner::new("xcrun", dir.path(), tool.clone());

    let out = runner.run(&config("iOS", Some("UDID-1"))).await.unwrap();
    assert!(out["launch_time_ms"].parse::<f64>().is_ok());
    assert_eq!(out["success"], "true");
    assert_eq!(tool.calls_matching("simctl launch UDID-1 com.example.a"), 1);
    assert_eq!(tool.calls_matching("simctl install UDID-1"), 1);
}

#[tokio::test]
async fn ios_boot_failure_is_an_error() {
    let dir = packages_with(&["appA-1.0.app"]);
    let tool = Arc::new(ScriptedTool::new().fail("simctl boot", "Invalid device: UDID-1"));
    let runner = IosRunner::new("xcrun", dir.path(), tool);

    let err = runner.run(&config("iOS", Some("UDID-1"))).await.unwrap_err();
    assert!(err.to_string().contains("Invalid device"));
}

#[test]
fn default_registry_serves_both_platforms() {
    let settings = perfsuite_core::config::RunnerSettings::default();
    let registry = perfsuite_platform::default_runners(&settings, std::path::Path::new("packages"));
    assert!(registry.get("android").is_some());
    assert!(registry.get("IOS").is_some());
    assert!(registry.get("windows").is_none());
}
