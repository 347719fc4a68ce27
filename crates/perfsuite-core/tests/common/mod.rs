#![allow(dead_code)]

use perfsuite_core::catalog::{parse_catalog, seed_catalog};
use perfsuite_core::engine::{Dispatcher, PlanExecutor, PlatformRunner, RunnerRegistry};
use perfsuite_core::model::{CreateTestPlanRequest, ParameterValueRequest, RunOutput, ThresholdRequest};
use perfsuite_core::providers::fake::{FakeDeviceInventory, FakePackageRegistry};
use perfsuite_core::providers::DeviceDescriptor;
use perfsuite_core::resolver::EntityResolver;
use perfsuite_core::storage::Store;
use perfsuite_core::versioning::TestPlanVersioning;
use std::sync::Arc;
use std::time::Duration;

pub const CATALOG: &str = r#"metrics:
  - name: metricA
    parameters:
      - { name: iterations, type: int }
      - { name: trace, type: bool }
    outputs:
      - { name: out1, unit: ms }
      - { name: out2, unit: kB }
execution_types:
  - name: cold_start
    parameters:
      - { name: warmup_runs, type: int }
threshold_types:
  - { name: MAX }
  - { name: MIN }
"#;

pub fn android(name: &str, serial: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        device_name: name.into(),
        serial_number: Some(serial.into()),
        os_name: "Android".into(),
        os_version: "13".into(),
    }
}

pub fn iphone(name: &str, serial: Option<&str>) -> DeviceDescriptor {
    DeviceDescriptor {
        device_name: name.into(),
        serial_number: serial.map(str::to_string),
        os_name: "iOS".into(),
        os_version: "17.2".into(),
    }
}

pub struct Harness {
    pub store: Store,
    pub inventory: Arc<FakeDeviceInventory>,
    pub packages: Arc<FakePackageRegistry>,
    pub resolver: EntityResolver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            vec![android("deviceA", "serialA"), android("deviceB", "serialB")],
            FakePackageRegistry::new()
                .with_package("appA", "1.0")
                .with_package("appA", "1.1")
                .with_package("appB", "2.0"),
        )
    }

    pub fn with(devices: Vec<DeviceDescriptor>, packages: FakePackageRegistry) -> Self {
        let store = Store::memory().expect("open store");
        store.init_schema().expect("schema");
        seed_catalog(&store, &parse_catalog(CATALOG).expect("catalog")).expect("seed");

        let inventory = Arc::new(FakeDeviceInventory::new(devices));
        let packages = Arc::new(packages);
        let resolver = EntityResolver::new(store.clone(), inventory.clone(), packages.clone());
        Self {
            store,
            inventory,
            packages,
            resolver,
        }
    }

    pub fn versioning(&self) -> TestPlanVersioning {
        TestPlanVersioning::new(self.store.clone(), self.resolver.clone())
    }

    pub fn executor(&self, runners: Vec<Arc<dyn PlatformRunner>>, timeout: Duration) -> PlanExecutor {
        let registry = runners
            .into_iter()
            .fold(RunnerRegistry::new(), |r, runner| r.with(runner));
        PlanExecutor::new(self.store.clone(), Dispatcher::new(registry, timeout))
    }
}

pub fn plan_request(name: &str, app_package: &str) -> CreateTestPlanRequest {
    CreateTestPlanRequest {
        name: name.into(),
        metric: "metricA".into(),
        execution_type: "cold_start".into(),
        device: "deviceA".into(),
        app: "appA".into(),
        app_version: "1.0".into(),
        notes: String::new(),
        app_package: app_package.into(),
        main_activity: ".MainActivity".into(),
        thresholds: vec![ThresholdRequest {
            target_value: 100.0,
            threshold_type: "MAX".into(),
            output: "out1".into(),
        }],
        metric_params: vec![ParameterValueRequest {
            name: "iterations".into(),
            value: "3".into(),
        }],
        execution_type_params: vec![],
        test_suite_version_id: None,
    }
}

pub fn output(pairs: &[(&str, &str)]) -> RunOutput {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn count(store: &Store, table: &str) -> i64 {
    let conn = store.conn.lock().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}
