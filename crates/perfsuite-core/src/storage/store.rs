use crate::errors::{OrchestrationError, Result};
use crate::model::*;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

/// Everything needed to write one plan version and its children atomically.
#[derive(Debug, Clone)]
pub struct NewPlanVersion {
    pub plan_name: String,
    pub metric_id: RowId,
    pub notes: String,
    pub app_package: String,
    pub main_activity: String,
    pub device_id: RowId,
    pub app_version_id: RowId,
    pub execution_type_id: RowId,
    pub thresholds: Vec<NewThreshold>,
    /// (metric_parameter_id, value)
    pub metric_params: Vec<(RowId, String)>,
    /// (execution_type_parameter_id, value)
    pub execution_type_params: Vec<(RowId, String)>,
    pub suite_version_id: Option<RowId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewThreshold {
    pub target_value: f64,
    pub threshold_type_id: RowId,
    pub metric_output_id: RowId,
}

#[derive(Debug, Clone)]
pub struct InsertedPlanVersion {
    pub plan: TestPlan,
    pub plan_created: bool,
    pub version: TestPlanVersion,
    /// Position assigned inside the target suite version, if one was given.
    pub suite_order: Option<i64>,
}

pub struct StoreStats {
    pub plan_versions: u64,
    pub executions: u64,
    pub suite_executions: u64,
    pub last_execution_at: Option<String>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| OrchestrationError::PersistenceFailure("store lock poisoned".into()))
    }

    // operating systems

    pub fn find_os_by_name(&self, name: &str) -> Result<Option<OperatingSystem>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name FROM operating_systems WHERE name = ?1",
                params![name],
                |r| map_os(r, 0),
            )
            .optional()?)
    }

    pub fn insert_os(&self, name: &str) -> Result<OperatingSystem> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO operating_systems(name) VALUES (?1)",
            params![name],
        )?;
        Ok(OperatingSystem {
            id: inserted_id(&conn, "operating_systems")?,
            name: name.to_string(),
        })
    }

    pub fn get_os(&self, id: RowId) -> Result<OperatingSystem> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name FROM operating_systems WHERE id = ?1",
            params![id],
            |r| map_os(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("OperatingSystem", id.to_string()))
    }

    pub fn find_os_version(&self, os_id: RowId, version: &str) -> Result<Option<OsVersion>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, version, os_id FROM os_versions WHERE os_id = ?1 AND version = ?2",
                params![os_id, version],
                |r| map_os_version(r, 0),
            )
            .optional()?)
    }

    pub fn insert_os_version(&self, os_id: RowId, version: &str) -> Result<OsVersion> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO os_versions(version, os_id) VALUES (?1, ?2)",
            params![version, os_id],
        )?;
        Ok(OsVersion {
            id: inserted_id(&conn, "os_versions")?,
            version: version.to_string(),
            os_id,
        })
    }

    pub fn get_os_version(&self, id: RowId) -> Result<OsVersion> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, version, os_id FROM os_versions WHERE id = ?1",
            params![id],
            |r| map_os_version(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("OSVersion", id.to_string()))
    }

    // devices

    pub fn find_device_by_serial(&self, serial: &str) -> Result<Option<Device>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, serial_number, os_version_id FROM devices WHERE serial_number = ?1",
                params![serial],
                |r| map_device(r, 0),
            )
            .optional()?)
    }

    pub fn find_device_by_name(&self, name: &str) -> Result<Option<Device>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, serial_number, os_version_id FROM devices
                 WHERE name = ?1 ORDER BY id LIMIT 1",
                params![name],
                |r| map_device(r, 0),
            )
            .optional()?)
    }

    pub fn insert_device(
        &self,
        name: &str,
        serial_number: Option<&str>,
        os_version_id: RowId,
    ) -> Result<Device> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO devices(name, serial_number, os_version_id) VALUES (?1, ?2, ?3)",
            params![name, serial_number, os_version_id],
        )?;
        Ok(Device {
            id: inserted_id(&conn, "devices")?,
            name: name.to_string(),
            serial_number: serial_number.map(str::to_string),
            os_version_id,
        })
    }

    pub fn get_device(&self, id: RowId) -> Result<Device> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, serial_number, os_version_id FROM devices WHERE id = ?1",
            params![id],
            |r| map_device(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("Device", id.to_string()))
    }

    // apps

    pub fn find_app_by_name(&self, name: &str) -> Result<Option<App>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name FROM apps WHERE name = ?1",
                params![name],
                |r| map_app(r, 0),
            )
            .optional()?)
    }

    pub fn insert_app(&self, name: &str) -> Result<App> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO apps(name) VALUES (?1)", params![name])?;
        Ok(App {
            id: inserted_id(&conn, "apps")?,
            name: name.to_string(),
        })
    }

    pub fn get_app(&self, id: RowId) -> Result<App> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name FROM apps WHERE id = ?1",
            params![id],
            |r| map_app(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("App", id.to_string()))
    }

    pub fn find_app_version(&self, app_id: RowId, version: &str) -> Result<Option<AppVersion>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, app_id, version FROM app_versions WHERE app_id = ?1 AND version = ?2",
                params![app_id, version],
                |r| map_app_version(r, 0),
            )
            .optional()?)
    }

    pub fn insert_app_version(&self, app_id: RowId, version: &str) -> Result<AppVersion> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO app_versions(app_id, version) VALUES (?1, ?2)",
            params![app_id, version],
        )?;
        Ok(AppVersion {
            id: inserted_id(&conn, "app_versions")?,
            app_id,
            version: version.to_string(),
        })
    }

    pub fn get_app_version(&self, id: RowId) -> Result<AppVersion> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, app_id, version FROM app_versions WHERE id = ?1",
            params![id],
            |r| map_app_version(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("AppVersion", id.to_string()))
    }

    // definition catalog

    pub fn find_metric_by_name(&self, name: &str) -> Result<Option<Metric>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name FROM metrics WHERE name = ?1",
                params![name],
                |r| map_metric(r, 0),
            )
            .optional()?)
    }

    pub fn insert_metric(&self, name: &str) -> Result<Metric> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO metrics(name) VALUES (?1)", params![name])?;
        Ok(Metric {
            id: inserted_id(&conn, "metrics")?,
            name: name.to_string(),
        })
    }

    pub fn get_metric(&self, id: RowId) -> Result<Metric> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name FROM metrics WHERE id = ?1",
            params![id],
            |r| map_metric(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("Metric", id.to_string()))
    }

    pub fn find_metric_parameter(
        &self,
        metric_id: RowId,
        name: &str,
    ) -> Result<Option<MetricParameter>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, type, metric_id FROM metric_parameters
                 WHERE metric_id = ?1 AND name = ?2",
                params![metric_id, name],
                |r| map_metric_parameter(r, 0),
            )
            .optional()?)
    }

    pub fn insert_metric_parameter(
        &self,
        metric_id: RowId,
        name: &str,
        param_type: &str,
    ) -> Result<MetricParameter> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO metric_parameters(name, type, metric_id) VALUES (?1, ?2, ?3)",
            params![name, param_type, metric_id],
        )?;
        Ok(MetricParameter {
            id: inserted_id(&conn, "metric_parameters")?,
            name: name.to_string(),
            param_type: param_type.to_string(),
            metric_id,
        })
    }

    pub fn find_metric_output(&self, metric_id: RowId, name: &str) -> Result<Option<MetricOutput>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, unit, metric_id FROM metric_outputs
                 WHERE metric_id = ?1 AND name = ?2",
                params![metric_id, name],
                |r| map_metric_output(r, 0),
            )
            .optional()?)
    }

    pub fn list_metric_outputs(&self, metric_id: RowId) -> Result<Vec<MetricOutput>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, unit, metric_id FROM metric_outputs WHERE metric_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![metric_id], |r| map_metric_output(r, 0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn insert_metric_output(
        &self,
        metric_id: RowId,
        name: &str,
        unit: &str,
    ) -> Result<MetricOutput> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO metric_outputs(name, unit, metric_id) VALUES (?1, ?2, ?3)",
            params![name, unit, metric_id],
        )?;
        Ok(MetricOutput {
            id: inserted_id(&conn, "metric_outputs")?,
            name: name.to_string(),
            unit: unit.to_string(),
            metric_id,
        })
    }

    pub fn find_execution_type_by_name(&self, name: &str) -> Result<Option<ExecutionType>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, description FROM execution_types WHERE name = ?1",
                params![name],
                |r| map_execution_type(r, 0),
            )
            .optional()?)
    }

    pub fn insert_execution_type(&self, name: &str, description: &str) -> Result<ExecutionType> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO execution_types(name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        Ok(ExecutionType {
            id: inserted_id(&conn, "execution_types")?,
            name: name.to_string(),
            description: description.to_string(),
        })
    }

    pub fn get_execution_type(&self, id: RowId) -> Result<ExecutionType> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, description FROM execution_types WHERE id = ?1",
            params![id],
            |r| map_execution_type(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("ExecutionType", id.to_string()))
    }

    pub fn find_execution_type_parameter(
        &self,
        execution_type_id: RowId,
        name: &str,
    ) -> Result<Option<ExecutionTypeParameter>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, type, execution_type_id FROM execution_type_parameters
                 WHERE execution_type_id = ?1 AND name = ?2",
                params![execution_type_id, name],
                |r| map_execution_type_parameter(r, 0),
            )
            .optional()?)
    }

    pub fn insert_execution_type_parameter(
        &self,
        execution_type_id: RowId,
        name: &str,
        param_type: &str,
    ) -> Result<ExecutionTypeParameter> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO execution_type_parameters(name, type, execution_type_id) VALUES (?1, ?2, ?3)",
            params![name, param_type, execution_type_id],
        )?;
        Ok(ExecutionTypeParameter {
            id: inserted_id(&conn, "execution_type_parameters")?,
            name: name.to_string(),
            param_type: param_type.to_string(),
            execution_type_id,
        })
    }

    pub fn find_threshold_type_by_name(&self, name: &str) -> Result<Option<ThresholdType>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, description FROM threshold_types WHERE name = ?1",
                params![name],
                |r| map_threshold_type(r, 0),
            )
            .optional()?)
    }

    pub fn insert_threshold_type(&self, name: &str, description: &str) -> Result<ThresholdType> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO threshold_types(name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        Ok(ThresholdType {
            id: inserted_id(&conn, "threshold_types")?,
            name: name.to_string(),
            description: description.to_string(),
        })
    }

    // plans

    pub fn find_test_plan(&self, name: &str, metric_id: RowId) -> Result<Option<TestPlan>> {
        let conn = self.lock()?;
        Ok(find_test_plan_tx(&conn, name, metric_id)?)
    }

    pub fn get_test_plan(&self, id: RowId) -> Result<TestPlan> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, metric_id FROM test_plans WHERE id = ?1",
            params![id],
            |r| map_test_plan(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("TestPlan", id.to_string()))
    }

    pub fn latest_plan_version(&self, test_plan_id: RowId) -> Result<Option<TestPlanVersion>> {
        let conn = self.lock()?;
        Ok(latest_plan_version_tx(&conn, test_plan_id)?)
    }

    pub fn get_plan_version(&self, id: RowId) -> Result<TestPlanVersion> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {PLAN_VERSION_COLS} FROM test_plan_versions WHERE id = ?1"),
            params![id],
            |r| map_plan_version(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("TestPlanVersion", id.to_string()))
    }

    /// Writes the plan (if new), the version row, its thresholds and parameter
    /// values, and the suite membership in one transaction.
    pub fn insert_plan_version(&self, new: &NewPlanVersion) -> Result<InsertedPlanVersion> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let (plan, plan_created) = match find_test_plan_tx(&tx, &new.plan_name, new.metric_id)? {
            Some(plan) => (plan, false),
            None => {
                tx.execute(
                    "INSERT INTO test_plans(name, metric_id) VALUES (?1, ?2)",
                    params![new.plan_name, new.metric_id],
                )?;
                let plan = TestPlan {
                    id: inserted_id(&tx, "test_plans")?,
                    name: new.plan_name.clone(),
                    metric_id: new.metric_id,
                };
                (plan, true)
            }
        };

        let latest = latest_plan_version_tx(&tx, plan.id)?;
        let version = crate::versioning::next_version(latest.as_ref().map(|v| v.version.as_str()))?;
        let created_at = now_rfc3339();

        tx.execute(
            "INSERT INTO test_plan_versions(
                version, created_at, notes, app_package, main_activity,
                test_plan_id, device_id, app_version_id, execution_type_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                version,
                created_at,
                new.notes,
                new.app_package,
                new.main_activity,
                plan.id,
                new.device_id,
                new.app_version_id,
                new.execution_type_id
            ],
        )?;
        let version_id = inserted_id(&tx, "test_plan_versions")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO test_thresholds(target_value, test_plan_version_id, threshold_type_id, metric_output_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for t in &new.thresholds {
                stmt.execute(params![
                    t.target_value,
                    version_id,
                    t.threshold_type_id,
                    t.metric_output_id
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO test_metric_parameter_values(value, test_plan_version_id, metric_parameter_id)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (param_id, value) in &new.metric_params {
                stmt.execute(params![value, version_id, param_id])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO test_execution_type_parameter_values(value, test_plan_version_id, execution_type_parameter_id)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (param_id, value) in &new.execution_type_params {
                stmt.execute(params![value, version_id, param_id])?;
            }
        }

        let suite_order = match new.suite_version_id {
            Some(suite_version_id) => {
                let existing: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM test_suite_version_plans WHERE suite_version_id = ?1",
                    params![suite_version_id],
                    |r| r.get(0),
                )?;
                let order = existing + 1;
                tx.execute(
                    "INSERT INTO test_suite_version_plans(suite_version_id, plan_version_id, plan_order)
                     VALUES (?1, ?2, ?3)",
                    params![suite_version_id, version_id, order],
                )?;
                Some(order)
            }
            None => None,
        };

        tx.commit()?;

        let version = TestPlanVersion {
            id: version_id,
            version,
            created_at,
            notes: new.notes.clone(),
            app_package: new.app_package.clone(),
            main_activity: new.main_activity.clone(),
            test_plan_id: plan.id,
            device_id: new.device_id,
            app_version_id: new.app_version_id,
            execution_type_id: new.execution_type_id,
        };
        Ok(InsertedPlanVersion {
            plan,
            plan_created,
            version,
            suite_order,
        })
    }

    pub fn metric_parameter_values(
        &self,
        plan_version_id: RowId,
    ) -> Result<Vec<(TestMetricParameterValue, MetricParameter)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.value, v.test_plan_version_id, v.metric_parameter_id,
                    p.id, p.name, p.type, p.metric_id
             FROM test_metric_parameter_values v
             JOIN metric_parameters p ON p.id = v.metric_parameter_id
             WHERE v.test_plan_version_id = ?1
             ORDER BY v.id",
        )?;
        let rows = stmt.query_map(params![plan_version_id], |r| {
            Ok((
                TestMetricParameterValue {
                    id: r.get(0)?,
                    value: r.get(1)?,
                    test_plan_version_id: r.get(2)?,
                    metric_parameter_id: r.get(3)?,
                },
                map_metric_parameter(r, 4)?,
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn execution_type_parameter_values(
        &self,
        plan_version_id: RowId,
    ) -> Result<Vec<(TestExecutionTypeParameterValue, ExecutionTypeParameter)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.value, v.test_plan_version_id, v.execution_type_parameter_id,
                    p.id, p.name, p.type, p.execution_type_id
             FROM test_execution_type_parameter_values v
             JOIN execution_type_parameters p ON p.id = v.execution_type_parameter_id
             WHERE v.test_plan_version_id = ?1
             ORDER BY v.id",
        )?;
        let rows = stmt.query_map(params![plan_version_id], |r| {
            Ok((
                TestExecutionTypeParameterValue {
                    id: r.get(0)?,
                    value: r.get(1)?,
                    test_plan_version_id: r.get(2)?,
                    execution_type_parameter_id: r.get(3)?,
                },
                map_execution_type_parameter(r, 4)?,
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn thresholds_for(
        &self,
        plan_version_id: RowId,
    ) -> Result<Vec<(TestThreshold, ThresholdType, MetricOutput)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.target_value, t.test_plan_version_id, t.threshold_type_id, t.metric_output_id,
                    tt.id, tt.name, tt.description,
                    o.id, o.name, o.unit, o.metric_id
             FROM test_thresholds t
             JOIN threshold_types tt ON tt.id = t.threshold_type_id
             JOIN metric_outputs o ON o.id = t.metric_output_id
             WHERE t.test_plan_version_id = ?1
             ORDER BY t.id",
        )?;
        let rows = stmt.query_map(params![plan_version_id], |r| {
            Ok((
                TestThreshold {
                    id: r.get(0)?,
                    target_value: r.get(1)?,
                    test_plan_version_id: r.get(2)?,
                    threshold_type_id: r.get(3)?,
                    metric_output_id: r.get(4)?,
                },
                map_threshold_type(r, 5)?,
                map_metric_output(r, 8)?,
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // suites

    pub fn insert_test_suite(&self, name: &str, description: &str) -> Result<TestSuite> {
        let conn = self.lock()?;
        let created_at = now_rfc3339();
        conn.execute(
            "INSERT INTO test_suites(name, description, created_at, active) VALUES (?1, ?2, ?3, 1)",
            params![name, description, created_at],
        )?;
        Ok(TestSuite {
            id: inserted_id(&conn, "test_suites")?,
            name: name.to_string(),
            description: description.to_string(),
            created_at,
            active: true,
        })
    }

    pub fn get_test_suite(&self, id: RowId) -> Result<TestSuite> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, description, created_at, active FROM test_suites WHERE id = ?1",
            params![id],
            |r| {
                Ok(TestSuite {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    description: r.get(2)?,
                    created_at: r.get(3)?,
                    active: r.get::<_, i64>(4)? != 0,
                })
            },
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("TestSuite", id.to_string()))
    }

    pub fn get_suite_version(&self, id: RowId) -> Result<TestSuiteVersion> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, version, created_at, notes, test_suite_id FROM test_suite_versions WHERE id = ?1",
            params![id],
            |r| map_suite_version(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("TestSuiteVersion", id.to_string()))
    }

    pub fn latest_suite_version(&self, test_suite_id: RowId) -> Result<Option<TestSuiteVersion>> {
        let conn = self.lock()?;
        Ok(latest_suite_version_tx(&conn, test_suite_id)?)
    }

    /// Creates the next suite version with `plan_version_ids` at orders 1..=n.
    pub fn insert_suite_version(
        &self,
        test_suite_id: RowId,
        notes: &str,
        plan_version_ids: &[RowId],
    ) -> Result<TestSuiteVersion> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let suite_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM test_suites WHERE id = ?1",
                params![test_suite_id],
                |r| r.get(0),
            )
            .optional()?;
        if suite_exists.is_none() {
            return Err(OrchestrationError::not_found(
                "TestSuite",
                test_suite_id.to_string(),
            ));
        }

        for plan_version_id in plan_version_ids {
            let found: Option<i64> = tx
                .query_row(
                    "SELECT id FROM test_plan_versions WHERE id = ?1",
                    params![plan_version_id],
                    |r| r.get(0),
                )
                .optional()?;
            if found.is_none() {
                return Err(OrchestrationError::not_found(
                    "TestPlanVersion",
                    plan_version_id.to_string(),
                ));
            }
        }

        let latest = latest_suite_version_tx(&tx, test_suite_id)?;
        let version = crate::versioning::next_version(latest.as_ref().map(|v| v.version.as_str()))?;
        let created_at = now_rfc3339();
        tx.execute(
            "INSERT INTO test_suite_versions(version, created_at, notes, test_suite_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![version, created_at, notes, test_suite_id],
        )?;
        let id = inserted_id(&tx, "test_suite_versions")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO test_suite_version_plans(suite_version_id, plan_version_id, plan_order)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (idx, plan_version_id) in plan_version_ids.iter().enumerate() {
                stmt.execute(params![id, plan_version_id, idx as i64 + 1])?;
            }
        }

        tx.commit()?;
        Ok(TestSuiteVersion {
            id,
            version,
            created_at,
            notes: notes.to_string(),
            test_suite_id,
        })
    }

    pub fn suite_version_plans(&self, suite_version_id: RowId) -> Result<Vec<TestSuiteVersionPlan>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT suite_version_id, plan_version_id, plan_order
             FROM test_suite_version_plans
             WHERE suite_version_id = ?1
             ORDER BY plan_order ASC",
        )?;
        let rows = stmt.query_map(params![suite_version_id], |r| {
            Ok(TestSuiteVersionPlan {
                suite_version_id: r.get(0)?,
                plan_version_id: r.get(1)?,
                order: r.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // executions (append-only)

    /// Inserts one execution and its output results in a single transaction.
    /// `results` pairs a metric output id with the raw value.
    pub fn insert_execution(
        &self,
        plan_version_id: RowId,
        started_at: &str,
        ended_at: &str,
        passed: bool,
        results: &[(RowId, String)],
    ) -> Result<(TestExecution, Vec<TestMetricOutputResult>)> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let passed = if passed { "true" } else { "false" };

        tx.execute(
            "INSERT INTO test_executions(started_at, ended_at, passed, test_plan_version_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![started_at, ended_at, passed, plan_version_id],
        )?;
        let execution_id = inserted_id(&tx, "test_executions")?;

        let mut rows = Vec::with_capacity(results.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO test_metric_output_results(value, metric_output_id, test_execution_id)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (output_id, value) in results {
                stmt.execute(params![value, output_id, execution_id])?;
                rows.push(TestMetricOutputResult {
                    id: inserted_id(&tx, "test_metric_output_results")?,
                    value: value.clone(),
                    metric_output_id: *output_id,
                    test_execution_id: execution_id,
                });
            }
        }

        tx.commit()?;
        Ok((
            TestExecution {
                id: execution_id,
                started_at: started_at.to_string(),
                ended_at: ended_at.to_string(),
                passed: passed.to_string(),
                test_plan_version_id: plan_version_id,
            },
            rows,
        ))
    }

    pub fn list_executions(&self, plan_version_id: RowId) -> Result<Vec<TestExecution>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, started_at, ended_at, passed, test_plan_version_id
             FROM test_executions WHERE test_plan_version_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![plan_version_id], |r| map_execution(r, 0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_execution(&self, id: RowId) -> Result<TestExecution> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, started_at, ended_at, passed, test_plan_version_id
             FROM test_executions WHERE id = ?1",
            params![id],
            |r| map_execution(r, 0),
        )
        .optional()?
        .ok_or_else(|| OrchestrationError::not_found("TestExecution", id.to_string()))
    }

    /// Output results of an execution, paired with the output definition.
    pub fn output_results(
        &self,
        execution_id: RowId,
    ) -> Result<Vec<(TestMetricOutputResult, MetricOutput)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.value, r.metric_output_id, r.test_execution_id,
                    o.id, o.name, o.unit, o.metric_id
             FROM test_metric_output_results r
             JOIN metric_outputs o ON o.id = r.metric_output_id
             WHERE r.test_execution_id = ?1
             ORDER BY r.id",
        )?;
        let rows = stmt.query_map(params![execution_id], |r| {
            Ok((
                TestMetricOutputResult {
                    id: r.get(0)?,
                    value: r.get(1)?,
                    metric_output_id: r.get(2)?,
                    test_execution_id: r.get(3)?,
                },
                map_metric_output(r, 4)?,
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn insert_suite_execution(
        &self,
        test_suite_version_id: RowId,
        started_at: &str,
        ended_at: &str,
        status: SuiteRunStatus,
        test_execution_ids: &[RowId],
    ) -> Result<SuiteExecution> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO suite_executions(started_at, ended_at, status, test_suite_version_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![started_at, ended_at, status.as_str(), test_suite_version_id],
        )?;
        let id = inserted_id(&tx, "suite_executions")?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO suite_execution_results(suite_execution_id, test_execution_id, position)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (idx, execution_id) in test_execution_ids.iter().enumerate() {
                stmt.execute(params![id, execution_id, idx as i64 + 1])?;
            }
        }
        tx.commit()?;
        Ok(SuiteExecution {
            id,
            started_at: started_at.to_string(),
            ended_at: ended_at.to_string(),
            test_suite_version_id,
            status,
            test_execution_ids: test_execution_ids.to_vec(),
        })
    }

    pub fn get_suite_execution(&self, id: RowId) -> Result<SuiteExecution> {
        let conn = self.lock()?;
        let head = conn
            .query_row(
                "SELECT id, started_at, ended_at, status, test_suite_version_id
                 FROM suite_executions WHERE id = ?1",
                params![id],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| OrchestrationError::not_found("SuiteExecution", id.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT test_execution_id FROM suite_execution_results
             WHERE suite_execution_id = ?1 ORDER BY position",
        )?;
        let ids = stmt
            .query_map(params![id], |r| r.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SuiteExecution {
            id: head.0,
            started_at: head.1,
            ended_at: head.2,
            status: SuiteRunStatus::parse(&head.3),
            test_suite_version_id: head.4,
            test_execution_ids: ids,
        })
    }

    pub fn stats_best_effort(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let count = |table: &str| -> u64 {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
                r.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .unwrap_or(0)
        };
        let last_execution_at = conn
            .query_row(
                "SELECT ended_at FROM test_executions ORDER BY id DESC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .ok();
        Ok(StoreStats {
            plan_versions: count("test_plan_versions"),
            executions: count("test_executions"),
            suite_executions: count("suite_executions"),
            last_execution_at,
        })
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

const PLAN_VERSION_COLS: &str = "id, version, created_at, notes, app_package, main_activity, \
     test_plan_id, device_id, app_version_id, execution_type_id";

fn inserted_id(conn: &Connection, table: &str) -> Result<RowId> {
    let id = conn.last_insert_rowid();
    if conn.changes() == 0 || id <= 0 {
        return Err(OrchestrationError::PersistenceFailure(format!(
            "insert into {table} yielded no generated id"
        )));
    }
    Ok(id)
}

fn find_test_plan_tx(
    conn: &Connection,
    name: &str,
    metric_id: RowId,
) -> rusqlite::Result<Option<TestPlan>> {
    conn.query_row(
        "SELECT id, name, metric_id FROM test_plans WHERE name = ?1 AND metric_id = ?2",
        params![name, metric_id],
        |r| map_test_plan(r, 0),
    )
    .optional()
}

fn latest_plan_version_tx(
    conn: &Connection,
    test_plan_id: RowId,
) -> rusqlite::Result<Option<TestPlanVersion>> {
    conn.query_row(
        &format!(
            "SELECT {PLAN_VERSION_COLS} FROM test_plan_versions
             WHERE test_plan_id = ?1
             ORDER BY CAST(version AS INTEGER) DESC, id DESC LIMIT 1"
        ),
        params![test_plan_id],
        |r| map_plan_version(r, 0),
    )
    .optional()
}

fn latest_suite_version_tx(
    conn: &Connection,
    test_suite_id: RowId,
) -> rusqlite::Result<Option<TestSuiteVersion>> {
    conn.query_row(
        "SELECT id, version, created_at, notes, test_suite_id FROM test_suite_versions
         WHERE test_suite_id = ?1
         ORDER BY CAST(version AS INTEGER) DESC, id DESC LIMIT 1",
        params![test_suite_id],
        |r| map_suite_version(r, 0),
    )
    .optional()
}

fn map_os(r: &Row, at: usize) -> rusqlite::Result<OperatingSystem> {
    Ok(OperatingSystem {
        id: r.get(at)?,
        name: r.get(at + 1)?,
    })
}

fn map_os_version(r: &Row, at: usize) -> rusqlite::Result<OsVersion> {
    Ok(OsVersion {
        id: r.get(at)?,
        version: r.get(at + 1)?,
        os_id: r.get(at + 2)?,
    })
}

fn map_device(r: &Row, at: usize) -> rusqlite::Result<Device> {
    Ok(Device {
        id: r.get(at)?,
        name: r.get(at + 1)?,
        serial_number: r.get(at + 2)?,
        os_version_id: r.get(at + 3)?,
    })
}

fn map_app(r: &Row, at: usize) -> rusqlite::Result<App> {
    Ok(App {
        id: r.get(at)?,
        name: r.get(at + 1)?,
    })
}

fn map_app_version(r: &Row, at: usize) -> rusqlite::Result<AppVersion> {
    Ok(AppVersion {
        id: r.get(at)?,
        app_id: r.get(at + 1)?,
        version: r.get(at + 2)?,
    })
}

fn map_metric(r: &Row, at: usize) -> rusqlite::Result<Metric> {
    Ok(Metric {
        id: r.get(at)?,
        name: r.get(at + 1)?,
    })
}

fn map_metric_parameter(r: &Row, at: usize) -> rusqlite::Result<MetricParameter> {
    Ok(MetricParameter {
        id: r.get(at)?,
        name: r.get(at + 1)?,
        param_type: r.get(at + 2)?,
        metric_id: r.get(at + 3)?,
    })
}

fn map_metric_output(r: &Row, at: usize) -> rusqlite::Result<MetricOutput> {
    Ok(MetricOutput {
        id: r.get(at)?,
        name: r.get(at + 1)?,
        unit: r.get(at + 2)?,
        metric_id: r.get(at + 3)?,
    })
}

fn map_execution_type(r: &Row, at: usize) -> rusqlite::Result<ExecutionType> {
    Ok(ExecutionType {
        id: r.get(at)?,
        name: r.get(at + 1)?,
        description: r.get(at + 2)?,
    })
}

fn map_execution_type_parameter(r: &Row, at: usize) -> rusqlite::Result<ExecutionTypeParameter> {
    Ok(ExecutionTypeParameter {
        id: r.get(at)?,
        name: r.get(at + 1)?,
        param_type: r.get(at + 2)?,
        execution_type_id: r.get(at + 3)?,
    })
}

fn map_threshold_type(r: &Row, at: usize) -> rusqlite::Result<ThresholdType> {
    Ok(ThresholdType {
        id: r.get(at)?,
        name: r.get(at + 1)?,
        description: r.get(at + 2)?,
    })
}

fn map_test_plan(r: &Row, at: usize) -> rusqlite::Result<TestPlan> {
    Ok(TestPlan {
        id: r.get(at)?,
        name: r.get(at + 1)?,
        metric_id: r.get(at + 2)?,
    })
}

fn map_plan_version(r: &Row, at: usize) -> rusqlite::Result<TestPlanVersion> {
    Ok(TestPlanVersion {
        id: r.get(at)?,
        version: r.get(at + 1)?,
        created_at: r.get(at + 2)?,
        notes: r.get(at + 3)?,
        app_package: r.get(at + 4)?,
        main_activity: r.get(at + 5)?,
        test_plan_id: r.get(at + 6)?,
        device_id: r.get(at + 7)?,
        app_version_id: r.get(at + 8)?,
        execution_type_id: r.get(at + 9)?,
    })
}

fn map_suite_version(r: &Row, at: usize) -> rusqlite::Result<TestSuiteVersion> {
    Ok(TestSuiteVersion {
        id: r.get(at)?,
        version: r.get(at + 1)?,
        created_at: r.get(at + 2)?,
        notes: r.get(at + 3)?,
        test_suite_id: r.get(at + 4)?,
    })
}

fn map_execution(r: &Row, at: usize) -> rusqlite::Result<TestExecution> {
    Ok(TestExecution {
        id: r.get(at)?,
        started_at: r.get(at + 1)?,
        ended_at: r.get(at + 2)?,
        passed: r.get(at + 3)?,
        test_plan_version_id: r.get(at + 4)?,
    })
}
