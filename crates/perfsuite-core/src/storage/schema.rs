pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS operating_systems (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL COLLATE NOCASE UNIQUE
);

CREATE TABLE IF NOT EXISTS os_versions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  version TEXT NOT NULL,
  os_id INTEGER NOT NULL REFERENCES operating_systems(id),
  UNIQUE (os_id, version)
);

CREATE TABLE IF NOT EXISTS devices (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  serial_number TEXT UNIQUE,
  os_version_id INTEGER NOT NULL REFERENCES os_versions(id)
);

CREATE TABLE IF NOT EXISTS apps (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS app_versions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  app_id INTEGER NOT NULL REFERENCES apps(id),
  version TEXT NOT NULL,
  UNIQUE (app_id, version)
);

CREATE TABLE IF NOT EXISTS metrics (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS metric_parameters (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  type TEXT NOT NULL,
  metric_id INTEGER NOT NULL REFERENCES metrics(id),
  UNIQUE (metric_id, name)
);

CREATE TABLE IF NOT EXISTS metric_outputs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  unit TEXT NOT NULL,
  metric_id INTEGER NOT NULL REFERENCES metrics(id),
  UNIQUE (metric_id, name)
);

CREATE TABLE IF NOT EXISTS execution_types (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS execution_type_parameters (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  type TEXT NOT NULL,
  execution_type_id INTEGER NOT NULL REFERENCES execution_types(id),
  UNIQUE (execution_type_id, name)
);

CREATE TABLE IF NOT EXISTS threshold_types (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS test_plans (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  metric_id INTEGER NOT NULL REFERENCES metrics(id),
  UNIQUE (name, metric_id)
);

CREATE TABLE IF NOT EXISTS test_plan_versions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  version TEXT NOT NULL,
  created_at TEXT NOT NULL,
  notes TEXT NOT NULL DEFAULT '',
  app_package TEXT NOT NULL,
  main_activity TEXT NOT NULL DEFAULT '',
  test_plan_id INTEGER NOT NULL REFERENCES test_plans(id),
  device_id INTEGER NOT NULL REFERENCES devices(id),
  app_version_id INTEGER NOT NULL REFERENCES app_versions(id),
  execution_type_id INTEGER NOT NULL REFERENCES execution_types(id),
  UNIQUE (test_plan_id, version)
);

CREATE TABLE IF NOT EXISTS test_thresholds (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  target_value REAL NOT NULL,
  test_plan_version_id INTEGER NOT NULL REFERENCES test_plan_versions(id),
  threshold_type_id INTEGER NOT NULL REFERENCES threshold_types(id),
  metric_output_id INTEGER NOT NULL REFERENCES metric_outputs(id)
);

CREATE TABLE IF NOT EXISTS test_metric_parameter_values (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  value TEXT NOT NULL,
  test_plan_version_id INTEGER NOT NULL REFERENCES test_plan_versions(id),
  metric_parameter_id INTEGER NOT NULL REFERENCES metric_parameters(id),
  UNIQUE (test_plan_version_id, metric_parameter_id)
);

CREATE TABLE IF NOT EXISTS test_execution_type_parameter_values (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  value TEXT NOT NULL,
  test_plan_version_id INTEGER NOT NULL REFERENCES test_plan_versions(id),
  execution_type_parameter_id INTEGER NOT NULL REFERENCES execution_type_parameters(id),
  UNIQUE (test_plan_version_id, execution_type_parameter_id)
);

CREATE TABLE IF NOT EXISTS test_suites (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  description TEXT NOT NULL DEFAULT '',
  created_at TEXT NOT NULL,
  active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS test_suite_versions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  version TEXT NOT NULL,
  created_at TEXT NOT NULL,
  notes TEXT NOT NULL DEFAULT '',
  test_suite_id INTEGER NOT NULL REFERENCES test_suites(id),
  UNIQUE (test_suite_id, version)
);

CREATE TABLE IF NOT EXISTS test_suite_version_plans (
  suite_version_id INTEGER NOT NULL REFERENCES test_suite_versions(id),
  plan_version_id INTEGER NOT NULL REFERENCES test_plan_versions(id),
  plan_order INTEGER NOT NULL,
  PRIMARY KEY (suite_version_id, plan_order)
);

CREATE TABLE IF NOT EXISTS test_executions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  started_at TEXT NOT NULL,
  ended_at TEXT NOT NULL,
  passed TEXT NOT NULL,
  test_plan_version_id INTEGER NOT NULL REFERENCES test_plan_versions(id)
);

CREATE TABLE IF NOT EXISTS test_metric_output_results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  value TEXT NOT NULL,
  metric_output_id INTEGER NOT NULL REFERENCES metric_outputs(id),
  test_execution_id INTEGER NOT NULL REFERENCES test_executions(id)
);

CREATE TABLE IF NOT EXISTS suite_executions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  started_at TEXT NOT NULL,
  ended_at TEXT NOT NULL,
  status TEXT NOT NULL,
  test_suite_version_id INTEGER NOT NULL REFERENCES test_suite_versions(id)
);

CREATE TABLE IF NOT EXISTS suite_execution_results (
  suite_execution_id INTEGER NOT NULL REFERENCES suite_executions(id),
  test_execution_id INTEGER NOT NULL REFERENCES test_executions(id),
  position INTEGER NOT NULL,
  PRIMARY KEY (suite_execution_id, position)
);

CREATE INDEX IF NOT EXISTS idx_devices_name ON devices(name);
CREATE INDEX IF NOT EXISTS idx_executions_plan_version ON test_executions(test_plan_version_id);
CREATE INDEX IF NOT EXISTS idx_output_results_execution ON test_metric_output_results(test_execution_id);
"#;
