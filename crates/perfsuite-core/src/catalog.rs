//! Definition catalog: metrics, execution types and threshold types.
//!
//! Plans reference these by name, so they must exist before the first
//! `plan create`. Seeding is idempotent: rows already present by name are
//! reused, never updated.

use crate::errors::{ConfigError, Result};
use crate::storage::Store;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    pub metrics: Vec<MetricDef>,
    #[serde(default)]
    pub execution_types: Vec<ExecutionTypeDef>,
    #[serde(default)]
    pub threshold_types: Vec<ThresholdTypeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDef {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub outputs: Vec<OutputDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDef {
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
}

fn default_param_type() -> String {
    "string".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputDef {
    pub name: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionTypeDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdTypeDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub created: usize,
    pub reused: usize,
}

impl CatalogSummary {
    fn count(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.reused += 1;
        }
    }
}

pub fn parse_catalog(raw: &str) -> std::result::Result<Catalog, ConfigError> {
    let catalog: Catalog = serde_yaml::from_str(raw)
        .map_err(|e| ConfigError(format!("failed to parse catalog YAML: {}", e)))?;

    let mut seen = std::collections::HashSet::new();
    for m in &catalog.metrics {
        if m.name.trim().is_empty() {
            return Err(ConfigError("catalog metric with empty name".into()));
        }
        if !seen.insert(m.name.as_str()) {
            return Err(ConfigError(format!("duplicate metric '{}' in catalog", m.name)));
        }
    }
    Ok(catalog)
}

pub fn load_catalog(path: &Path) -> std::result::Result<Catalog, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read catalog {}: {}", path.display(), e)))?;
    parse_catalog(&raw)
}

pub fn seed_catalog(store: &Store, catalog: &Catalog) -> Result<CatalogSummary> {
    let mut summary = CatalogSummary::default();

    for m in &catalog.metrics {
        let (metric, created) = match store.find_metric_by_name(&m.name)? {
            Some(existing) => (existing, false),
            None => (store.insert_metric(&m.name)?, true),
        };
        summary.count(created);

        for p in &m.parameters {
            let created = store.find_metric_parameter(metric.id, &p.name)?.is_none();
            if created {
                store.insert_metric_parameter(metric.id, &p.name, &p.param_type)?;
            }
            summary.count(created);
        }
        for o in &m.outputs {
            let created = store.find_metric_output(metric.id, &o.name)?.is_none();
            if created {
                store.insert_metric_output(metric.id, &o.name, &o.unit)?;
            }
            summary.count(created);
        }
    }

    for et in &catalog.execution_types {
        let (exec_type, created) = match store.find_execution_type_by_name(&et.name)? {
            Some(existing) => (existing, false),
            None => (store.insert_execution_type(&et.name, &et.description)?, true),
        };
        summary.count(created);

        for p in &et.parameters {
            let created = store
                .find_execution_type_parameter(exec_type.id, &p.name)?
                .is_none();
            if created {
                store.insert_execution_type_parameter(exec_type.id, &p.name, &p.param_type)?;
            }
            summary.count(created);
        }
    }

    for tt in &catalog.threshold_types {
        let created = store.find_threshold_type_by_name(&tt.name)?.is_none();
        if created {
            store.insert_threshold_type(&tt.name, &tt.description)?;
        }
        summary.count(created);
    }

    tracing::info!(
        event = "perfsuite.catalog.seeded",
        created = summary.created,
        reused = summary.reused,
    );
    Ok(summary)
}

pub const SAMPLE_CATALOG: &str = r#"metrics:
  - name: launch_time
    parameters:
      - { name: iterations, type: int }
    outputs:
      - { name: launch_time_ms, unit: ms }
  - name: memory_usage
    parameters:
      - { name: iterations, type: int }
    outputs:
      - { name: memory_pss_kb, unit: kB }
execution_types:
  - name: cold_start
    description: App process killed before every launch
    parameters:
      - { name: warmup_runs, type: int }
  - name: warm_start
    description: App kept in memory between launches
    parameters:
      - { name: warmup_runs, type: int }
threshold_types:
  - { name: MAX, description: value must not exceed target }
  - { name: MIN, description: value must reach target }
  - { name: EQ, description: value must equal target }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalog_parses() {
        let c = parse_catalog(SAMPLE_CATALOG).unwrap();
        assert_eq!(c.metrics.len(), 2);
        assert_eq!(c.metrics[0].outputs[0].unit, "ms");
        assert_eq!(c.threshold_types.len(), 3);
    }

    #[test]
    fn duplicate_metric_rejected() {
        let raw = "metrics:\n  - name: a\n  - name: a\n";
        let err = parse_catalog(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate metric 'a'"));
    }

    #[test]
    fn seeding_twice_reuses_rows() {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        let c = parse_catalog(SAMPLE_CATALOG).unwrap();

        let first = seed_catalog(&store, &c).unwrap();
        assert_eq!(first.reused, 0);
        assert!(first.created > 0);

        let second = seed_catalog(&store, &c).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.reused, first.created);
    }
}
