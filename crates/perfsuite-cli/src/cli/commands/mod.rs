use super::args::*;
use perfsuite_core::config::{apply_env_overrides, load_config, write_sample_config, PerfConfig};
use perfsuite_core::engine::{Dispatcher, PlanExecutor};
use perfsuite_core::errors::{ConfigError, OrchestrationError};
use perfsuite_core::resolver::EntityResolver;
use perfsuite_core::storage::Store;
use perfsuite_platform::packages::FolderPackageRegistry;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod catalog;
pub mod device;
pub mod executions;
pub mod plan;
pub mod suite;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const TEST_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const INFRA_ERROR: i32 = 3;
}

/// Caller mistakes map to `CONFIG_ERROR`, everything else to `INFRA_ERROR`.
pub fn exit_code_for(e: &anyhow::Error) -> i32 {
    if let Some(oe) = e.downcast_ref::<OrchestrationError>() {
        return if oe.is_caller_error() {
            exit_codes::CONFIG_ERROR
        } else {
            exit_codes::INFRA_ERROR
        };
    }
    if e.downcast_ref::<ConfigError>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    exit_codes::INFRA_ERROR
}

/// Loaded config plus an open, migrated store.
pub struct Workspace {
    pub cfg: PerfConfig,
    pub store: Store,
}

impl Workspace {
    pub fn open(config_path: &Path, strict: bool) -> anyhow::Result<Self> {
        let mut cfg = load_config(config_path, strict)?;
        apply_env_overrides(&mut cfg)?;

        ensure_parent_dir(&cfg.db)?;
        let store = Store::open(&cfg.db)?;
        store.init_schema()?;
        tracing::debug!(
            event = "perfsuite.cli.workspace",
            db = %cfg.db.display(),
            packages_dir = %cfg.packages_dir.display(),
        );
        Ok(Self { cfg, store })
    }

    pub fn resolver(&self) -> EntityResolver {
        EntityResolver::new(
            self.store.clone(),
            perfsuite_platform::default_inventory(&self.cfg.runner),
            Arc::new(FolderPackageRegistry::new(&self.cfg.packages_dir)),
        )
    }

    pub fn executor(&self) -> PlanExecutor {
        let registry = perfsuite_platform::default_runners(&self.cfg.runner, &self.cfg.packages_dir);
        PlanExecutor::new(
            self.store.clone(),
            Dispatcher::new(registry, self.cfg.runner.timeout()),
        )
    }
}

pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> anyhow::Result<i32> {
    let config = cli.config;
    let strict = cli.strict;

    match cli.cmd {
        Command::Init(args) => cmd_init(&config, args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
        Command::Status => cmd_status(&Workspace::open(&config, strict)?),
        Command::Catalog(args) => catalog::run(&Workspace::open(&config, strict)?, args.cmd),
        Command::Device(args) => device::run(&Workspace::open(&config, strict)?, args.cmd).await,
        Command::Plan(args) => plan::run(&Workspace::open(&config, strict)?, args.cmd, &cancel).await,
        Command::Suite(args) => suite::run(&Workspace::open(&config, strict)?, args.cmd, &cancel).await,
        Command::Executions(args) => executions::run(&Workspace::open(&config, strict)?, args.cmd),
    }
}

fn cmd_init(config: &Path, args: InitArgs) -> anyhow::Result<i32> {
    if !config.exists() {
        if let Some(parent) = config.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_sample_config(config)?;
        eprintln!("created {}", config.display());
    } else {
        eprintln!("note: {} already exists", config.display());
    }
    write_file_if_missing(&args.catalog, perfsuite_core::catalog::SAMPLE_CATALOG)?;
    Ok(exit_codes::OK)
}

fn cmd_status(ws: &Workspace) -> anyhow::Result<i32> {
    let stats = ws.store.stats_best_effort()?;
    eprintln!("database: {}", ws.cfg.db.display());
    eprintln!("plan versions:    {}", stats.plan_versions);
    eprintln!("executions:       {}", stats.executions);
    eprintln!("suite executions: {}", stats.suite_executions);
    if let Some(at) = stats.last_execution_at {
        eprintln!("last execution:   {}", at);
    }
    Ok(exit_codes::OK)
}

fn write_file_if_missing(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::write(path, content)?;
        eprintln!("created {}", path.display());
    } else {
        eprintln!("note: {} already exists (skipped)", path.display());
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
