use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "perfsuite",
    version,
    about = "Versioned performance test plans for Android and iOS apps"
)]
pub struct Cli {
    #[arg(long, global = true, env = "PERFSUITE_CONFIG", default_value = "perfsuite.yaml")]
    pub config: PathBuf,

    /// Reject unknown keys in the config file
    #[arg(long, global = true)]
    pub strict: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config and catalog
    Init(InitArgs),
    /// Show database counts
    Status,
    Catalog(CatalogArgs),
    Device(DeviceArgs),
    Plan(PlanArgs),
    Suite(SuiteArgs),
    Executions(ExecutionsArgs),
    Version,
}

#[derive(clap::Args, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "catalog.yaml")]
    pub catalog: PathBuf,
}

#[derive(Parser, Clone)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub cmd: CatalogSub,
}

#[derive(Subcommand, Clone)]
pub enum CatalogSub {
    /// Seed metrics, execution types and threshold types from YAML
    Load {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Parser, Clone)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub cmd: DeviceSub,
}

#[derive(Subcommand, Clone)]
pub enum DeviceSub {
    /// Register a device from the platform inventory
    Resolve {
        #[arg(long)]
        name: String,
    },
}

#[derive(Parser, Clone)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub cmd: PlanSub,
}

#[derive(Subcommand, Clone)]
pub enum PlanSub {
    /// Create a new version of a test plan from a YAML request
    Create {
        #[arg(long)]
        file: PathBuf,
        /// Append the new version to this suite version
        #[arg(long)]
        suite_version: Option<i64>,
    },
    /// Print the execution config assembled for a plan version
    Show {
        #[arg(long)]
        version_id: i64,
    },
    /// Run a single plan version and record the result
    Run {
        #[arg(long)]
        version_id: i64,
    },
}

#[derive(Parser, Clone)]
pub struct SuiteArgs {
    #[command(subcommand)]
    pub cmd: SuiteSub,
}

#[derive(Subcommand, Clone)]
pub enum SuiteSub {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Create the next suite version from an ordered list of plan versions
    Version {
        #[arg(long)]
        suite_id: i64,
        /// Plan version id; repeat to set the run order
        #[arg(long = "plan")]
        plans: Vec<i64>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Run the latest version of a suite
    Run {
        #[arg(long)]
        suite_id: i64,
        /// abort | continue (overrides suite.on_failure)
        #[arg(long)]
        on_failure: Option<String>,
    },
}

#[derive(Parser, Clone)]
pub struct ExecutionsArgs {
    #[command(subcommand)]
    pub cmd: ExecutionsSub,
}

#[derive(Subcommand, Clone)]
pub enum ExecutionsSub {
    List {
        #[arg(long)]
        plan_version: i64,
    },
    /// Output results of one execution
    Show {
        #[arg(long)]
        id: i64,
    },
}
