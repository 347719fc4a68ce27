pub mod assembler;
pub mod dispatch;
pub mod executor;
pub mod results;
pub mod suite;

pub use dispatch::{Dispatcher, PlatformRunner, RunnerRegistry};
pub use executor::{PlanExecutor, PlanRunOutcome};
pub use suite::{SuiteRunReport, SuiteSequencer};
