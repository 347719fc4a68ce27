pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod on_error;
pub mod providers;
pub mod report;
pub mod resolver;
pub mod storage;
pub mod thresholds;
pub mod versioning;

pub use errors::{ConfigError, OrchestrationError};
