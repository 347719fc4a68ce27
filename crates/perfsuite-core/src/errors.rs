use thiserror::Error;

pub type Result<T, E = OrchestrationError> = std::result::Result<T, E>;

/// Failures raised by the orchestration core.
///
/// Caller errors (`NotFound`, `InvalidReference`, `StructuralFailure`,
/// `UnsupportedPlatform`) are never worth retrying. Runner and collaborator
/// failures may be transient.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("structural failure: {0}")]
    StructuralFailure(String),

    #[error("no runner registered for platform '{0}'")]
    UnsupportedPlatform(String),

    #[error("runner for '{platform}' failed: {message}")]
    RunnerFailure { platform: String, message: String },

    #[error("{collaborator} lookup failed: {message}")]
    CollaboratorFailure {
        collaborator: &'static str,
        message: String,
    },

    #[error("runner for '{platform}' timed out after {seconds}s")]
    Timeout { platform: String, seconds: u64 },

    #[error("run cancelled")]
    Cancelled,

    #[error("sqlite error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestrationError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::RunnerFailure { .. } | Self::CollaboratorFailure { .. }
        )
    }

    /// True when the caller supplied something that cannot be satisfied,
    /// including a natural key that already exists.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidReference(_)
                | Self::StructuralFailure(_)
                | Self::UnsupportedPlatform(_)
        ) || self.is_constraint_violation()
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Store(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_key() {
        let err = OrchestrationError::not_found("Metric", "metricA");
        assert_eq!(err.to_string(), "Metric not found: metricA");
        assert!(err.is_caller_error());
        assert!(!err.is_retriable());
    }

    #[test]
    fn duplicate_natural_key_is_a_caller_error() {
        let store = crate::storage::Store::memory().unwrap();
        store.init_schema().unwrap();
        store.insert_test_suite("nightly", "").unwrap();

        let err = store.insert_test_suite("nightly", "again").unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(err.is_caller_error());
        assert!(!err.is_retriable());
    }

    #[test]
    fn timeouts_are_retriable() {
        let err = OrchestrationError::Timeout {
            platform: "android".into(),
            seconds: 5,
        };
        assert!(err.is_retriable());
        assert!(!err.is_caller_error());
    }
}
