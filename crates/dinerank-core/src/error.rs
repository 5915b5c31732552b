use thiserror::Error;

/// Errors that reach callers of the ranking and cache APIs.
///
/// Cache-store failures never appear here; the cache tier absorbs them.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Computation timed out after {timeout_ms}ms")]
    ComputeTimeout { timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new NotFound error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new ComputeTimeout error
    pub fn compute_timeout(timeout_ms: u64) -> Self {
        Self::ComputeTimeout { timeout_ms }
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was caused by the caller's input (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::NotFound { .. })
    }

    /// Check if this error is a server-side failure (5xx category)
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::ComputeTimeout { .. } => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Internal(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Timeout,
    Configuration,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Timeout => write!(f, "timeout"),
            Self::Configuration => write!(f, "configuration"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_error() {
        let err = CoreError::invalid_argument("k must be >= 1");
        assert_eq!(err.to_string(), "Invalid argument: k must be >= 1");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_not_found_error() {
        let err = CoreError::not_found("Restaurant", 42);
        assert_eq!(err.to_string(), "Restaurant not found: 42");
        assert!(err.is_client_error());
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_compute_timeout_error() {
        let err = CoreError::compute_timeout(250);
        assert_eq!(err.to_string(), "Computation timed out after 250ms");
        assert!(err.is_server_error());
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCategory::Timeout.to_string(), "timeout");
        assert_eq!(ErrorCategory::Configuration.to_string(), "configuration");
        assert_eq!(ErrorCategory::System.to_string(), "system");
    }
}
