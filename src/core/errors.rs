use thiserror::Error;

/// Unified error type for the team probe
#[derive(Debug, Error)]
pub enum TeamError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Validation errors on caller-supplied input
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Final counter value fell outside the scenario bound
    #[error("Bound violation: counter is {observed}, expected within [{min}, {max}]")]
    BoundViolation { observed: i64, min: i64, max: i64 },

    /// The counter disagrees with the number of units that actually ran
    #[error("Lost updates: {expected} increments executed, counter reads {observed}")]
    LostUpdates { expected: i64, observed: i64 },

    /// Offload backend failures (region join, mapping)
    #[error("Offload operation failed: {operation}")]
    Offload {
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO errors
    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TeamError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
            expected: None,
            actual: None,
        }
    }

    /// Create a configuration error for a field holding an unusable value
    pub fn configuration_field<F: Into<String>, E: Into<String>, A: Into<String>>(
        field: F,
        expected: E,
        actual: A,
    ) -> Self {
        let field = field.into();
        Self::Configuration {
            message: format!("invalid value for {}", field),
            field: Some(field),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn bound_violation(observed: i64, min: i64, max: i64) -> Self {
        Self::BoundViolation { observed, min, max }
    }

    pub fn lost_updates(expected: i64, observed: i64) -> Self {
        Self::LostUpdates { expected, observed }
    }

    /// Create an offload error with source
    pub fn offload_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        operation: S,
        source: E,
    ) -> Self {
        Self::Offload {
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error
    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error means the probe observed a correctness defect
    /// rather than a setup problem.
    pub fn is_correctness_failure(&self) -> bool {
        matches!(self, Self::BoundViolation { .. } | Self::LostUpdates { .. })
    }

    /// Short category name used in logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Validation { .. } => "validation",
            Self::BoundViolation { .. } => "bound_violation",
            Self::LostUpdates { .. } => "lost_updates",
            Self::Offload { .. } => "offload",
            Self::Io { .. } => "io",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_yaml::Error> for TeamError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}

impl From<serde_json::Error> for TeamError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

impl From<tokio::task::JoinError> for TeamError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::offload_with_source("join offloaded region", err)
    }
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, TeamError>;
