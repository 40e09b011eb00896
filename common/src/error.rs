use thiserror::Error;

/// Transient failure kinds: retryable, counted by the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Network,
    RateLimit,
    Timeout,
}

/// Permanent failure kinds: not retryable, fail the job outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermanentKind {
    Parsing,
    Auth,
    Validation,
}

// Core domain error taxonomy. Every kind is an explicit variant, never a
// bare string tag, so handlers can match on it instead of parsing messages.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("concurrency conflict on {table}:{id}")]
    Concurrency { table: &'static str, id: String },
    #[error("not found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("transient error ({kind:?}): {message}")]
    Transient {
        kind: TransientKind,
        message: String,
    },
    #[error("permanent error ({kind:?}): {message}")]
    Permanent {
        kind: PermanentKind,
        message: String,
    },
    #[error("no handler registered for {0}")]
    NoHandler(String),
    #[error("already scheduled: {0}")]
    AlreadyScheduled(String),
    #[error("circuit open")]
    CircuitOpen,
    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Maps the spec's `ErrorType` enum used by `ErrorRecord` onto this taxonomy.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Transient {
                kind: TransientKind::Network,
                ..
            } => "NETWORK",
            Self::Transient {
                kind: TransientKind::RateLimit,
                ..
            } => "RATE_LIMIT",
            Self::Transient {
                kind: TransientKind::Timeout,
                ..
            } => "TIMEOUT",
            Self::Permanent {
                kind: PermanentKind::Parsing,
                ..
            } => "PARSING",
            Self::Permanent {
                kind: PermanentKind::Auth,
                ..
            } => "AUTH",
            Self::Permanent {
                kind: PermanentKind::Validation,
                ..
            }
            | Self::Validation(_) => "VALIDATION",
            _ => "UNKNOWN",
        }
    }

    /// Retryable per §7: only the transient family.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether the circuit breaker should count this as a failure at all
    /// (permanent/validation errors should not trip the breaker).
    pub fn should_trip_breaker(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Unknown(_))
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Transient {
            kind: TransientKind::Network,
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::Transient {
            kind: TransientKind::RateLimit,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transient {
            kind: TransientKind::Timeout,
            message: message.into(),
        }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Permanent {
            kind: PermanentKind::Parsing,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Permanent {
            kind: PermanentKind::Auth,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_are_retryable_and_trip_the_breaker() {
        let err = AppError::network("connection reset");
        assert!(err.is_retryable());
        assert!(err.should_trip_breaker());
        assert_eq!(err.error_type(), "NETWORK");
    }

    #[test]
    fn permanent_kinds_are_not_retryable() {
        let err = AppError::parsing("malformed feed");
        assert!(!err.is_retryable());
        assert!(!err.should_trip_breaker());
        assert_eq!(err.error_type(), "PARSING");
    }

    #[test]
    fn validation_is_not_retryable() {
        let err = AppError::Validation("empty hash".into());
        assert!(!err.is_retryable());
        assert_eq!(err.error_type(), "VALIDATION");
    }
}
