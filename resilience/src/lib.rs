pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use retry::{execute as retry_execute, RetryOutcome};

pub mod prelude {
    pub use crate::circuit_breaker::{CircuitBreaker, CircuitState};
    pub use crate::retry::{execute as retry_execute, RetryOutcome};
}
