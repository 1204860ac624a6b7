//! Bounded retries for strategy engine calls.

use super::engine::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper limit for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = no retry)
    pub max_retries: usize,
    /// Backoff before the first retry; doubles for each further retry
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 100,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            backoff_ms: 100,
        }
    }

    /// Set the initial backoff
    #[must_use]
    pub const fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    /// Never retry
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 0,
        }
    }

    /// Sleep before retry number `retry` (0-based), capped.
    #[must_use]
    pub fn backoff(&self, retry: usize) -> Duration {
        let factor = 1u64 << retry.min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor)).min(MAX_BACKOFF)
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// retries are exhausted. `call` receives the 0-based attempt number.
    ///
    /// # Errors
    /// Returns the last error.
    pub fn run<T>(
        &self,
        mut call: impl FnMut(usize) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut attempt = 0;
        loop {
            match call(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(attempt, %error, ?wait, "engine call failed, retrying");
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    fn io_error() -> EngineError {
        EngineError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "engine closed"))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig::new(3).with_backoff_ms(10);
        assert_eq!(config.backoff(0), Duration::from_millis(10));
        assert_eq!(config.backoff(2), Duration::from_millis(40));
        assert_eq!(config.backoff(40), MAX_BACKOFF);
    }

    #[test]
    fn test_succeeds_after_retries() {
        let config = RetryConfig::new(2).with_backoff_ms(0);
        let mut calls = 0;
        let value = config
            .run(|attempt| {
                calls += 1;
                if attempt < 2 {
                    Err(io_error())
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let config = RetryConfig::new(1).with_backoff_ms(0);
        let mut calls = 0;
        let result: Result<(), _> = config.run(|_| {
            calls += 1;
            Err(io_error())
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_non_retryable_not_retried() {
        let config = RetryConfig::new(5).with_backoff_ms(0);
        let mut calls = 0;
        let result: Result<(), _> = config.run(|_| {
            calls += 1;
            Err(EngineError::NotFound {
                case_id: "x".to_string(),
                path: "x.strategy".into(),
            })
        });
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
        assert_eq!(calls, 1);
    }
}
