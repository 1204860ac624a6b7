//! Configuration loaded from YAML.
//!
//! ```yaml
//! verdict:
//!   max_steps: 200
//!   delay_step: 0.5
//! engine:
//!   max_connections: 8
//!   retry:
//!     max_retries: 3
//! operators: ["change_target", "sink_location"]
//! ```

use crate::mutation::MutationClass;
use crate::plan::RetryConfig;
use crate::result::{MutationTestingError, TamutResult};
use crate::verdict::VerdictConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Strategy engine connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine connections, and so plan workers
    pub max_connections: usize,
    /// How long a worker waits for a free connection
    pub acquire_timeout_ms: u64,
    /// Longest acceptable single engine call.
    ///
    /// Checked when the call returns: a slower answer is discarded as a
    /// retryable timeout, but an engine that never returns still holds its
    /// worker. Engines talking to a backend must bound their own I/O.
    pub call_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout_ms: 30_000,
            call_timeout_ms: 60_000,
            retry: RetryConfig::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub const fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn with_call_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TamutConfig {
    pub verdict: VerdictConfig,
    pub engine: EngineConfig,
    /// Operator codes to run; empty means all
    pub operators: Vec<String>,
}

impl TamutConfig {
    /// Parse YAML text.
    ///
    /// # Errors
    /// Returns a YAML error for malformed text.
    pub fn from_yaml(text: &str) -> TamutResult<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Load from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> TamutResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn to_yaml(&self) -> TamutResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    #[must_use]
    pub fn with_verdict(mut self, verdict: VerdictConfig) -> Self {
        self.verdict = verdict;
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn with_operators<S: Into<String>>(mut self, operators: impl IntoIterator<Item = S>) -> Self {
        self.operators = operators.into_iter().map(Into::into).collect();
        self
    }

    /// Selected mutation classes in catalogue order.
    ///
    /// # Errors
    /// Returns `InvariantViolated` naming an unknown operator code.
    pub fn classes(&self) -> TamutResult<Vec<MutationClass>> {
        if self.operators.is_empty() {
            return Ok(MutationClass::all());
        }
        let mut classes = self
            .operators
            .iter()
            .map(|code| {
                MutationClass::from_code(code.trim()).ok_or_else(|| {
                    MutationTestingError::invariant(format!("unknown mutation operator '{code}'"))
                })
            })
            .collect::<TamutResult<Vec<_>>>()?;
        classes.sort();
        classes.dedup();
        Ok(classes)
    }
}
