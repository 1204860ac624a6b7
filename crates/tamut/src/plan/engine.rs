//! Boundary to the external model checker that synthesizes strategies.

use crate::mutation::MutationTestCase;
use std::path::{Path, PathBuf};

/// Errors talking to a strategy engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No strategy for test case '{case_id}' at {}", path.display())]
    NotFound { case_id: String, path: PathBuf },

    #[error("Engine I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine call for '{case_id}' exceeded {timeout_ms} ms")]
    Timeout { case_id: String, timeout_ms: u64 },

    #[error("No engine connection available after {waited_ms} ms")]
    PoolExhausted { waited_ms: u64 },

    #[error("Engine pool lock poisoned")]
    Poisoned,
}

impl EngineError {
    /// Communication failures are retried, missing strategies are not
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout { .. })
    }
}

/// A connection to a strategy-synthesis backend.
pub trait StrategyEngine: Send {
    /// Produce the non-refinement strategy text for `case`.
    ///
    /// # Errors
    /// Returns `EngineError` when the backend cannot produce a strategy.
    fn synthesize(&mut self, case: &MutationTestCase) -> Result<String, EngineError>;
}

/// Reads pre-computed strategies from `<dir>/<test-case-id>.strategy`.
#[derive(Debug, Clone)]
pub struct FileStrategyEngine {
    dir: PathBuf,
}

impl FileStrategyEngine {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Strategy file for a test case id
    #[must_use]
    pub fn path_for(&self, case_id: &str) -> PathBuf {
        self.dir.join(format!("{case_id}.strategy"))
    }
}

impl StrategyEngine for FileStrategyEngine {
    fn synthesize(&mut self, case: &MutationTestCase) -> Result<String, EngineError> {
        let path = self.path_for(&case.id);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!(case = %case.id, path = %path.display(), "loaded strategy");
                Ok(text)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::NotFound {
                    case_id: case.id.clone(),
                    path,
                })
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{Component, Direction, Edge, Location, LocationType};
    use crate::mutation::MutationClass;
    use std::sync::Arc;

    fn test_case() -> MutationTestCase {
        let mut component = Component::new("C");
        component.declarations.inputs.push("a".to_string());
        component.add_location(Location::new("A").with_kind(LocationType::Initial));
        component.add_edge(Edge::new("A", "A", Direction::Input, "a"));
        let original = Arc::new(component);
        let mutant = original.clone_for_verification();
        MutationTestCase::new(
            MutationClass::SinkLocation,
            &original,
            "0_Sink",
            String::new(),
            mutant,
        )
    }

    #[test]
    fn test_reads_strategy_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sink_location_0_Sink.strategy"), "State: ( S.A M.A )\n")
            .unwrap();
        let mut engine = FileStrategyEngine::new(dir.path());
        let text = engine.synthesize(&test_case()).unwrap();
        assert!(text.starts_with("State:"));
    }

    #[test]
    fn test_missing_file_not_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = FileStrategyEngine::new(dir.path());
        let err = engine.synthesize(&test_case()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_retryable() {
        let err = EngineError::Timeout {
            case_id: "c".to_string(),
            timeout_ms: 10,
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("10 ms"));
    }
}
