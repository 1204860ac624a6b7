//! Result and error types for tamut.

use crate::model::ModelError;
use thiserror::Error;

/// Result type for tamut operations
pub type TamutResult<T> = Result<T, MutationTestingError>;

/// Errors raised while generating or executing mutation test cases.
///
/// Any of these aborts the single mutant or test case being processed;
/// callers move on to the next operator, edge or test case.
#[derive(Debug, Error)]
pub enum MutationTestingError {
    /// A guard part did not match `side1 OP side2`
    #[error("Malformed relation '{text}': {message}")]
    MalformedRelation {
        /// Offending text
        text: String,
        /// What was wrong
        message: String,
    },

    /// An update did not match `var (=|:=) expr`
    #[error("Malformed update '{text}': {message}")]
    MalformedUpdate {
        /// Offending text
        text: String,
        /// What was wrong
        message: String,
    },

    /// An expression could not be tokenized or parsed
    #[error("Malformed expression '{text}': {message}")]
    MalformedExpression {
        /// Offending text
        text: String,
        /// What was wrong
        message: String,
    },

    /// An expression referenced a name with no value
    #[error("Unknown variable '{name}' in '{expression}'")]
    UnknownVariable {
        /// Missing name
        name: String,
        /// Expression being evaluated
        expression: String,
    },

    /// An expression evaluated to the wrong kind of value
    #[error("Type error in '{expression}': {message}")]
    TypeError {
        /// Expression being evaluated
        expression: String,
        /// What was wrong
        message: String,
    },

    /// A strategy transition descriptor did not match `P.A->P.B { s, y, u }`
    #[error("Malformed transition descriptor '{text}'")]
    MalformedTransition {
        /// Offending text
        text: String,
    },

    /// A line inside a strategy block matched neither rule form
    #[error("Malformed strategy line {line_number}: '{line}'")]
    MalformedStrategyLine {
        /// 1-based line number
        line_number: usize,
        /// Offending line
        line: String,
    },

    /// An internal invariant of an operator or the model was violated
    #[error("Invariant violated: {message}")]
    InvariantViolated {
        /// Error message
        message: String,
    },

    /// The automaton is structurally invalid
    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),

    /// A simulation hit a condition that indicates a malformed model
    #[error("Simulation of '{process}' aborted: {message}")]
    Simulation {
        /// Process name of the failing simulation
        process: String,
        /// Error message
        message: String,
    },

    /// The strategy engine could not produce a strategy
    #[error("Strategy engine failed for '{case_id}': {message}")]
    Engine {
        /// Test case id
        case_id: String,
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MutationTestingError {
    /// Create an invariant violation error
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolated {
            message: message.into(),
        }
    }

    /// Create a malformed expression error
    #[must_use]
    pub fn expression(text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedExpression {
            text: text.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_error_display() {
        let err = MutationTestingError::invariant("edge guard must be non-empty");
        assert!(err.to_string().contains("Invariant violated"));
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_strategy_line_error_display() {
        let err = MutationTestingError::MalformedStrategyLine {
            line_number: 7,
            line: "garbage".to_string(),
        };
        assert!(err.to_string().contains("line 7"));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MutationTestingError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }

    #[test]
    fn test_model_error_from() {
        let err: MutationTestingError = ModelError::NoInitialLocation.into();
        assert!(err.to_string().contains("Invalid model"));
    }
}
