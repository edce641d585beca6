//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// An error from the embedded engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The embedded compiler script does not compile. The script is fixed
    /// when the host binary is built, so this means a broken build artifact.
    #[error("failed to compile `{name}` to bytecode: {message}")]
    BytecodeCompile { name: String, message: String },

    /// A single engine instance failed to initialise.
    #[error("failed to initialise engine: {0}")]
    Init(String),

    /// The guest threw an exception.
    #[error("{0}")]
    Exception(String),

    /// A value could not cross the host/guest boundary.
    #[error("failed to marshal value: {0}")]
    Marshal(String),

    /// The interpreter itself failed.
    #[error("javascript runtime error: {0}")]
    Runtime(String),

    /// The executor no longer accepts requests.
    #[error("executor is closed")]
    Closed,
}

impl EngineError {
    /// Whether the error means no engine can ever be built in this process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BytecodeCompile { .. })
    }
}

impl From<rquickjs::Error> for EngineError {
    fn from(err: rquickjs::Error) -> Self {
        Self::Runtime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kind() {
        let err = EngineError::BytecodeCompile {
            name: "compiler.js".to_string(),
            message: "SyntaxError".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!EngineError::Init("boom".to_string()).is_fatal());
    }

    #[test]
    fn test_exception_display_is_message() {
        let err = EngineError::Exception("Element is missing end tag.".to_string());
        assert_eq!(err.to_string(), "Element is missing end tag.");
    }
}
