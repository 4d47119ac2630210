use crate::frame::FrameError;
use std::fmt;
use thiserror::Error as ThisError;
use tilegroup_config::ConfigError;

///
/// InternalError
///
/// Structured error with a stable internal classification.
/// Every fallible planning and execution path returns this type.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a planner-origin invariant violation.
    pub(crate) fn planner_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Planner,
            message.into(),
        )
    }

    /// Construct a planner-origin invalid-input error.
    pub(crate) fn planner_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidInput, ErrorOrigin::Planner, message.into())
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    /// Construct a reduction-origin unsupported error.
    pub(crate) fn reduction_unsupported(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Reduction,
            message.into(),
        )
    }

    /// Construct a reduction-origin invariant violation.
    pub(crate) fn reduction_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Reduction,
            message.into(),
        )
    }

    /// Construct a runtime-origin missing-chunk error.
    pub fn chunk_not_found(key: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Runtime,
            format!("chunk data not found: {key}"),
        )
    }

    /// Re-tag an error as raised by schema inference, keeping its class.
    #[must_use]
    pub(crate) fn into_mock(self) -> Self {
        Self {
            origin: ErrorOrigin::Mock,
            ..self
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }
}

impl From<FrameError> for InternalError {
    fn from(err: FrameError) -> Self {
        let class = match err {
            FrameError::ColumnNotFound { .. } | FrameError::IndexLevelNotFound { .. } => {
                ErrorClass::NotFound
            }
            FrameError::UnsupportedDType { .. } => ErrorClass::Unsupported,
            FrameError::DuplicateColumn { .. }
            | FrameError::LengthMismatch { .. }
            | FrameError::LevelMismatch { .. } => ErrorClass::InvalidInput,
        };

        Self::new(class, ErrorOrigin::Frame, err.to_string())
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        let class = match err {
            ConfigError::UnsupportedMethod(_) => ErrorClass::Unsupported,
            ConfigError::Io { ref source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorClass::NotFound
            }
            _ => ErrorClass::InvalidInput,
        };

        Self::new(class, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    InvalidInput,
    Unsupported,
    InvariantViolation,
    NotFound,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidInput => "invalid_input",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Config,
    Frame,
    Reduction,
    Planner,
    Mock,
    Executor,
    Runtime,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Frame => "frame",
            Self::Reduction => "reduction",
            Self::Planner => "planner",
            Self::Mock => "mock",
            Self::Executor => "executor",
            Self::Runtime => "runtime",
        };
        write!(f, "{label}")
    }
}
