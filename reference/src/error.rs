//! Error kinds for reference rendering and verification.

use deqp_core::CoreError;
use thiserror::Error;

/// Errors surfaced by reference rendering, comparison and verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The caller broke a documented precondition (alignment, size,
    /// coordinate count, degenerate input). A test-authoring bug.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    /// A comparison failed and the caller asked for a hard error.
    #[error("comparison failed: {0}")]
    ComparisonFailure(String),
    /// A context resource could not be allocated or accessed.
    #[error("resource error: {0}")]
    ResourceError(String),
}

/// Discriminant of [`Error`] for matching without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PreconditionViolation,
    ComparisonFailure,
    ResourceError,
}

impl Error {
    /// Which of the three failure classes this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PreconditionViolation(_) => ErrorKind::PreconditionViolation,
            Error::ComparisonFailure(_) => ErrorKind::ComparisonFailure,
            Error::ResourceError(_) => ErrorKind::ResourceError,
        }
    }

    /// The message without the kind prefix `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            Error::PreconditionViolation(msg)
            | Error::ComparisonFailure(msg)
            | Error::ResourceError(msg) => msg,
        }
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        Error::PreconditionViolation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::PreconditionViolation`] unless `cond` holds.
pub(crate) fn ensure(cond: bool, message: impl FnOnce() -> String) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(Error::PreconditionViolation(message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PreconditionViolation("Offset is not aligned.".to_string());
        assert_eq!(err.to_string(), "precondition violated: Offset is not aligned.");
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        assert_eq!(err.message(), "Offset is not aligned.");
    }

    #[test]
    fn core_errors_are_preconditions() {
        let err: Error = CoreError::InvalidDimensions {
            width: 0,
            height: 1,
            depth: 1,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn ensure_is_lazy() {
        assert!(ensure(true, || unreachable!()).is_ok());
        let err = ensure(false, || "bad".to_string()).unwrap_err();
        assert_eq!(err, Error::PreconditionViolation("bad".to_string()));
    }
}
