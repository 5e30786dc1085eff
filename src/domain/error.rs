use thiserror::Error;

use crate::domain::pointer::PathError;

/// Configuration errors raised while building or running a validation tree.
///
/// Failed assertions are never reported through this type; they end up in
/// the report. Any `SpecError` aborts the run.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("header expectation `{name}` is not registered")]
    UnknownExpectation { name: String },

    #[error("behavior `{name}` could not be found")]
    BehaviorNotFound { name: String },

    #[error("invalid expectation at `{path}`: {reason}")]
    InvalidExpectation { path: String, reason: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("response `{name}` was not captured")]
    MissingResponse { name: String },

    #[error(transparent)]
    Path(#[from] PathError),
}
