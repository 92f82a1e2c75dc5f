use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("{algorithm} requires an environment that exposes a transition model")]
    ModelRequired { algorithm: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("malformed transition model at state {state}, action {action}: {message}")]
    InvalidModel {
        state: usize,
        action: usize,
        message: String,
    },

    #[error("agent has not been trained")]
    NotTrained,

    #[error("training was cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
