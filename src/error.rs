use thiserror::Error;

use crate::types::TabId;

pub const NOT_A_PROFILE_PAGE: &str = "Not a profile page";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Message generation blocked by the provider: {reason}")]
    Blocked { reason: String },
    #[error("The provider returned no usable message")]
    Empty,
    #[error("Generation API error: {message}")]
    Transport { status: Option<u16>, message: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", NOT_A_PROFILE_PAGE)]
    NotAProfilePage,
    #[error("Could not reach the page agent ({0})")]
    ChannelUnavailable(String),
    #[error("Page {0} does not exist")]
    TargetNotFound(TabId),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),
    #[error("Settings storage error: {0}")]
    Storage(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Remote(String),
    #[error("Protocol violation: {0}")]
    Protocol(String),
}

impl Error {
    /// The single concrete thing a person can do about this failure.
    pub fn user_hint(&self) -> &str {
        match self {
            Error::NotAProfilePage => "Navigate to a profile page and try again.",
            Error::ChannelUnavailable(_) | Error::TargetNotFound(_) => {
                "Please reload the page and try again."
            }
            Error::Generation(GenerationError::Blocked { .. }) => {
                "Adjust your context text; the provider refused this request."
            }
            Error::Generation(GenerationError::Empty) => "Try generating again.",
            Error::Generation(GenerationError::Transport { .. }) => {
                "Check your API key and network connection."
            }
            Error::ConfigMissing(_) => "Open the settings and describe yourself first.",
            Error::Storage(_) | Error::Config(_) => "Check the settings file.",
            Error::Remote(_) | Error::Protocol(_) => "Try again.",
        }
    }

    /// Rebuild a typed error from a failure message that crossed the bus.
    pub fn from_remote(message: String) -> Self {
        if message == NOT_A_PROFILE_PAGE {
            Error::NotAProfilePage
        } else {
            Error::Remote(message)
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
