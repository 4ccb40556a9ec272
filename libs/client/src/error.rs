use remote_api_core::ApplicationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport, codec, cancellation and timeout failures, unchanged
    #[error(transparent)]
    Transport(remote_api_fabric::Error),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("Invalid manifest for `{root}`: {reason}")]
    InvalidManifest { root: String, reason: String },

    #[error("No member `{0}`")]
    UnknownMember(String),

    #[error("Member `{0}` is not a function")]
    NotCallable(String),
}

impl Error {
    /// The server answered with `success: false`
    pub fn is_application(&self) -> bool {
        matches!(self, Error::Application(_))
    }

    pub fn is_connection_closed(&self) -> bool {
        matches!(
            self,
            Error::Transport(remote_api_fabric::Error::ConnectionClosed)
        )
    }

    /// The reply arrived but could not be decoded
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Transport(remote_api_fabric::Error::Decode(_)))
    }
}

impl From<remote_api_fabric::Error> for Error {
    fn from(e: remote_api_fabric::Error) -> Self {
        match e {
            remote_api_fabric::Error::Configuration(msg) => Error::Configuration(msg),
            other => Error::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
