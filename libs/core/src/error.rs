use thiserror::Error;

/// A member of the introspection manifest that does not fit any known shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("member `{path}` must be a map, found {found}")]
    NotAMap { path: String, found: &'static str },

    #[error("member `{path}` mixes a `func`/`const` marker with other keys")]
    Ambiguous { path: String },
}

/// The server reported `success: false` for a call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("call to \"{function}\" failed: {message}")]
pub struct ApplicationError {
    pub function: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error(transparent)]
    Application(#[from] ApplicationError),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedReply(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
