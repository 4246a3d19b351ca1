//! Error handling for CamDeck

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
///
/// Every variant carries the user-visible message string that the owning
/// widget renders inline. All errors are terminal for the attempt: no
/// retry, no backoff.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed REST call (transport failure or non-success status)
    #[error("network error: {0}")]
    Network(String),

    /// Push-channel connection or transport failure
    #[error("channel error: {0}")]
    Channel(String),

    /// Broken or undecodable image reference
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config error
    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<rust_socketio::Error> for Error {
    fn from(e: rust_socketio::Error) -> Self {
        Error::Channel(e.to_string())
    }
}
