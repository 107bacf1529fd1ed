use thiserror::Error;

/// Lifecycle controller error type
#[derive(Error, Debug)]
pub enum Error {
    /// RPC error reported by the wallet engine
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Engine operation failed for a reason other than RPC
    #[error("Engine error: {0}")]
    Engine(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Push notification could not be decoded
    #[error("Notification error: {0}")]
    Notification(String),

    /// Controller was mounted twice without an unmount in between
    #[error("Controller is already mounted")]
    AlreadyMounted,

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Inner message of the string-carrying variants
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::Rpc(message)
            | Error::Engine(message)
            | Error::Config(message)
            | Error::Notification(message)
            | Error::Other(message) => Some(message),
            _ => None,
        }
    }

    /// Whether this error carries the exact message the provider returns when
    /// it refuses service (e.g. geo-blocking), whichever variant wraps it.
    pub fn is_provider_blocked(&self, signature: &str) -> bool {
        self.message() == Some(signature)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
