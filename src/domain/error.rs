use thiserror::Error;

/// Domain-level errors for VoxDesk.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    /// The host process could not be reached or went away.
    #[error("Host transport error: {0}")]
    HostTransport(String),

    /// The host answered the request with an error message.
    #[error("{0}")]
    Host(String),

    #[error("Host command {command} timed out after {timeout_ms} ms")]
    HostTimeout { command: String, timeout_ms: u64 },

    #[error("Host protocol error: {0}")]
    Protocol(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
