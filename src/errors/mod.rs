//! # Error Handling
//!
//! Error types for the xDS inspection library, defined with `thiserror`.
//!
//! A filter that matches nothing is not an error: it is reported through
//! [`crate::xds::handler::Outcome::NotFound`].

/// Custom result type for xdsctl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xdsctl
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors (bad proxy tag, bad control plane address)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Control plane session errors (connect, stream, gRPC status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A resource entry could not be interpreted as its typed object
    #[error("Decode error: {type_url}: {message}")]
    Decode { type_url: String, message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rendering failures
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new decode error for an entry of the given type URL
    pub fn decode<T: Into<String>, S: Into<String>>(type_url: T, message: S) -> Self {
        Self::Decode {
            type_url: type_url.into(),
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization(message.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(format!("JSON serialization failed: {}", error))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Self::serialization(format!("YAML serialization failed: {}", error))
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::transport(format!("{}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(error: tonic::transport::Error) -> Self {
        Self::transport(error.to_string())
    }
}
