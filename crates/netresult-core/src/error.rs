//! Error types for the netresult core library
//!
//! These errors cover building a client and executing a call through a
//! [`ServiceFactory`](crate::http::ServiceFactory). They never reach callers of
//! [`handle_api`](crate::http::handle_api): the normalizer folds them into a
//! [`NetworkException`](crate::NetworkException).

use thiserror::Error;

/// Main error type for netresult operations
#[derive(Error, Debug)]
pub enum Error {
    /// The base URL handed to `build_service` is not an absolute URL
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The underlying reqwest client could not be constructed
    #[error("Failed to build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The transport or one of the middleware layers failed
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// A body could not be converted to or from its wire representation
    #[error("Conversion error ({converter}): {message}")]
    Conversion {
        converter: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Transport(reqwest_middleware::Error::Reqwest(error))
    }
}
