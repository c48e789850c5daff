//! Call outcomes as plain data
//!
//! Every network call made through the normalizer ends in a [`NetworkResult`]:
//! either the (possibly absent) payload, or a [`NetworkException`] drawn from a
//! small closed set of causes. Both are fresh values per call with no shared
//! state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default message carried by [`NetworkException::socket_timeout`]
pub const SOCKET_TIMEOUT_MESSAGE: &str = "Socket Timeout";

/// Outcome of one network call
#[derive(Debug)]
pub enum NetworkResult<T> {
    /// The server answered 2xx. `data` is `None` when the body was empty.
    Success { data: Option<T> },
    /// The call failed; see [`NetworkException`] for the cause.
    Error { exception: NetworkException },
}

impl<T> NetworkResult<T> {
    pub fn success(data: Option<T>) -> Self {
        NetworkResult::Success { data }
    }

    pub fn error(exception: NetworkException) -> Self {
        NetworkResult::Error { exception }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NetworkResult::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, NetworkResult::Error { .. })
    }

    /// Payload of a successful call, `None` for errors and empty bodies
    pub fn data(&self) -> Option<&T> {
        match self {
            NetworkResult::Success { data } => data.as_ref(),
            NetworkResult::Error { .. } => None,
        }
    }

    pub fn exception(&self) -> Option<&NetworkException> {
        match self {
            NetworkResult::Success { .. } => None,
            NetworkResult::Error { exception } => Some(exception),
        }
    }

    /// Convert into a standard `Result` so callers can use `?`
    pub fn into_result(self) -> Result<Option<T>, NetworkException> {
        match self {
            NetworkResult::Success { data } => Ok(data),
            NetworkResult::Error { exception } => Err(exception),
        }
    }

    /// Transform the payload, leaving errors untouched
    pub fn map<U, F>(self, f: F) -> NetworkResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            NetworkResult::Success { data } => NetworkResult::Success { data: data.map(f) },
            NetworkResult::Error { exception } => NetworkResult::Error { exception },
        }
    }
}

impl<T> From<NetworkResult<T>> for Result<Option<T>, NetworkException> {
    fn from(result: NetworkResult<T>) -> Self {
        result.into_result()
    }
}

/// Closed set of reasons a network call can fail
///
/// Error codes are stable per variant, except `Api` which mirrors the HTTP
/// status. `Default` always reports code 1.
#[derive(Debug, Error)]
pub enum NetworkException {
    /// The server responded with a non-2xx status
    #[error("API error {code}: {message}")]
    Api {
        code: u16,
        message: String,
        error_response: Option<ErrorResponse>,
    },

    /// Connection-level timeout, reset, refusal or TLS failure
    #[error("No internet connection: {message}")]
    NoInternet { message: String },

    /// The host name could not be resolved
    #[error("Unknown host: {message}")]
    UnknownHost { message: String },

    /// Any other transport I/O failure
    #[error("I/O failure: {message}")]
    Io { message: String },

    /// The call was made in a state that cannot succeed
    #[error("Illegal state: {message}")]
    IllegalState { message: String },

    /// Anything not covered above; keeps the original fault for diagnostics
    #[error("Unexpected failure: {message}")]
    Default {
        message: String,
        #[source]
        cause: Option<anyhow::Error>,
    },
}

impl NetworkException {
    pub const NO_INTERNET_CODE: i32 = 2;
    pub const UNKNOWN_HOST_CODE: i32 = 8;
    pub const IO_CODE: i32 = 9;
    pub const ILLEGAL_STATE_CODE: i32 = 11;
    pub const DEFAULT_CODE: i32 = 1;

    /// `NoInternet` with the stock "Socket Timeout" message
    pub fn socket_timeout() -> Self {
        NetworkException::NoInternet {
            message: SOCKET_TIMEOUT_MESSAGE.to_string(),
        }
    }

    pub fn error_code(&self) -> i32 {
        match self {
            NetworkException::Api { code, .. } => i32::from(*code),
            NetworkException::NoInternet { .. } => Self::NO_INTERNET_CODE,
            NetworkException::UnknownHost { .. } => Self::UNKNOWN_HOST_CODE,
            NetworkException::Io { .. } => Self::IO_CODE,
            NetworkException::IllegalState { .. } => Self::ILLEGAL_STATE_CODE,
            NetworkException::Default { .. } => Self::DEFAULT_CODE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            NetworkException::Api { message, .. }
            | NetworkException::NoInternet { message }
            | NetworkException::UnknownHost { message }
            | NetworkException::Io { message }
            | NetworkException::IllegalState { message }
            | NetworkException::Default { message, .. } => message,
        }
    }

    /// Structured error body, only ever present on `Api`
    pub fn error_response(&self) -> Option<&ErrorResponse> {
        match self {
            NetworkException::Api { error_response, .. } => error_response.as_ref(),
            _ => None,
        }
    }
}

/// Structured body of a failed call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub status: Option<String>,
}

impl ErrorResponse {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }
}
