//! Response object inspected by the normalizer
//!
//! `ApiResponse` is the narrow view of a finished HTTP exchange that
//! [`normalize`](crate::http::normalize) needs: a success flag derived from the
//! status, the decoded body on success, and the raw error text otherwise.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// A completed HTTP exchange with a typed success body
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Decoded body of a 2xx response; `None` when the body was empty
    pub body: Option<T>,
    /// Raw body of a non-2xx response
    pub error_body: Option<String>,
    /// Status reason phrase, e.g. "Not Found"
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// Build a successful response carrying `body`
    pub fn success(status: StatusCode, body: Option<T>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
            error_body: None,
            message: reason_phrase(status),
        }
    }

    /// Build a failed response carrying the raw error text
    pub fn failure(status: StatusCode, error_body: impl Into<String>) -> Self {
        let error_body = error_body.into();
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
            error_body: (!error_body.is_empty()).then_some(error_body),
            message: reason_phrase(status),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Read a reqwest response, decoding 2xx bodies with `decode`
    ///
    /// `decode` receives the response content type and the non-empty body
    /// bytes. Empty success bodies skip decoding and yield `body: None`.
    pub async fn read_with<F>(response: reqwest::Response, decode: F) -> crate::Result<Self>
    where
        F: FnOnce(Option<&str>, &[u8]) -> crate::Result<T>,
    {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        if status.is_success() {
            let body = if bytes.is_empty() {
                None
            } else {
                let content_type = headers
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok());
                Some(decode(content_type, &bytes)?)
            };
            Ok(Self::success(status, body).with_headers(headers))
        } else {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Ok(Self::failure(status, text).with_headers(headers))
        }
    }
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Read a reqwest response, decoding 2xx bodies as JSON
    pub async fn from_reqwest(response: reqwest::Response) -> crate::Result<Self> {
        Self::read_with(response, |_, bytes| {
            serde_json::from_slice(bytes).map_err(|e| crate::Error::Conversion {
                converter: "json".to_string(),
                message: format!("Failed to decode response body: {}", e),
                source: Some(e.into()),
            })
        })
        .await
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = ApiResponse::success(StatusCode::OK, Some(42u32));
        assert!(response.is_successful());
        assert_eq!(response.body, Some(42));
        assert_eq!(response.message, "OK");
        assert!(response.error_body.is_none());
    }

    #[test]
    fn test_failure_response_drops_empty_body() {
        let response: ApiResponse<()> = ApiResponse::failure(StatusCode::NOT_FOUND, "");
        assert!(!response.is_successful());
        assert_eq!(response.code(), 404);
        assert!(response.error_body.is_none());
        assert_eq!(response.message, "Not Found");
    }

    #[test]
    fn test_custom_status_has_empty_reason() {
        let status = StatusCode::from_u16(599).unwrap();
        let response: ApiResponse<()> = ApiResponse::failure(status, "oops");
        assert_eq!(response.message, "");
        assert_eq!(response.error_body.as_deref(), Some("oops"));
    }
}
