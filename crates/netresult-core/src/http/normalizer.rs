//! Call-result normalization
//!
//! Wraps one network call and turns whatever happens into a
//! [`NetworkResult`]. HTTP-level failures become [`NetworkException::Api`]
//! with a best-effort parse of the error body; faults raised before a
//! response exists go through [`classify`]. Nothing escapes as a Rust error or
//! a panic.

use std::any::Any;
use std::future::Future;

use tokio::task::{JoinError, JoinHandle};

use crate::http::fault::{classify, CallFault};
use crate::http::response::ApiResponse;
use crate::result::{ErrorResponse, NetworkException, NetworkResult};

/// Run `execute` on the runtime's worker pool and normalize its outcome
///
/// The call is spawned as its own task, so a panic while sending the request
/// or mapping the response is reported as [`NetworkException::Default`]
/// rather than unwinding into the caller.
pub async fn handle_api<T, E, F, Fut>(execute: F) -> NetworkResult<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<ApiResponse<T>, E>> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    T: Send + 'static,
{
    let call = tokio::spawn(async move {
        let outcome: anyhow::Result<ApiResponse<T>> = execute().await.map_err(Into::into);
        outcome
    });
    settle(call).await
}

/// Same contract as [`handle_api`] for calls made with a blocking client
pub async fn handle_api_blocking<T, E, F>(execute: F) -> NetworkResult<T>
where
    F: FnOnce() -> Result<ApiResponse<T>, E> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    T: Send + 'static,
{
    let call = tokio::task::spawn_blocking(move || {
        let outcome: anyhow::Result<ApiResponse<T>> = execute().map_err(Into::into);
        outcome
    });
    settle(call).await
}

/// Wait for a spawned call and normalize however it ended
async fn settle<T>(call: JoinHandle<anyhow::Result<ApiResponse<T>>>) -> NetworkResult<T> {
    match call.await {
        Ok(outcome) => normalize(outcome),
        Err(join_error) => NetworkResult::error(join_failure(join_error)),
    }
}

/// Map a finished call onto a [`NetworkResult`]
pub fn normalize<T>(outcome: anyhow::Result<ApiResponse<T>>) -> NetworkResult<T> {
    match outcome {
        Ok(response) if response.is_successful() => NetworkResult::success(response.body),
        Ok(response) => NetworkResult::error(api_exception(response)),
        Err(fault) => NetworkResult::error(classify(fault)),
    }
}

fn api_exception<T>(response: ApiResponse<T>) -> NetworkException {
    let code = response.code();
    let message = match response.error_body {
        Some(body) if !body.is_empty() => body,
        _ => response.message,
    };
    let error_response = match serde_json::from_str::<ErrorResponse>(&message) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(status = code, error = %e, "Failed to parse error response body");
            None
        }
    };
    NetworkException::Api {
        code,
        message,
        error_response,
    }
}

fn join_failure(error: JoinError) -> NetworkException {
    if error.is_cancelled() {
        return classify(CallFault::Cancelled(error.to_string()).into());
    }
    match error.try_into_panic() {
        Ok(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "Network call panicked");
            NetworkException::Default {
                cause: Some(anyhow::anyhow!("call panicked: {}", message)),
                message,
            }
        }
        Err(error) => classify(error.into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    }
}
