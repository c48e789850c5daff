//! Call adapters
//!
//! A call adapter wraps the pending transport call of an endpoint in another
//! future. Adapters are applied in registration order, so the first one
//! registered sits closest to the transport.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::http::service::Endpoint;

/// A transport call that has not completed yet
pub type PendingCall =
    Pin<Box<dyn Future<Output = reqwest_middleware::Result<reqwest::Response>> + Send + 'static>>;

/// Plugin that wraps pending calls
pub trait CallAdapterFactory: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn adapt(&self, endpoint: &Endpoint, call: PendingCall) -> PendingCall;
}

/// Runs each call inside a `tracing` span and logs status and latency
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCallAdapter;

impl CallAdapterFactory for TracingCallAdapter {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn adapt(&self, endpoint: &Endpoint, call: PendingCall) -> PendingCall {
        let span = tracing::info_span!(
            "http_call",
            method = %endpoint.method(),
            path = %endpoint.path(),
        );
        Box::pin(
            async move {
                let started = Instant::now();
                let result = call.await;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        tracing::debug!(status, elapsed_ms, "Call finished")
                    }
                    Err(e) => tracing::debug!(error = %e, elapsed_ms, "Call failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Fails the call when it does not complete within `timeout`
#[derive(Debug, Clone, Copy)]
pub struct DeadlineCallAdapter {
    timeout: Duration,
}

impl DeadlineCallAdapter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CallAdapterFactory for DeadlineCallAdapter {
    fn name(&self) -> &'static str {
        "deadline"
    }

    fn adapt(&self, _endpoint: &Endpoint, call: PendingCall) -> PendingCall {
        let timeout = self.timeout;
        Box::pin(async move {
            match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(elapsed) => Err(reqwest_middleware::Error::Middleware(elapsed.into())),
            }
        })
    }
}
