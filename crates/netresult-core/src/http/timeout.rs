//! Timeout configuration for HTTP clients
//!
//! Call, connect and read timeouts map directly onto reqwest's client builder.
//! Reqwest has no write-phase timeout, so the write timeout is enforced by
//! [`WriteDeadline`], a middleware that bounds how long the transport takes to
//! consume the request body. Waiting for the response is left to the read and
//! call timeouts.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use http::Extensions;
use reqwest::header::{HeaderValue, CONTENT_LENGTH};
use reqwest::Body;
use reqwest_middleware::{Middleware, Next};
use serde::{Deserialize, Serialize};

use crate::http::fault::CallFault;

/// Size of the pieces a request body is handed to the transport in
const BODY_CHUNK_SIZE: usize = 16 * 1024;

/// Timeout configuration for a client; `None` leaves a phase unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole call, from sending the request to reading the full body
    #[serde(rename = "call_ms", with = "millis")]
    pub call: Option<Duration>,
    /// Establishing the TCP/TLS connection
    #[serde(rename = "connect_ms", with = "millis")]
    pub connect: Option<Duration>,
    /// Idle time between reads of the response
    #[serde(rename = "read_ms", with = "millis")]
    pub read: Option<Duration>,
    /// Transmitting the request body
    #[serde(rename = "write_ms", with = "millis")]
    pub write: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call: None,
            connect: Some(Duration::from_secs(10)),
            read: Some(Duration::from_secs(10)),
            write: None,
        }
    }
}

impl TimeoutConfig {
    /// No timeouts at all
    pub fn unbounded() -> Self {
        Self {
            call: None,
            connect: None,
            read: None,
            write: None,
        }
    }

    pub fn with_call(mut self, timeout: Duration) -> Self {
        self.call = Some(timeout);
        self
    }

    pub fn with_connect(mut self, timeout: Duration) -> Self {
        self.connect = Some(timeout);
        self
    }

    pub fn with_read(mut self, timeout: Duration) -> Self {
        self.read = Some(timeout);
        self
    }

    pub fn with_write(mut self, timeout: Duration) -> Self {
        self.write = Some(timeout);
        self
    }

    /// Validate timeout configuration
    pub fn validate(&self) -> Result<(), String> {
        let phases = [
            ("Call", self.call),
            ("Connect", self.connect),
            ("Read", self.read),
            ("Write", self.write),
        ];
        for (name, timeout) in phases {
            if timeout.is_some_and(|t| t.is_zero()) {
                return Err(format!("{} timeout cannot be zero", name));
            }
        }
        Ok(())
    }

    /// Apply call, connect and read timeouts to a reqwest builder
    pub(crate) fn apply(&self, mut builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        if let Some(call) = self.call {
            builder = builder.timeout(call);
        }
        if let Some(connect) = self.connect {
            builder = builder.connect_timeout(connect);
        }
        if let Some(read) = self.read {
            builder = builder.read_timeout(read);
        }
        builder
    }
}

/// Bounds the time the transport takes to consume a request body
///
/// The body is re-wrapped as a stream of chunks so the middleware can tell
/// when the transport has pulled the last one. If the deadline passes first,
/// the call fails with [`CallFault::Timeout`]; after that point the response is
/// awaited without this deadline. Requests without an in-memory body pass
/// through untouched.
#[derive(Debug, Clone, Copy)]
pub struct WriteDeadline {
    timeout: Duration,
}

impl WriteDeadline {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Middleware for WriteDeadline {
    async fn handle(
        &self,
        mut req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let chunks: Option<Vec<Vec<u8>>> = req
            .body()
            .and_then(Body::as_bytes)
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| bytes.chunks(BODY_CHUNK_SIZE).map(<[u8]>::to_vec).collect());
        let Some(chunks) = chunks else {
            return next.run(req, extensions).await;
        };

        let length: usize = chunks.iter().map(Vec::len).sum();
        let sent = Arc::new(AtomicBool::new(false));
        *req.body_mut() = Some(Body::wrap_stream(body_stream(chunks, Arc::clone(&sent))));
        req.headers_mut()
            .entry(CONTENT_LENGTH)
            .or_insert_with(|| HeaderValue::from(length));

        let url = req.url().clone();
        let call = next.run(req, extensions);
        tokio::pin!(call);
        tokio::select! {
            result = &mut call => result,
            _ = tokio::time::sleep(self.timeout) => {
                if sent.load(Ordering::Acquire) {
                    call.await
                } else {
                    tracing::debug!(%url, timeout = ?self.timeout, "Write deadline elapsed");
                    let message = format!("Write timed out after {} ms", self.timeout.as_millis());
                    Err(reqwest_middleware::Error::Middleware(CallFault::Timeout(message).into()))
                }
            }
        }
    }
}

/// Yields `chunks` in order and raises `sent` when the last one is pulled
fn body_stream(
    chunks: Vec<Vec<u8>>,
    sent: Arc<AtomicBool>,
) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static {
    futures_util::stream::unfold(chunks.into_iter(), move |mut chunks| {
        let sent = Arc::clone(&sent);
        async move {
            let chunk = chunks.next();
            if chunks.len() == 0 {
                sent.store(true, Ordering::Release);
            }
            chunk.map(|chunk| (Ok::<_, io::Error>(chunk), chunks))
        }
    })
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
