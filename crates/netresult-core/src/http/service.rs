//! Endpoint declarations and the service factory that calls them
//!
//! A [`ServiceFactory`] is what [`ServiceBuilder::build_service`] produces: a
//! middleware-wrapped reqwest client bound to a base URL, plus the converters
//! and call adapters registered on the builder. Endpoints are plain values
//! carrying their method, relative path and [`RequestPolicy`].
//!
//! [`ServiceBuilder::build_service`]: crate::http::ServiceBuilder::build_service

use std::fmt;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::http::adapter::{CallAdapterFactory, PendingCall};
use crate::http::converter::ConverterFactory;
use crate::http::fault::classify;
use crate::http::normalizer::handle_api;
use crate::http::policy::RequestPolicy;
use crate::http::response::ApiResponse;
use crate::http::timeout::TimeoutConfig;
use crate::result::NetworkResult;
use crate::{Error, Result};

/// One callable operation of a remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    method: Method,
    path: String,
    policy: RequestPolicy,
}

impl Endpoint {
    /// `path` is resolved against the service's base URL
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            policy: RequestPolicy::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_policy(mut self, policy: RequestPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }
}

/// Client bound to a base URL, cheap to clone
#[derive(Clone)]
pub struct ServiceFactory {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    client: ClientWithMiddleware,
    base_url: Url,
    timeouts: TimeoutConfig,
    converters: Vec<Arc<dyn ConverterFactory>>,
    call_adapters: Vec<Arc<dyn CallAdapterFactory>>,
}

impl ServiceFactory {
    pub(crate) fn new(
        client: ClientWithMiddleware,
        base_url: Url,
        timeouts: TimeoutConfig,
        converters: Vec<Arc<dyn ConverterFactory>>,
        call_adapters: Vec<Arc<dyn CallAdapterFactory>>,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                client,
                base_url,
                timeouts,
                converters,
                call_adapters,
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn client(&self) -> &ClientWithMiddleware {
        &self.inner.client
    }

    /// Timeouts the client was built with
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.inner.timeouts
    }

    /// Registered converter factories, in lookup order
    pub fn converter_names(&self) -> Vec<&'static str> {
        self.inner.converters.iter().map(|c| c.name()).collect()
    }

    /// Registered call adapter factories, innermost first
    pub fn call_adapter_names(&self) -> Vec<&'static str> {
        self.inner.call_adapters.iter().map(|a| a.name()).collect()
    }

    /// Absolute URL of `endpoint`
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url> {
        self.inner
            .base_url
            .join(endpoint.path())
            .map_err(|e| Error::Configuration {
                message: format!("Invalid endpoint path: {}", endpoint.path()),
                source: Some(e.into()),
            })
    }

    /// Start a request for `endpoint` with its policy attached
    pub fn request(&self, endpoint: &Endpoint) -> Result<RequestBuilder> {
        let url = self.url_for(endpoint)?;
        Ok(self
            .inner
            .client
            .request(endpoint.method().clone(), url)
            .with_extension(*endpoint.policy()))
    }

    /// Send `endpoint` with an optional body and decode the response
    pub async fn call<T>(&self, endpoint: &Endpoint, body: Option<Value>) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let mut builder = self.request(endpoint)?;
        if let Some(body) = body {
            let (bytes, content_type) = self.encode(&body)?;
            builder = builder.header(CONTENT_TYPE, content_type).body(bytes);
        }

        let mut pending: PendingCall = Box::pin(builder.send());
        for adapter in &self.inner.call_adapters {
            pending = adapter.adapt(endpoint, pending);
        }

        let response = pending.await?;
        ApiResponse::read_with(response, |content_type, bytes| {
            self.decode(content_type, bytes)
        })
        .await
    }

    /// [`call`](Self::call) wrapped in [`handle_api`]
    pub async fn execute<T>(&self, endpoint: &Endpoint, body: Option<Value>) -> NetworkResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let service = self.clone();
        let endpoint = endpoint.clone();
        handle_api(move || async move { service.call::<T>(&endpoint, body).await }).await
    }

    /// [`execute`](Self::execute) with a serializable body
    pub async fn execute_with<T, B>(&self, endpoint: &Endpoint, body: &B) -> NetworkResult<T>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
    {
        match serde_json::to_value(body) {
            Ok(value) => self.execute(endpoint, Some(value)).await,
            Err(e) => NetworkResult::error(classify(e.into())),
        }
    }

    fn encode(&self, value: &Value) -> Result<(Vec<u8>, &'static str)> {
        let converter = self
            .inner
            .converters
            .iter()
            .find(|c| c.can_encode(value))
            .ok_or_else(|| Error::Conversion {
                converter: "none".to_string(),
                message: "No converter can encode the request body".to_string(),
                source: None,
            })?;
        converter.encode(value)
    }

    fn decode<T: DeserializeOwned>(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<T> {
        let converter = self
            .inner
            .converters
            .iter()
            .find(|c| c.accepts(content_type))
            .ok_or_else(|| Error::Conversion {
                converter: "none".to_string(),
                message: format!(
                    "No converter for content type {}",
                    content_type.unwrap_or("<none>")
                ),
                source: None,
            })?;
        let value = converter.decode(bytes)?;
        serde_json::from_value(value).map_err(|e| Error::Conversion {
            converter: converter.name().to_string(),
            message: format!("Response body does not match the expected type: {}", e),
            source: Some(e.into()),
        })
    }
}

impl fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFactory")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeouts", &self.inner.timeouts)
            .field("converters", &self.converter_names())
            .field("call_adapters", &self.call_adapter_names())
            .finish()
    }
}
