//! Fluent configuration of HTTP clients
//!
//! `ServiceBuilder` collects transport settings and plugins, then
//! [`build_service`](ServiceBuilder::build_service) turns them into a reqwest
//! client wrapped in a middleware stack and bound to a base URL. Single-valued
//! setters keep the last value they were given; converters and call adapters
//! accumulate in insertion order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::Middleware;
use url::Url;

use crate::config::ClientConfig;
use crate::http::adapter::CallAdapterFactory;
use crate::http::auth::{Authenticator, AuthenticatorLayer};
use crate::http::converter::{ConverterFactory, JsonConverter};
use crate::http::service::ServiceFactory;
use crate::http::timeout::{TimeoutConfig, WriteDeadline};
use crate::{Error, Result};

/// How the client keeps cookies between calls
#[derive(Clone, Default)]
enum Cookies {
    #[default]
    Disabled,
    InMemory,
    Shared(Arc<dyn CookieStore>),
}

/// Adapts a type-erased store to reqwest's sized `cookie_provider` parameter
struct SharedCookieStore(Arc<dyn CookieStore>);

impl CookieStore for SharedCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.0.set_cookies(cookie_headers, url)
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.0.cookies(url)
    }
}

/// Builder for [`ServiceFactory`]
#[derive(Default)]
pub struct ServiceBuilder {
    cookies: Cookies,
    authenticator: Option<Arc<dyn Authenticator>>,
    interceptor: Option<Arc<dyn Middleware>>,
    network_interceptor: Option<Arc<dyn Middleware>>,
    cache: Option<Arc<dyn Middleware>>,
    timeouts: TimeoutConfig,
    user_agent: Option<String>,
    default_headers: Vec<(String, String)>,
    converters: Vec<Arc<dyn ConverterFactory>>,
    call_adapters: Vec<Arc<dyn CallAdapterFactory>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::new()
            .timeouts(config.timeouts)
            .cookie_store(config.cookie_store);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        for (name, value) in &config.default_headers {
            builder = builder.default_header(name.clone(), value.clone());
        }
        builder
    }

    /// Persist cookies in `jar`, which callers may share between clients
    pub fn cookie_jar<C: CookieStore + 'static>(mut self, jar: Arc<C>) -> Self {
        self.cookies = Cookies::Shared(jar);
        self
    }

    /// Enable or disable a private in-memory cookie store
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.cookies = if enabled {
            Cookies::InMemory
        } else {
            Cookies::Disabled
        };
        self
    }

    /// Consulted when the server answers 401
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Outermost middleware: sees each call once, before authentication and caching
    pub fn interceptor(mut self, interceptor: Arc<dyn Middleware>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Innermost middleware: sees every request that actually reaches the transport
    pub fn network_interceptor(mut self, interceptor: Arc<dyn Middleware>) -> Self {
        self.network_interceptor = Some(interceptor);
        self
    }

    /// Response cache layer, e.g. a caching middleware backed by a store
    pub fn cache(mut self, cache: Arc<dyn Middleware>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.call = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read = Some(timeout);
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.write = Some(timeout);
        self
    }

    /// Replace all four timeouts at once
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Header sent with every request; invalid names or values fail `build_service`
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn add_converter_factory(mut self, factory: Arc<dyn ConverterFactory>) -> Self {
        self.converters.push(factory);
        self
    }

    pub fn add_call_adapter_factory(mut self, factory: Arc<dyn CallAdapterFactory>) -> Self {
        self.call_adapters.push(factory);
        self
    }

    /// Build the client and bind it to `base_url`
    ///
    /// Middleware runs outermost first: interceptor, authenticator, cache,
    /// network interceptor, write deadline. Without any registered converter a
    /// [`JsonConverter`] is used.
    pub fn build_service(self, base_url: &str) -> Result<ServiceFactory> {
        let base_url = Url::parse(base_url).map_err(|source| Error::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        let mut builder = self.timeouts.apply(reqwest::Client::builder());
        builder = match self.cookies {
            Cookies::Disabled => builder,
            Cookies::InMemory => builder.cookie_provider(Arc::new(Jar::default())),
            Cookies::Shared(store) => builder.cookie_provider(Arc::new(SharedCookieStore(store))),
        };
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        if !self.default_headers.is_empty() {
            builder = builder.default_headers(header_map(&self.default_headers)?);
        }
        let client = builder.build().map_err(|source| Error::ClientBuild { source })?;

        let mut stack = reqwest_middleware::ClientBuilder::new(client);
        if let Some(interceptor) = self.interceptor {
            stack = stack.with_arc(interceptor);
        }
        if let Some(authenticator) = self.authenticator {
            stack = stack.with(AuthenticatorLayer::new(authenticator));
        }
        if let Some(cache) = self.cache {
            stack = stack.with_arc(cache);
        }
        if let Some(interceptor) = self.network_interceptor {
            stack = stack.with_arc(interceptor);
        }
        if let Some(write) = self.timeouts.write {
            stack = stack.with(WriteDeadline::new(write));
        }

        let mut converters = self.converters;
        if converters.is_empty() {
            converters.push(Arc::new(JsonConverter));
        }

        let factory = ServiceFactory::new(
            stack.build(),
            base_url,
            self.timeouts,
            converters,
            self.call_adapters,
        );
        tracing::debug!(
            base_url = %factory.base_url(),
            converters = ?factory.converter_names(),
            call_adapters = ?factory.call_adapter_names(),
            "Built service factory"
        );
        Ok(factory)
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::Configuration {
                message: format!("Invalid header name: {}", name),
                source: Some(e.into()),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| Error::Configuration {
            message: format!("Invalid value for header {}", name),
            source: Some(e.into()),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

impl fmt::Debug for ServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBuilder")
            .field("timeouts", &self.timeouts)
            .field("authenticator", &self.authenticator.is_some())
            .field("interceptor", &self.interceptor.is_some())
            .field("network_interceptor", &self.network_interceptor.is_some())
            .field("cache", &self.cache.is_some())
            .field("converters", &self.converters)
            .field("call_adapters", &self.call_adapters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::adapter::{DeadlineCallAdapter, TracingCallAdapter};
    use crate::http::converter::ScalarsConverter;

    #[test]
    fn test_last_timeout_wins() {
        let service = ServiceBuilder::new()
            .connect_timeout(Duration::from_secs(1))
            .connect_timeout(Duration::from_secs(2))
            .call_timeout(Duration::from_secs(5))
            .call_timeout(Duration::from_secs(7))
            .build_service("https://api.example.com/")
            .unwrap();
        assert_eq!(service.timeouts().connect, Some(Duration::from_secs(2)));
        assert_eq!(service.timeouts().call, Some(Duration::from_secs(7)));
        assert_eq!(service.timeouts().read, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_factories_keep_insertion_order() {
        let service = ServiceBuilder::new()
            .add_converter_factory(Arc::new(ScalarsConverter))
            .add_converter_factory(Arc::new(JsonConverter))
            .add_call_adapter_factory(Arc::new(DeadlineCallAdapter::new(Duration::from_secs(1))))
            .add_call_adapter_factory(Arc::new(TracingCallAdapter))
            .build_service("https://api.example.com/")
            .unwrap();
        assert_eq!(service.converter_names(), vec!["scalars", "json"]);
        assert_eq!(service.call_adapter_names(), vec!["deadline", "tracing"]);
    }

    #[test]
    fn test_json_converter_is_the_fallback() {
        let service = ServiceBuilder::new()
            .build_service("https://api.example.com/")
            .unwrap();
        assert_eq!(service.converter_names(), vec!["json"]);
        assert!(service.call_adapter_names().is_empty());
    }

    #[test]
    fn test_malformed_base_url() {
        let err = ServiceBuilder::new().build_service("api.example.com").unwrap_err();
        assert!(matches!(err, Error::InvalidBaseUrl { ref url, .. } if url == "api.example.com"));
    }

    #[test]
    fn test_invalid_default_header() {
        let err = ServiceBuilder::new()
            .default_header("bad header", "x")
            .build_service("https://api.example.com/")
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_from_config() {
        let config = ClientConfig {
            user_agent: Some("netresult-test".to_string()),
            timeouts: TimeoutConfig::unbounded().with_read(Duration::from_millis(300)),
            ..ClientConfig::default()
        };
        let service = ServiceBuilder::from_config(&config)
            .build_service("https://api.example.com/v1/")
            .unwrap();
        assert_eq!(service.timeouts().read, Some(Duration::from_millis(300)));
        assert_eq!(service.timeouts().connect, None);
        assert_eq!(service.base_url().as_str(), "https://api.example.com/v1/");
    }
}
