//! HTTP layer over reqwest
//!
//! This module provides:
//! - A fluent builder for middleware-wrapped reqwest clients bound to a base URL
//! - Per-endpoint request policies carried in request extensions
//! - Authenticator, converter and call adapter plugins
//! - Normalization of any call outcome into a `NetworkResult`

pub mod adapter;
pub mod auth;
pub mod builder;
pub mod converter;
pub mod fault;
pub mod normalizer;
pub mod policy;
pub mod response;
pub mod service;
pub mod timeout;

pub use adapter::{CallAdapterFactory, DeadlineCallAdapter, PendingCall, TracingCallAdapter};
pub use auth::{Authenticator, BearerAuthenticator, MAX_AUTH_ATTEMPTS};
pub use builder::ServiceBuilder;
pub use converter::{ConverterFactory, JsonConverter, ScalarsConverter};
pub use fault::{classify, CallFault};
pub use normalizer::{handle_api, handle_api_blocking, normalize};
pub use policy::{
    cache_max_age, is_access_token_required, is_login_required, CacheRequest, LoginRequired,
    NeedsAccessToken, RequestPolicy, DEFAULT_CACHE_MAX_AGE_SECS,
};
pub use response::ApiResponse;
pub use service::{Endpoint, ServiceFactory};
pub use timeout::{TimeoutConfig, WriteDeadline};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
