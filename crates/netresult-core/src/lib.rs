//! Netresult Core - configurable HTTP clients with normalized call outcomes
//!
//! This crate wraps `reqwest` (and `reqwest-middleware` for the interceptor
//! chain) in a thin configuration layer and folds the outcome of every call
//! into a [`NetworkResult`].
//!
//! # Main Components
//!
//! - **Result model**: [`NetworkResult`] and the closed [`NetworkException`] taxonomy
//! - **Normalizer**: [`handle_api`] runs a call and never fails
//! - **Builder**: [`ServiceBuilder`] configures timeouts, cookies, interceptors,
//!   authenticator, cache, converters and call adapters
//! - **Policies**: [`RequestPolicy`] flags attached to each [`Endpoint`]
//! - **Configuration**: [`ClientConfig`] loaded from TOML and the environment
//!
//! # Example
//!
//! ```no_run
//! use netresult_core::{Endpoint, NetworkResult, RequestPolicy, ServiceBuilder};
//! use std::time::Duration;
//!
//! # async fn example() -> netresult_core::Result<()> {
//! let service = ServiceBuilder::new()
//!     .connect_timeout(Duration::from_secs(5))
//!     .build_service("https://api.example.com/v1/")?;
//!
//! let profile = Endpoint::get("me").with_policy(RequestPolicy::new().login_required(true));
//! match service.execute::<serde_json::Value>(&profile, None).await {
//!     NetworkResult::Success { data } => println!("{:?}", data),
//!     NetworkResult::Error { exception } => {
//!         eprintln!("{} ({})", exception, exception.error_code())
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod result;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use http::{
    handle_api, handle_api_blocking, normalize, ApiResponse, Endpoint, RequestPolicy,
    ServiceBuilder, ServiceFactory, TimeoutConfig,
};
pub use result::{ErrorResponse, NetworkException, NetworkResult, SOCKET_TIMEOUT_MESSAGE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
