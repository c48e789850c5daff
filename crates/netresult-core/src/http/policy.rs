//! Per-endpoint request policies
//!
//! Policies are declared once on an [`Endpoint`](crate::http::Endpoint) and
//! travel with every request made for it as an `http::Extensions` entry.
//! Middleware reads them through the predicates below; enforcing them
//! (attaching tokens, refusing anonymous calls, rewriting cache headers) is
//! the middleware's business.

use http::Extensions;

/// Default cache lifetime, in seconds
pub const DEFAULT_CACHE_MAX_AGE_SECS: u32 = 1800;

/// Responses for this endpoint may be cached for `max_age_secs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheRequest {
    pub max_age_secs: u32,
}

impl Default for CacheRequest {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
        }
    }
}

/// The endpoint requires a logged-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginRequired(pub bool);

impl Default for LoginRequired {
    fn default() -> Self {
        LoginRequired(true)
    }
}

/// The endpoint requires an access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedsAccessToken(pub bool);

impl Default for NeedsAccessToken {
    fn default() -> Self {
        NeedsAccessToken(true)
    }
}

/// Policy flags declared for one endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestPolicy {
    pub cache: Option<CacheRequest>,
    pub login: Option<LoginRequired>,
    pub access_token: Option<NeedsAccessToken>,
}

impl RequestPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache responses for the default 1800 seconds
    pub fn cached(mut self) -> Self {
        self.cache = Some(CacheRequest::default());
        self
    }

    pub fn cache_max_age(mut self, max_age_secs: u32) -> Self {
        self.cache = Some(CacheRequest { max_age_secs });
        self
    }

    pub fn login_required(mut self, required: bool) -> Self {
        self.login = Some(LoginRequired(required));
        self
    }

    pub fn needs_access_token(mut self, required: bool) -> Self {
        self.access_token = Some(NeedsAccessToken(required));
        self
    }

    pub fn is_login_required(&self) -> bool {
        self.login.is_some_and(|LoginRequired(required)| required)
    }

    pub fn is_access_token_required(&self) -> bool {
        self.access_token
            .is_some_and(|NeedsAccessToken(required)| required)
    }

    pub fn max_age_secs(&self) -> Option<u32> {
        self.cache.map(|cache| cache.max_age_secs)
    }
}

/// Policy attached to an in-flight request, if any
pub fn policy(extensions: &Extensions) -> Option<&RequestPolicy> {
    extensions.get::<RequestPolicy>()
}

/// Does the request's endpoint require a logged-in user
pub fn is_login_required(extensions: &Extensions) -> bool {
    policy(extensions).is_some_and(RequestPolicy::is_login_required)
}

/// Does the request's endpoint require an access token
pub fn is_access_token_required(extensions: &Extensions) -> bool {
    policy(extensions).is_some_and(RequestPolicy::is_access_token_required)
}

/// Cache lifetime declared for the request's endpoint
pub fn cache_max_age(extensions: &Extensions) -> Option<u32> {
    policy(extensions).and_then(RequestPolicy::max_age_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions_with(policy: RequestPolicy) -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(policy);
        extensions
    }

    #[test]
    fn test_absent_policy_is_false() {
        let extensions = Extensions::new();
        assert!(!is_login_required(&extensions));
        assert!(!is_access_token_required(&extensions));
        assert_eq!(cache_max_age(&extensions), None);
    }

    #[test]
    fn test_absent_flag_is_false() {
        let extensions = extensions_with(RequestPolicy::new().cached());
        assert!(!is_login_required(&extensions));
        assert!(!is_access_token_required(&extensions));
        assert_eq!(cache_max_age(&extensions), Some(1800));
    }

    #[test]
    fn test_present_flag_returns_its_value() {
        let extensions = extensions_with(
            RequestPolicy::new()
                .login_required(true)
                .needs_access_token(false),
        );
        assert!(is_login_required(&extensions));
        assert!(!is_access_token_required(&extensions));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(LoginRequired::default(), LoginRequired(true));
        assert_eq!(NeedsAccessToken::default(), NeedsAccessToken(true));
        assert_eq!(CacheRequest::default().max_age_secs, DEFAULT_CACHE_MAX_AGE_SECS);
        assert_eq!(RequestPolicy::new().cache_max_age(60).max_age_secs(), Some(60));
    }
}
