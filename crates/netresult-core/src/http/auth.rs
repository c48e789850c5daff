//! Re-authentication of rejected requests
//!
//! An [`Authenticator`] is consulted whenever the transport answers
//! `401 Unauthorized`. It may produce a replacement request (for example with
//! fresh credentials) or decline, in which case the 401 is returned as is.
//! Obtaining credentials is up to the authenticator; this module only wires it
//! into the middleware chain.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next};

/// Upper bound on re-authentication rounds for a single call
pub const MAX_AUTH_ATTEMPTS: usize = 3;

/// Trait for answering authentication challenges
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Produce a request to send instead of `request`, or `None` to give up
    async fn authenticate(
        &self,
        request: &Request,
        response: &Response,
    ) -> anyhow::Result<Option<Request>>;
}

/// Middleware that drives an [`Authenticator`] on 401 responses
pub(crate) struct AuthenticatorLayer {
    authenticator: Arc<dyn Authenticator>,
}

impl AuthenticatorLayer {
    pub(crate) fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl Middleware for AuthenticatorLayer {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        // Streaming bodies cannot be replayed, so those requests are never retried
        let mut rejected = req.try_clone();
        let mut response = next.clone().run(req, extensions).await?;
        let mut attempts = 0;

        while response.status() == StatusCode::UNAUTHORIZED && attempts < MAX_AUTH_ATTEMPTS {
            let Some(request) = rejected.take() else {
                break;
            };
            let retry = self
                .authenticator
                .authenticate(&request, &response)
                .await
                .map_err(reqwest_middleware::Error::Middleware)?;
            let Some(retry) = retry else {
                tracing::debug!(url = %request.url(), "Authenticator declined challenge");
                break;
            };

            attempts += 1;
            tracing::debug!(
                url = %retry.url(),
                attempt = attempts,
                "Retrying with new credentials"
            );
            rejected = retry.try_clone();
            response = next.clone().run(retry, extensions).await?;
        }

        Ok(response)
    }
}

type TokenSource = dyn Fn() -> Option<String> + Send + Sync;

/// Authenticator that re-sends a rejected request with a bearer token
///
/// Gives up when no token is available or when the rejected request already
/// carried the current token.
#[derive(Clone)]
pub struct BearerAuthenticator {
    token: Arc<TokenSource>,
}

impl BearerAuthenticator {
    /// Create with a token source, called once per challenge
    pub fn new<F>(token: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self {
            token: Arc::new(token),
        }
    }

    /// Read the token from an environment variable at challenge time
    pub fn from_env(var: impl Into<String>) -> Self {
        let var = var.into();
        Self::new(move || std::env::var(&var).ok())
    }
}

impl fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthenticator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    async fn authenticate(
        &self,
        request: &Request,
        _response: &Response,
    ) -> anyhow::Result<Option<Request>> {
        let Some(token) = (self.token)() else {
            return Ok(None);
        };
        let value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        if request.headers().get(AUTHORIZATION) == Some(&value) {
            return Ok(None);
        }
        let Some(mut retry) = request.try_clone() else {
            return Ok(None);
        };
        retry.headers_mut().insert(AUTHORIZATION, value);
        Ok(Some(retry))
    }
}
