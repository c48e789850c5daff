//! Classification of call faults into the closed [`NetworkException`] set
//!
//! A fault is whatever the wrapped call failed with. Reqwest, middleware, std
//! I/O and tokio timer errors are recognised anywhere in the fault's source
//! chain; [`CallFault`] lets other transports (and tests) name a kind
//! explicitly. When several causes match, the most specific kind wins.

use std::error::Error as StdError;
use std::io;
use std::sync::OnceLock;

use regex::Regex;

use crate::result::NetworkException;

/// Faults a transport can raise to pick a classification explicitly
#[derive(Debug, thiserror::Error)]
pub enum CallFault {
    /// Connect, read or write timed out
    #[error("{0}")]
    Timeout(String),

    /// DNS lookup failed
    #[error("{0}")]
    UnresolvedHost(String),

    /// The call was cancelled before a response arrived
    #[error("{0}")]
    Cancelled(String),

    /// The call cannot be made in the current state
    #[error("{0}")]
    InvalidState(String),
}

/// Fault kinds, ordered from most to least specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FaultKind {
    NoConnectivity,
    UnresolvedHost,
    Io,
    InvalidState,
    Unclassified,
}

/// Map a fault onto a [`NetworkException`]
///
/// The exception message is the display text of the cause that decided the
/// classification, so wrappers added on the way up (context, transport
/// errors) do not leak into it. Unclassified faults keep their own text.
pub fn classify(fault: anyhow::Error) -> NetworkException {
    let decided = decisive_cause(fault.chain()).map(|(kind, cause)| (kind, cause.to_string()));
    let Some((kind, message)) = decided else {
        return NetworkException::Default {
            message: fault.to_string(),
            cause: Some(fault),
        };
    };
    match kind {
        FaultKind::NoConnectivity => NetworkException::NoInternet { message },
        FaultKind::UnresolvedHost => NetworkException::UnknownHost { message },
        FaultKind::Io => NetworkException::Io { message },
        FaultKind::InvalidState => NetworkException::IllegalState { message },
        FaultKind::Unclassified => NetworkException::Default {
            message,
            cause: Some(fault),
        },
    }
}

/// Most specific kind found anywhere in the fault's source chain
pub fn fault_kind(fault: &anyhow::Error) -> FaultKind {
    decisive_cause(fault.chain())
        .map(|(kind, _)| kind)
        .unwrap_or(FaultKind::Unclassified)
}

type Cause<'a> = &'a (dyn StdError + 'static);

/// The recognised cause with the most specific kind; the outermost one wins ties
fn decisive_cause<'a, I>(causes: I) -> Option<(FaultKind, Cause<'a>)>
where
    I: IntoIterator<Item = Cause<'a>>,
{
    causes
        .into_iter()
        .filter_map(recognise)
        .fold(None, |best: Option<(FaultKind, Cause<'a>)>, candidate| match best {
            Some(best) if best.0 <= candidate.0 => Some(best),
            _ => Some(candidate),
        })
}

fn recognise(cause: Cause<'_>) -> Option<(FaultKind, Cause<'_>)> {
    if let Some(fault) = cause.downcast_ref::<CallFault>() {
        let kind = match fault {
            CallFault::Timeout(_) => FaultKind::NoConnectivity,
            CallFault::UnresolvedHost(_) => FaultKind::UnresolvedHost,
            CallFault::Cancelled(_) => FaultKind::Io,
            CallFault::InvalidState(_) => FaultKind::InvalidState,
        };
        return Some((kind, cause));
    }
    if let Some(error) = cause.downcast_ref::<reqwest_middleware::Error>() {
        // Both variants are transparent, so their inner error never shows up
        // in the outer chain on its own.
        return match error {
            reqwest_middleware::Error::Reqwest(inner) => {
                let inner: Cause<'_> = inner;
                decisive_cause(std::iter::successors(Some(inner), |&e| e.source()))
            }
            reqwest_middleware::Error::Middleware(inner) => decisive_cause(inner.chain()),
        };
    }
    let kind = if let Some(error) = cause.downcast_ref::<reqwest::Error>() {
        reqwest_kind(error)
    } else if let Some(error) = cause.downcast_ref::<io::Error>() {
        io_kind(error)
    } else if cause.is::<tokio::time::error::Elapsed>() {
        FaultKind::NoConnectivity
    } else if cause
        .downcast_ref::<tokio::task::JoinError>()
        .is_some_and(|e| e.is_cancelled())
    {
        FaultKind::Io
    } else {
        return None;
    };
    (kind != FaultKind::Unclassified).then_some((kind, cause))
}

fn reqwest_kind(error: &reqwest::Error) -> FaultKind {
    if error.is_timeout() {
        FaultKind::NoConnectivity
    } else if error.is_connect() {
        if mentions_dns_failure(error) {
            FaultKind::UnresolvedHost
        } else {
            FaultKind::NoConnectivity
        }
    } else if error.is_builder() {
        FaultKind::InvalidState
    } else if error.is_request() || error.is_body() || error.is_redirect() {
        FaultKind::Io
    } else {
        FaultKind::Unclassified
    }
}

fn io_kind(error: &io::Error) -> FaultKind {
    match error.kind() {
        io::ErrorKind::TimedOut
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected => FaultKind::NoConnectivity,
        _ if dns_pattern().is_match(&error.to_string()) => FaultKind::UnresolvedHost,
        _ => FaultKind::Io,
    }
}

/// Hyper reports resolver failures only through message text
fn mentions_dns_failure(error: &(dyn StdError + 'static)) -> bool {
    let mut next: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(cause) = next {
        if dns_pattern().is_match(&cause.to_string()) {
            return true;
        }
        next = cause.source();
    }
    false
}

fn dns_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)dns error|failed to lookup address|name or service not known",
            r"|no such host|nodename nor servname|name resolution",
        ))
        .expect("Valid regex pattern")
    })
}
