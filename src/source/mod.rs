//! Number source abstraction layer.
//!
//! This module defines the [`SourceId`] table of upstream number services,
//! the [`NumberSource`] trait, and the error type a fetch can fail with.  The
//! HTTP implementation lives in [`http`]; the timer that bounds every fetch
//! lives in [`deadline`].
//!
//! ## For contributors — adding a new source
//!
//! 1. Add a variant to [`SourceId`] and fill in every `match` below.
//! 2. Bind a key to it in `input.rs`.
//!
//! The controller, window, and UI are all source-agnostic.

mod deadline;
mod http;

pub use deadline::Deadline;
pub use http::{BodyPolicy, HttpSource};

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Base URL shared by every upstream number service.
pub const BASE_URL: &str = "http://20.244.56.144/evaluation-service";

/// The integers returned by one fetch, in the order they were received.
pub type NumberBatch = Vec<i64>;

/// Result of one fetch.
pub type FetchOutcome = Result<NumberBatch, FetchError>;

/// Which upstream generator to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceId {
    #[default]
    Prime,
    Fibonacci,
    Even,
    Random,
}

impl SourceId {
    pub const ALL: [SourceId; 4] = [
        SourceId::Prime,
        SourceId::Fibonacci,
        SourceId::Even,
        SourceId::Random,
    ];

    /// Single-letter id used on the command line and as a key binding.
    pub fn letter(self) -> char {
        match self {
            SourceId::Prime => 'p',
            SourceId::Fibonacci => 'f',
            SourceId::Even => 'e',
            SourceId::Random => 'r',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceId::Prime => "Prime Numbers",
            SourceId::Fibonacci => "Fibonacci Numbers",
            SourceId::Even => "Even Numbers",
            SourceId::Random => "Random Numbers",
        }
    }

    /// Path segment of this source's endpoint.
    pub fn path(self) -> &'static str {
        match self {
            SourceId::Prime => "primes",
            SourceId::Fibonacci => "fibo",
            SourceId::Even => "even",
            SourceId::Random => "rand",
        }
    }

    /// The fixed endpoint URL for this source.
    pub fn endpoint(self) -> String {
        endpoint_for(BASE_URL, self)
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.letter() == c)
    }
}

pub(crate) fn endpoint_for(base: &str, source: SourceId) -> String {
    format!("{}/{}", base.trim_end_matches('/'), source.path())
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown number source '{0}' (expected one of p, f, e, r)")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    /// Accepts the single letter or the endpoint path, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|src| lower == src.path() || lower.chars().eq([src.letter()]))
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// Why a fetch failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No complete response within the deadline.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The server answered with a non-2xx status.
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// Connection, TLS, or body-read failure.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body had no usable `numbers` array (strict body policy only).
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The cancellation token was fired by someone other than the timer.
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }

    /// Message shown to the user.  Timeouts get their own wording so they
    /// are distinguishable from every other failure.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Timeout(limit) => {
                format!("Request timed out ({}ms)", limit.as_millis())
            }
            other => other.to_string(),
        }
    }
}

/// Anything that can produce a [`NumberBatch`] for a [`SourceId`].
///
/// Implementations must honour `cancel`: once it fires, the returned future
/// resolves promptly and any network resources it held are released.
pub trait NumberSource: Send + Sync {
    fn fetch(
        &self,
        source: SourceId,
        cancel: CancellationToken,
    ) -> impl Future<Output = FetchOutcome> + Send;
}
