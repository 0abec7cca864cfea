//! HTTP number source.
//!
//! Issues one `GET` per fetch against the source's endpoint and expects a
//! JSON body of the form `{ "numbers": [1, 2, 3] }`.  No retries happen here;
//! a retry is just another trigger from the controller.

use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{
    endpoint_for, Deadline, FetchError, FetchOutcome, NumberBatch, NumberSource, SourceId,
    BASE_URL, DEFAULT_TIMEOUT,
};

/// What to do with a body that has no usable `numbers` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyPolicy {
    /// Treat it as an empty batch.
    #[default]
    Lenient,
    /// Fail with [`FetchError::Malformed`].
    Strict,
}

#[derive(Debug, Deserialize)]
struct NumbersBody {
    numbers: Vec<i64>,
}

/// Number source backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    policy: BodyPolicy,
}

impl HttpSource {
    /// A source talking to the fixed upstream endpoints.
    pub fn new(timeout: Duration, policy: BodyPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            timeout,
            policy,
        }
    }

    /// Point every endpoint at another base URL.  Used by tests to talk to a
    /// local server.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn url(&self, source: SourceId) -> String {
        endpoint_for(&self.base_url, source)
    }

    /// Extract the `numbers` array from a response body.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing rules without a server.
    pub fn parse_body(body: &[u8], policy: BodyPolicy) -> FetchOutcome {
        match serde_json::from_slice::<NumbersBody>(body) {
            Ok(parsed) => Ok(parsed.numbers),
            Err(e) => match policy {
                BodyPolicy::Lenient => {
                    tracing::warn!(error = %e, "response has no usable `numbers`; using an empty batch");
                    Ok(NumberBatch::new())
                }
                BodyPolicy::Strict => Err(FetchError::Malformed(e.to_string())),
            },
        }
    }

    async fn get(&self, url: &str) -> FetchOutcome {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        let body = response.bytes().await?;
        Self::parse_body(&body, self.policy)
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, BodyPolicy::default())
    }
}

impl NumberSource for HttpSource {
    async fn fetch(&self, source: SourceId, cancel: CancellationToken) -> FetchOutcome {
        let url = self.url(source);
        tracing::debug!(%url, timeout_ms = self.timeout.as_millis() as u64, "fetching");

        let deadline = Deadline::new(self.timeout, cancel);
        deadline.run(self.get(&url)).await?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
