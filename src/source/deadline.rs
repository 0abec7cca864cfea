//! A cancellable timer that bounds a single fetch.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::FetchError;

/// Bounds a future by a timeout and a [`CancellationToken`].
///
/// Whichever of the three finishes first wins.  When the timer fires, the
/// token is cancelled so every clone of it observes the abort, and the
/// guarded future is dropped before [`run`](Deadline::run) returns.  For an
/// HTTP request, dropping the future closes its connection.
#[derive(Debug, Clone)]
pub struct Deadline {
    timeout: Duration,
    token: CancellationToken,
}

impl Deadline {
    pub fn new(timeout: Duration, token: CancellationToken) -> Self {
        Self { timeout, token }
    }

    /// Drive `fut` to completion unless the timer fires or the token is
    /// cancelled first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, FetchError>
    where
        F: Future<Output = T>,
    {
        if self.token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FetchError::Cancelled),
            _ = tokio::time::sleep(self.timeout) => {
                self.token.cancel();
                Err(FetchError::Timeout(self.timeout))
            }
            out = fut => Ok(out),
        }
    }
}
