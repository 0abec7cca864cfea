//! The fetch-cycle state machine.
//!
//! ```text
//!            trigger / select_source
//!   Idle ───────────────────────────► Fetching ──Ok(batch)──► Idle (+ Snapshot)
//!    ▲                                 │   ▲
//!    │                                 │   └── trigger ignored while in flight
//!    │                          Err(e) ▼
//!    └──────────── trigger ◄──────── Error(message)
//! ```
//!
//! The [`Controller`] is the only writer of the [`Window`].  It never awaits
//! anything itself: [`trigger`](Controller::trigger) hands out a
//! [`FetchRequest`], whoever runs the fetch reports back through
//! [`complete`](Controller::complete), and the merge happens there.  Only one
//! request is ever in flight; triggers that arrive in the meantime are
//! ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::average::{average, Average};
use crate::config::Config;
use crate::source::{FetchOutcome, NumberBatch, SourceId};
use crate::window::{self, Capacity, Window};

/// Where the controller is in its cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Nothing in flight.
    Idle,
    /// One fetch in flight.
    Fetching { cycle: u64, source: SourceId },
    /// The last cycle failed.  The message is kept until the next trigger.
    Error { message: String },
}

/// Everything needed to run one fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub cycle: u64,
    pub source: SourceId,
    /// Cancelled by the fetch's own timer, or by
    /// [`Controller::cancel_in_flight`].
    pub cancel: CancellationToken,
}

/// Immutable record of one completed fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub source: SourceId,
    pub previous_window: Window,
    pub current_window: Window,
    /// The batch exactly as received, duplicates included.
    pub received: NumberBatch,
    pub average: Average,
    pub fetched_at: DateTime<Utc>,
}

/// What a finished cycle publishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Snapshot(Arc<Snapshot>),
    Error(String),
}

#[derive(Debug)]
pub struct Controller {
    window: Window,
    source: SourceId,
    phase: Phase,
    snapshot: Option<Arc<Snapshot>>,
    cycles: u64,
    in_flight: Option<CancellationToken>,
}

impl Controller {
    pub fn new(source: SourceId, capacity: Capacity) -> Self {
        Self {
            window: Window::new(capacity),
            source,
            phase: Phase::Idle,
            snapshot: None,
            cycles: 0,
            in_flight: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.source, config.capacity)
    }

    // -- accessors -----------------------------------------------------------

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn capacity(&self) -> Capacity {
        self.window.capacity()
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.phase, Phase::Fetching { .. })
    }

    /// The latest published snapshot, if any cycle has succeeded yet.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    // -- inbound -------------------------------------------------------------

    /// Switch to `source` and start a fetch for it.
    ///
    /// Re-selecting the current source does nothing.  While a fetch is in
    /// flight the selection is recorded but no new fetch starts.
    pub fn select_source(&mut self, source: SourceId) -> Option<FetchRequest> {
        if source == self.source {
            return None;
        }
        tracing::info!(from = %self.source, to = %source, "source changed");
        self.source = source;
        self.trigger()
    }

    /// Start a fetch for the current source (manual fetch or retry).
    ///
    /// Returns `None` if a fetch is already in flight.
    pub fn trigger(&mut self) -> Option<FetchRequest> {
        if let Phase::Fetching { cycle, .. } = self.phase {
            tracing::debug!(cycle, "fetch already in flight; trigger ignored");
            return None;
        }

        self.cycles += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        self.phase = Phase::Fetching {
            cycle: self.cycles,
            source: self.source,
        };
        tracing::debug!(cycle = self.cycles, source = %self.source, "fetch started");

        Some(FetchRequest {
            cycle: self.cycles,
            source: self.source,
            cancel,
        })
    }

    /// Change the window capacity.  Shrinking drops the oldest values.
    pub fn set_capacity(&mut self, capacity: Capacity) {
        if capacity == self.capacity() {
            return;
        }
        let before = self.window.len();
        self.window = window::set_capacity(&self.window, capacity);
        tracing::info!(
            %capacity,
            dropped = before - self.window.len(),
            "capacity changed"
        );
    }

    /// Cancel the in-flight fetch, if any.  Its completion still arrives
    /// through [`complete`](Self::complete), as a cancellation error.
    pub fn cancel_in_flight(&mut self) {
        if let Some(token) = &self.in_flight {
            token.cancel();
        }
    }

    // -- outbound ------------------------------------------------------------

    /// Finish cycle `cycle` with `outcome`.
    ///
    /// A successful batch is merged into the window and published as a new
    /// [`Snapshot`].  A failure leaves the window untouched.  Completions for
    /// any cycle other than the one in flight are discarded.
    pub fn complete(&mut self, cycle: u64, outcome: FetchOutcome) -> Option<Update> {
        let source = match self.phase {
            Phase::Fetching { cycle: current, source } if current == cycle => source,
            _ => {
                tracing::warn!(cycle, "completion for a cycle that is not in flight; discarded");
                return None;
            }
        };
        self.in_flight = None;

        match outcome {
            Ok(batch) => {
                let merged = window::merge(&self.window, &batch);
                let avg = average(&merged.current);
                tracing::info!(
                    cycle,
                    %source,
                    received = batch.len(),
                    evicted = ?merged.evicted,
                    window = merged.current.len(),
                    average = %avg,
                    "fetch merged"
                );

                self.window = merged.current.clone();
                let snapshot = Arc::new(Snapshot {
                    source,
                    previous_window: merged.previous,
                    current_window: merged.current,
                    received: batch,
                    average: avg,
                    fetched_at: Utc::now(),
                });
                self.snapshot = Some(snapshot.clone());
                self.phase = Phase::Idle;
                Some(Update::Snapshot(snapshot))
            }
            Err(e) => {
                tracing::warn!(cycle, %source, timeout = e.is_timeout(), error = %e, "fetch failed");
                let message = e.user_message();
                self.phase = Phase::Error {
                    message: message.clone(),
                };
                Some(Update::Error(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Deadline, FetchError, NumberSource};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Hands out scripted outcomes in order.
    struct Scripted(Mutex<VecDeque<FetchOutcome>>);

    impl Scripted {
        fn new(outcomes: impl IntoIterator<Item = FetchOutcome>) -> Self {
            Self(Mutex::new(outcomes.into_iter().collect()))
        }
    }

    impl NumberSource for Scripted {
        async fn fetch(&self, _source: SourceId, _cancel: CancellationToken) -> FetchOutcome {
            self.0.lock().unwrap().pop_front().unwrap_or(Ok(vec![]))
        }
    }

    /// Never answers before the deadline.
    struct Slow {
        timeout: Duration,
    }

    impl NumberSource for Slow {
        async fn fetch(&self, _source: SourceId, cancel: CancellationToken) -> FetchOutcome {
            Deadline::new(self.timeout, cancel)
                .run(async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    vec![1, 2, 3]
                })
                .await
        }
    }

    fn cap(n: usize) -> Capacity {
        Capacity::new(n).unwrap()
    }

    /// Trigger, fetch, and complete in one go, the way the poller does it.
    async fn run_cycle<S: NumberSource>(c: &mut Controller, numbers: &S) -> Option<Update> {
        let request = c.trigger()?;
        let outcome = numbers.fetch(request.source, request.cancel).await;
        c.complete(request.cycle, outcome)
    }

    fn error(c: &Controller) -> Option<&str> {
        match c.phase() {
            Phase::Error { message } => Some(message),
            _ => None,
        }
    }

    fn controller(capacity: usize) -> Controller {
        Controller::new(SourceId::Prime, cap(capacity))
    }

    fn seed(c: &mut Controller, values: &[i64]) {
        let req = c.trigger().unwrap();
        c.complete(req.cycle, Ok(values.to_vec())).unwrap();
    }

    fn expect_snapshot(update: Option<Update>) -> Arc<Snapshot> {
        match update {
            Some(Update::Snapshot(s)) => s,
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_controller_is_idle_and_empty() {
        let c = controller(10);
        assert_eq!(c.phase(), &Phase::Idle);
        assert!(c.window().is_empty());
        assert!(c.snapshot().is_none());
        assert_eq!(c.capacity(), cap(10));
    }

    // -- scenarios -----------------------------------------------------------

    #[tokio::test]
    async fn merge_with_duplicate_and_eviction() {
        let mut c = controller(3);
        seed(&mut c, &[2, 3, 5]);

        let snap = expect_snapshot(run_cycle(&mut c, &Scripted::new([Ok(vec![5, 7])])).await);
        assert_eq!(snap.previous_window.to_vec(), vec![2, 3, 5]);
        assert_eq!(snap.current_window.to_vec(), vec![3, 5, 7]);
        assert_eq!(snap.received, vec![5, 7]);
        assert_eq!(snap.average.to_string(), "5.00");
        assert_eq!(c.window().to_vec(), vec![3, 5, 7]);
        assert_eq!(c.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn first_fetch_fills_empty_window() {
        let mut c = controller(5);
        let snap = expect_snapshot(run_cycle(&mut c, &Scripted::new([Ok(vec![1, 2, 3])])).await);
        assert!(snap.previous_window.is_empty());
        assert_eq!(snap.current_window.to_vec(), vec![1, 2, 3]);
        assert_eq!(snap.average.to_string(), "2.00");
    }

    #[tokio::test]
    async fn every_insert_evicts_when_full() {
        let mut c = controller(2);
        seed(&mut c, &[10, 20]);
        let snap = expect_snapshot(run_cycle(&mut c, &Scripted::new([Ok(vec![30, 40])])).await);
        assert_eq!(snap.current_window.to_vec(), vec![30, 40]);
        assert_eq!(snap.average.to_string(), "35.00");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_moves_to_error_and_keeps_window() {
        let mut c = controller(5);
        seed(&mut c, &[4, 6]);
        let before = c.snapshot().cloned();

        let slow = Slow {
            timeout: Duration::from_millis(500),
        };
        let update = run_cycle(&mut c, &slow).await;

        assert_eq!(
            update,
            Some(Update::Error("Request timed out (500ms)".into()))
        );
        assert_eq!(error(&c), Some("Request timed out (500ms)"));
        assert_eq!(c.window().to_vec(), vec![4, 6]);
        assert_eq!(c.snapshot().cloned(), before, "failure publishes no snapshot");
    }

    #[test]
    fn shrinking_capacity_keeps_tail() {
        let mut c = controller(5);
        seed(&mut c, &[1, 2, 3, 4, 5]);
        c.set_capacity(cap(2));
        assert_eq!(c.window().to_vec(), vec![4, 5]);
        assert_eq!(c.capacity(), cap(2));
    }

    // -- state machine -------------------------------------------------------

    #[test]
    fn trigger_while_fetching_is_ignored() {
        let mut c = controller(5);
        let first = c.trigger().unwrap();
        assert!(c.is_fetching());
        assert!(c.trigger().is_none());

        c.complete(first.cycle, Ok(vec![1])).unwrap();
        assert!(c.trigger().is_some());
    }

    #[test]
    fn http_error_is_reported_and_window_untouched() {
        let mut c = controller(5);
        seed(&mut c, &[9]);

        let req = c.trigger().unwrap();
        let update = c.complete(req.cycle, Err(FetchError::HttpStatus(500)));

        assert_eq!(update, Some(Update::Error("HTTP error! status: 500".into())));
        assert_eq!(c.window().to_vec(), vec![9]);
    }

    #[test]
    fn retry_after_error_fetches_again() {
        let mut c = controller(5);
        let req = c.trigger().unwrap();
        c.complete(req.cycle, Err(FetchError::HttpStatus(502)));
        assert!(error(&c).is_some());

        let retry = c.trigger().unwrap();
        assert!(retry.cycle > req.cycle);
        assert!(error(&c).is_none(), "message cleared by the next trigger");

        let snap = expect_snapshot(c.complete(retry.cycle, Ok(vec![8])));
        assert_eq!(snap.current_window.to_vec(), vec![8]);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut c = controller(5);
        let req = c.trigger().unwrap();
        assert!(c.complete(req.cycle + 1, Ok(vec![1])).is_none());
        assert!(c.is_fetching());

        c.complete(req.cycle, Ok(vec![2])).unwrap();
        assert!(c.complete(req.cycle, Ok(vec![3])).is_none(), "already completed");
        assert_eq!(c.window().to_vec(), vec![2]);
    }

    #[test]
    fn select_source_triggers_only_on_change() {
        let mut c = controller(5);
        assert!(c.select_source(SourceId::Prime).is_none());

        let req = c.select_source(SourceId::Even).unwrap();
        assert_eq!(req.source, SourceId::Even);
        assert_eq!(c.source(), SourceId::Even);
    }

    #[test]
    fn select_source_while_fetching_records_choice_only() {
        let mut c = controller(5);
        let req = c.trigger().unwrap();
        assert!(c.select_source(SourceId::Random).is_none());
        assert_eq!(c.source(), SourceId::Random);

        let snap = expect_snapshot(c.complete(req.cycle, Ok(vec![2, 3])));
        assert_eq!(snap.source, SourceId::Prime, "snapshot names the source fetched");
    }

    #[test]
    fn cancel_in_flight_fires_request_token() {
        let mut c = controller(5);
        let req = c.trigger().unwrap();
        c.cancel_in_flight();
        assert!(req.cancel.is_cancelled());

        let update = c.complete(req.cycle, Err(FetchError::Cancelled));
        assert_eq!(update, Some(Update::Error("request cancelled".into())));
    }

    #[test]
    fn capacity_can_change_while_fetching() {
        let mut c = controller(4);
        seed(&mut c, &[1, 2, 3, 4]);
        let req = c.trigger().unwrap();
        c.set_capacity(cap(2));

        let snap = expect_snapshot(c.complete(req.cycle, Ok(vec![5])));
        assert_eq!(snap.previous_window.to_vec(), vec![3, 4]);
        assert_eq!(snap.current_window.to_vec(), vec![4, 5]);
    }

    #[tokio::test]
    async fn duplicate_only_fetch_is_idempotent() {
        let mut c = controller(4);
        seed(&mut c, &[1, 3, 5]);
        let before = c.snapshot().unwrap().average;

        let snap = expect_snapshot(run_cycle(&mut c, &Scripted::new([Ok(vec![5, 1, 3])])).await);
        assert_eq!(snap.current_window, snap.previous_window);
        assert_eq!(snap.average, before);
    }

    #[tokio::test]
    async fn empty_batch_still_publishes() {
        let mut c = controller(4);
        let snap = expect_snapshot(run_cycle(&mut c, &Scripted::new([Ok(vec![])])).await);
        assert!(snap.current_window.is_empty());
        assert_eq!(snap.average.to_string(), "0.00");
    }
}
