//! Background fetch tasks.
//!
//! Each accepted [`FetchRequest`] runs as its own task on the tokio runtime
//! and reports back to the UI thread over an unbounded channel.  The
//! controller only accepts one request at a time, so at most one fetch task
//! is alive at any moment.
//!
//! An optional ticker sends [`PollMsg::Tick`] at a fixed interval; the app
//! turns ticks into fetches while auto-refresh is on.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::controller::FetchRequest;
use crate::source::{FetchOutcome, NumberSource};

/// Messages sent from background tasks to the UI thread.
#[derive(Debug)]
pub enum PollMsg {
    /// A fetch finished, successfully or not.
    Done { cycle: u64, outcome: FetchOutcome },
    /// The auto-refresh interval elapsed.
    Tick,
}

/// Run `request` against `numbers` on `runtime`.
pub fn spawn_fetch<S>(
    runtime: &Handle,
    numbers: Arc<S>,
    request: FetchRequest,
    tx: UnboundedSender<PollMsg>,
) -> JoinHandle<()>
where
    S: NumberSource + 'static,
{
    runtime.spawn(async move {
        let cycle = request.cycle;
        let outcome = numbers.fetch(request.source, request.cancel).await;
        // If the receiver is gone the main thread has exited.
        let _ = tx.send(PollMsg::Done { cycle, outcome });
    })
}

/// Send a [`PollMsg::Tick`] every `interval` until the receiver is dropped.
pub fn spawn_ticker(
    runtime: &Handle,
    interval: Duration,
    tx: UnboundedSender<PollMsg>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; the start-up fetch covers it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tx.send(PollMsg::Tick).is_err() {
                return;
            }
        }
    })
}
