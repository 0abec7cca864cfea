use crate::controller::{Controller, FetchRequest, Phase, Update};
use crate::poll::PollMsg;
use crate::source::SourceId;

/// Terminal-side state around the [`Controller`].
///
/// Every method that may start a fetch returns the [`FetchRequest`] for the
/// main loop to dispatch; `App` itself never touches the network.
pub struct App {
    pub controller: Controller,
    /// Whether ticks from the poller trigger fetches.
    pub auto_refresh: bool,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last cycle status message.
    pub status: String,
}

impl App {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            auto_refresh: false,
            quit: false,
            status: "Starting…".into(),
        }
    }

    // -- actions -------------------------------------------------------------

    pub fn select_source(&mut self, source: SourceId) -> Option<FetchRequest> {
        let request = self.controller.select_source(source);
        if request.is_none() && self.controller.is_fetching() {
            self.status = format!("Switched to {source}; fetch already in progress");
        }
        request
    }

    /// Manual fetch, also used as retry after an error.
    pub fn request_fetch(&mut self) -> Option<FetchRequest> {
        self.controller.trigger()
    }

    pub fn grow_capacity(&mut self) {
        let capacity = self.controller.capacity().grow();
        self.controller.set_capacity(capacity);
        self.status = format!("Window size {capacity}");
    }

    pub fn shrink_capacity(&mut self) {
        let capacity = self.controller.capacity().shrink();
        self.controller.set_capacity(capacity);
        self.status = format!("Window size {capacity}");
    }

    pub fn toggle_auto_refresh(&mut self) {
        self.auto_refresh = !self.auto_refresh;
        self.status = if self.auto_refresh {
            "Auto-refresh on".into()
        } else {
            "Auto-refresh off".into()
        };
    }

    // -- poll messages -------------------------------------------------------

    /// Apply one message from the background tasks.  A tick may start a new
    /// fetch, which is returned for dispatch.
    pub fn handle_poll(&mut self, msg: PollMsg) -> Option<FetchRequest> {
        match msg {
            PollMsg::Done { cycle, outcome } => {
                match self.controller.complete(cycle, outcome) {
                    Some(Update::Snapshot(snapshot)) => {
                        self.status = format!(
                            "Fetched {} numbers from {}",
                            snapshot.received.len(),
                            snapshot.source
                        );
                    }
                    Some(Update::Error(message)) => {
                        self.status = format!("Error: {message}");
                    }
                    None => {}
                }
                None
            }
            PollMsg::Tick if self.auto_refresh => self.controller.trigger(),
            PollMsg::Tick => None,
        }
    }

    /// One-line summary of the controller phase for the UI.
    pub fn phase_line(&self) -> String {
        match self.controller.phase() {
            Phase::Idle => "Ready".into(),
            Phase::Fetching { source, .. } => format!("Loading {}…", source.label()),
            Phase::Error { message } => format!("Error: {message}  (Enter: retry)"),
        }
    }
}
