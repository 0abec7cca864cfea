//! numwindow — a live rolling average over number services, in the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  PollMsg   ┌──────────┐  draw()  ┌──────────┐
//! │  poll.rs │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (tokio)  │  (channel) │ (state)  │          │ (render) │
//! └──────────┘            └──────────┘          └──────────┘
//!      ▲ FetchRequest          ▲
//!      └───────────────────────┤ handle_key_event()
//!                         ┌──────────┐
//!                         │ input.rs │
//!                         └──────────┘
//! ```
//!
//! * **`source/`** — the source table, the `NumberSource` trait, the HTTP
//!   implementation and its cancellable deadline.
//! * **`window`** — the bounded, de-duplicating FIFO window.
//! * **`average`** — exact two-decimal mean of the window.
//! * **`controller`** — the fetch-cycle state machine; sole writer of the
//!   window.
//! * **`poll`** — runs fetches and the auto-refresh ticker on tokio.
//! * **`app`** / **`ui`** / **`input`** — terminal state, rendering, keys.
//! * **`config`** — defaults and command-line overrides.
//!
//! Logs go to `numwindow.log` in the temp directory; `RUST_LOG` controls
//! verbosity (default: info).

mod app;
mod average;
mod config;
mod controller;
mod input;
mod poll;
mod source;
mod ui;
mod window;

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use controller::{Controller, FetchRequest};
use poll::PollMsg;
use source::HttpSource;

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before printing a panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Send logs to a file; stdout belongs to the TUI.
fn init_tracing() -> Result<PathBuf> {
    let path = std::env::temp_dir().join("numwindow.log");
    let file = std::fs::File::create(&path)
        .with_context(|| format!("cannot create log file '{}'", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let config = Config::from_args(std::env::args().skip(1))?;
    let log_path = init_tracing()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %config.source,
        capacity = %config.capacity,
        timeout_ms = config.timeout.as_millis() as u64,
        "numwindow starting"
    );

    let runtime = tokio::runtime::Runtime::new().context("cannot start tokio runtime")?;
    let numbers = Arc::new(HttpSource::new(config.timeout, config.body_policy));
    let (tx, mut rx) = mpsc::unbounded_channel::<PollMsg>();

    let dispatch = |request: FetchRequest| {
        poll::spawn_fetch(runtime.handle(), numbers.clone(), request, tx.clone());
    };

    let _ticker = poll::spawn_ticker(runtime.handle(), config.refresh_interval, tx.clone());

    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(Controller::from_config(&config));

    // Initial fetch for the configured source.
    if let Some(request) = app.request_fetch() {
        dispatch(request);
    }

    // -- main event loop -----------------------------------------------------
    // ~10 fps: drain poll messages, render, then wait up to one tick for a key.
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = rx.try_recv() {
            if let Some(request) = app.handle_poll(msg) {
                dispatch(request);
            }
        }

        guard.terminal.draw(|f| ui::draw(&app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(request) = input::handle_key_event(&mut app, key) {
                    dispatch(request);
                }
            }
        }

        if app.quit {
            break;
        }
    }

    app.controller.cancel_in_flight();
    drop(guard);
    runtime.shutdown_timeout(Duration::from_millis(200));
    tracing::info!(log = %log_path.display(), "numwindow exiting");
    Ok(())
}
