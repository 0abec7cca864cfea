//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Adding a new keybinding is
//! a single match arm in [`handle_key_event`].
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in [`crate::ui`]'s status bar.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;
use crate::controller::FetchRequest;
use crate::source::SourceId;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.  Returns a fetch to
/// dispatch, if the key started one.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<FetchRequest> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit = true;
            None
        }
        KeyCode::Char(c @ ('p' | 'f' | 'e' | 'r')) => {
            SourceId::from_letter(c).and_then(|source| app.select_source(source))
        }
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('R') => app.request_fetch(),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
            app.grow_capacity();
            None
        }
        KeyCode::Char('-') | KeyCode::Down => {
            app.shrink_capacity();
            None
        }
        KeyCode::Char('a') => {
            app.toggle_auto_refresh();
            None
        }
        _ => None,
    }
}
