//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  The UI only reads the latest
//! [`Snapshot`](crate::controller::Snapshot) and the controller phase; it
//! never mutates anything.
//!
//! Layout, top to bottom: source header, window states, received numbers,
//! average, and a one-line status bar.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::controller::Phase;

/// Draw the complete UI for one frame.
pub fn draw(app: &App, frame: &mut Frame) {
    let [header_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);
    draw_snapshot(app, frame, body_area);
    draw_status_bar(app, frame, status_area);
}

/// Selected source, its endpoint, and the window size.
fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let source = app.controller.source();
    let phase_style = match app.controller.phase() {
        Phase::Idle => Style::default().fg(Color::Green),
        Phase::Fetching { .. } => Style::default().fg(Color::Yellow),
        Phase::Error { .. } => Style::default().fg(Color::Red),
    };

    let text = vec![
        Line::from(vec![
            Span::styled(
                format!("[{}] {}", source.letter(), source.label()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(app.phase_line(), phase_style),
        ]),
        Line::from(vec![
            Span::styled("Fetching from: ", Style::default().fg(Color::DarkGray)),
            Span::styled(source.endpoint(), Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(
                format!(
                    "window {}/{}",
                    app.controller.window().len(),
                    app.controller.capacity()
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];

    let header = Paragraph::new(text).block(
        Block::default()
            .title(" Average Calculator ")
            .borders(Borders::ALL),
    );
    frame.render_widget(header, area);
}

/// Previous/current window, the received batch, and the average.
fn draw_snapshot(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default().title(" Last fetch ").borders(Borders::ALL);

    let Some(snapshot) = app.controller.snapshot() else {
        let empty = Paragraph::new("No numbers fetched yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let received = serde_json::to_string(&snapshot.received).unwrap_or_default();

    let text = vec![
        Line::from(vec![
            Span::styled("Previous: ", label),
            Span::raw(snapshot.previous_window.to_json()),
        ]),
        Line::from(vec![
            Span::styled("Current:  ", label),
            Span::raw(snapshot.current_window.to_json()),
        ]),
        Line::from(vec![
            Span::styled("Received: ", label),
            Span::raw(received),
        ]),
        Line::raw(""),
        Line::from(vec![
            Span::styled("Average:  ", label),
            Span::styled(
                snapshot.average.to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "{} · {}",
                snapshot.source.label(),
                snapshot.fetched_at.format("%H:%M:%S UTC")
            ),
            label,
        )),
    ];

    let body = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(body, area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let auto = if app.auto_refresh { "on" } else { "off" };
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(format!("auto {auto}"), Style::default().fg(Color::Green)),
        Span::raw("  q: quit  p/f/e/r: source  Enter: fetch  +/-: size  a: auto"),
    ]));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::poll::PollMsg;
    use crate::source::{FetchError, SourceId};
    use crate::window::Capacity;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn app() -> App {
        App::new(Controller::new(SourceId::Prime, Capacity::new(3).unwrap()))
    }

    fn render(app: &App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();

        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draw_does_not_panic_before_first_fetch() {
        let text = render(&app(), 100, 24);
        assert!(text.contains("No numbers fetched yet."));
        assert!(text.contains("evaluation-service/primes"));
    }

    #[test]
    fn draw_shows_snapshot() {
        let mut a = app();
        let req = a.request_fetch().unwrap();
        a.handle_poll(PollMsg::Done {
            cycle: req.cycle,
            outcome: Ok(vec![2, 3, 5]),
        });
        let req = a.request_fetch().unwrap();
        a.handle_poll(PollMsg::Done {
            cycle: req.cycle,
            outcome: Ok(vec![5, 7]),
        });

        let text = render(&a, 100, 24);
        assert!(text.contains("[2,3,5]"), "previous window");
        assert!(text.contains("[3,5,7]"), "current window");
        assert!(text.contains("[5,7]"), "received batch");
        assert!(text.contains("5.00"), "average");
    }

    #[test]
    fn draw_shows_error() {
        let mut a = app();
        let req = a.request_fetch().unwrap();
        a.handle_poll(PollMsg::Done {
            cycle: req.cycle,
            outcome: Err(FetchError::Timeout(std::time::Duration::from_millis(500))),
        });

        let text = render(&a, 120, 24);
        assert!(text.contains("Request timed out (500ms)"));
    }

    #[test]
    fn draw_survives_tiny_terminal() {
        render(&app(), 10, 3);
    }
}
