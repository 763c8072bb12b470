//! Render functions for the TUI.
//!
//! Screen layout, top to bottom: navigation bar, query line, body, status bar.
//! The help overlay draws on top when active.

use crate::app::App;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{body, help, nav, status};
use crate::util::{display_width, truncate_to_width};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 50;
pub(super) const MIN_HEIGHT: u16 = 12;

/// Braille spinner shown while a retrieval is outstanding.
pub(super) const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub(super) const SPINNER_FRAMES: usize = SPINNER.len();

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Pequeno demais")
        } else {
            Paragraph::new(format!(
                "Terminal pequeno demais\n\nMínimo: {}x{}\nAtual: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    nav::render(f, app, chunks[0]);
    render_query_line(f, app, chunks[1]);
    body::render(f, app, chunks[2]);
    status::render(f, app, chunks[3]);

    if app.show_help {
        help::render(f, app);
    }
}

/// Render the query line: editable while typing, otherwise the active token.
fn render_query_line(f: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.input_mode {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(" Buscar livros, autores ou categorias ");

    let inner_width = area.width.saturating_sub(4) as usize;
    let line = if app.input_mode {
        // Keep the tail visible while typing past the edge.
        let text = tail_to_width(&app.input, inner_width.saturating_sub(1));
        Line::from(vec![Span::raw(" "), Span::raw(text)])
    } else if app.active_token.is_empty() {
        Line::from(Span::styled(
            " / para digitar",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                truncate_to_width(&app.active_token, inner_width).into_owned(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ])
    };

    f.render_widget(Paragraph::new(line).block(block), area);

    if app.input_mode {
        let typed = display_width(&tail_to_width(&app.input, inner_width.saturating_sub(1)));
        let x = area.x + 2 + typed.min(u16::MAX as usize) as u16;
        if x < area.x + area.width.saturating_sub(1) {
            f.set_cursor_position(Position::new(x, area.y + 1));
        }
    }
}

/// Longest suffix of `s` that fits in `max` columns.
fn tail_to_width(s: &str, max: usize) -> String {
    let mut width = 0;
    let mut start = s.len();
    for (idx, c) in s.char_indices().rev() {
        let w = display_width(c.encode_utf8(&mut [0u8; 4]));
        if width + w > max {
            break;
        }
        width += w;
        start = idx;
    }
    s[start..].to_string()
}
