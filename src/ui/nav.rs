use crate::app::App;
use crate::query::Mode;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::str::FromStr;

/// Render the navigation bar: one chip per category plus favorites.
///
/// Sensitive categories carry a `18+` tag. Server colors are used when they
/// parse; otherwise chips fall back to the default palette.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let mut spans: Vec<Span> = Vec::with_capacity(app.nav_categories.len() * 3 + 3);
    spans.push(Span::styled(
        " estante ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw(" "));

    for (i, category) in app.nav_categories.iter().enumerate() {
        let color = category
            .color
            .as_deref()
            .and_then(|c| Color::from_str(c).ok())
            .unwrap_or(Color::Gray);
        let style = if app.nav_selected == Some(i) {
            Style::default()
                .fg(Color::Black)
                .bg(color)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        };

        spans.push(Span::styled(format!(" {} ", category.name), style));
        if category.sensitive {
            spans.push(Span::styled("18+", Style::default().fg(Color::Red)));
        }
        spans.push(Span::raw(" "));
    }

    let favorites_style = if app.mode == Mode::Curated {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Red)
    };
    spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
        format!(" ♥ {} ({}) ", app.resolver.sentinel(), app.curation.len()),
        favorites_style,
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
