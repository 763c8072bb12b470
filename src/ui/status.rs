use crate::app::App;
use crate::query::Mode;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar: the latest status message, else key hints.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.input_mode {
        Cow::Borrowed("Digite a busca | ENTER confirma | ESC cancela")
    } else {
        match app.mode {
            Mode::Category(_) => Cow::Owned(format!(
                "[n/p]página {}/{} [f]avoritar [o]prévia [d]ownload [Tab]categoria [?]ajuda [q]sair",
                app.page,
                app.last_page()
            )),
            Mode::Search(_) | Mode::Curated => Cow::Borrowed(
                "[/]buscar [f]avoritar [o]prévia [d]ownload [F]avoritos [Esc]limpar [?]ajuda [q]sair",
            ),
            Mode::Idle => Cow::Borrowed(
                "[/]buscar [j/k]destaques [f]avoritar [o]prévia [Tab]categorias [F]avoritos [?]ajuda [q]sair",
            ),
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}
