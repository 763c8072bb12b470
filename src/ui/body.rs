//! Body area: renders whatever shape `App::present` chose.

use crate::app::App;
use crate::present::{ItemView, RankedTable, RenderShape};
use crate::util::truncate_to_width;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap,
    },
    Frame,
};

use super::render::SPINNER;

/// Cards are laid out in as many columns of this width as fit.
const CARD_WIDTH: u16 = 38;
const CARD_HEIGHT: u16 = 7;

/// Card columns that fit in a body `width` columns wide (borders included).
pub(super) fn grid_columns(width: u16) -> usize {
    (width.saturating_sub(2) / CARD_WIDTH).max(1) as usize
}

pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    match app.present() {
        RenderShape::Blank => render_welcome(f, app, area),
        RenderShape::Loading => render_notice(
            f,
            area,
            vec![Line::from(format!(
                "{} Carregando livros...",
                SPINNER[app.spinner_frame % SPINNER.len()]
            ))],
            Style::default().fg(Color::Gray),
        ),
        RenderShape::Error { message } => render_notice(
            f,
            area,
            vec![Line::from(message)],
            Style::default().fg(Color::Red),
        ),
        RenderShape::Empty { title, hint } => {
            let mut lines = vec![Line::from(Span::styled(
                title,
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            if let Some(hint) = hint {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    hint,
                    Style::default().fg(Color::DarkGray),
                )));
            }
            render_notice(f, area, lines, Style::default())
        }
        RenderShape::Table(table) => render_table(f, app, &table, area),
        RenderShape::Grid(cards) => render_grid(f, app, &cards, area),
    }
}

fn render_welcome(f: &mut Frame, app: &App, area: Rect) {
    let hints = vec![
        Line::from(Span::styled(
            "Descubra livros",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("/ para buscar por título ou autor"),
        Line::from("Tab para navegar pelas categorias, F para os favoritos"),
        Line::from("? para ver todos os atalhos"),
    ];
    if app.highlights.is_empty() {
        render_notice(f, area, hints, Style::default().fg(Color::Gray));
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(area);
    render_notice(f, chunks[0], hints, Style::default().fg(Color::Gray));
    render_highlights(f, app, chunks[1]);
}

/// "Destaques do Dia": the server's highlights as a selectable list.
fn render_highlights(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(4) as usize;
    let author_width = (width / 3).min(28);
    let title_width = width.saturating_sub(author_width + 12);

    let items: Vec<ListItem> = app
        .highlights
        .iter()
        .map(|item| {
            let view = ItemView::new(item, app.curation.is_curated(&item.id));
            let mut spans = vec![
                cover_span(&view),
                Span::styled(
                    truncate_to_width(&view.title, title_width).into_owned(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    truncate_to_width(&view.author, author_width).into_owned(),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw("  "),
            ];
            spans.extend(affordances(&view).spans);
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Destaques do Dia "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}

/// Centered, vertically padded message.
fn render_notice(f: &mut Frame, area: Rect, lines: Vec<Line<'_>>, style: Style) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner_height = area.height.saturating_sub(2) as usize;
    let pad = inner_height.saturating_sub(lines.len()) / 2;

    let mut padded: Vec<Line> = Vec::with_capacity(pad + lines.len());
    padded.extend((0..pad).map(|_| Line::from("")));
    padded.extend(lines);

    let paragraph = Paragraph::new(padded)
        .block(block)
        .style(style)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

// ============================================================================
// Ranked table (category mode)
// ============================================================================

fn render_table(f: &mut Frame, app: &App, table: &RankedTable, area: Rect) {
    let title = format!(
        " {} · Exibindo {} a {} · Página {} de {} ",
        table.category, table.first_rank, table.last_rank, table.page, table.last_page
    );

    let title_width = area.width.saturating_sub(6 + 24 + 16 + 9 + 8) as usize;
    let rows: Vec<Row> = table
        .rows
        .iter()
        .map(|row| {
            let item = &row.item;
            Row::new(vec![
                Cell::from(format!("#{}", row.rank)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(Line::from(vec![
                    cover_span(item),
                    Span::raw(truncate_to_width(&item.title, title_width).into_owned()),
                ])),
                Cell::from(truncate_to_width(&item.author, 22).into_owned()),
                Cell::from(Span::styled(
                    truncate_to_width(&item.source, 14).into_owned(),
                    Style::default().fg(Color::Red),
                )),
                Cell::from(affordances(item)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(24),
        Constraint::Length(16),
        Constraint::Length(9),
    ];

    let widget = Table::new(rows, widths)
        .header(
            Row::new(vec!["Nº", "Título & Capa", "Autor", "Origem", "Ações"])
                .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
                .bottom_margin(1),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Gray))
                .title(title),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = TableState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(widget, area, &mut state);
}

// ============================================================================
// Card grid (search and favorites)
// ============================================================================

fn render_grid(f: &mut Frame, app: &App, cards: &[ItemView], area: Rect) {
    let title = match &app.mode {
        crate::query::Mode::Curated => format!(" Favoritos · {} livro(s) ", cards.len()),
        _ => format!(" Resultados para \"{}\" · {} ", app.active_token, cards.len()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .title(truncate_to_width(&title, area.width.saturating_sub(4) as usize).into_owned());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = grid_columns(area.width);
    let visible_rows = (inner.height / CARD_HEIGHT).max(1) as usize;

    // Scroll so the row holding the selection stays on screen.
    let selected_row = app.selected / columns;
    let first_row = selected_row.saturating_sub(visible_rows.saturating_sub(1));

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(CARD_HEIGHT); visible_rows])
        .split(inner);

    for (r, row_area) in row_areas.iter().enumerate() {
        let col_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row_area);

        for (c, card_area) in col_areas.iter().enumerate() {
            let index = (first_row + r) * columns + c;
            if let Some(card) = cards.get(index) {
                render_card(f, card, *card_area, index == app.selected);
            }
        }
    }
}

fn render_card(f: &mut Frame, card: &ItemView, area: Rect, selected: bool) {
    if area.width < 6 || area.height < 3 {
        return;
    }
    let border = if selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let width = area.width.saturating_sub(2) as usize;

    let mut badge = vec![Span::styled(
        format!(" {} ", truncate_to_width(&card.source, width.saturating_sub(8))),
        Style::default().fg(Color::White).bg(Color::Red),
    )];
    if let Some(lang) = &card.language {
        badge.push(Span::styled(
            format!(" {}", truncate_to_width(lang, 4)),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let lines = vec![
        Line::from(vec![
            cover_span(card),
            Span::styled(
                truncate_to_width(&card.title, width.saturating_sub(2)).into_owned(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            truncate_to_width(&card.author, width).into_owned(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(badge),
        Line::from(Span::styled(
            card.summary
                .as_deref()
                .map(|s| truncate_to_width(s, width).into_owned())
                .unwrap_or_default(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
        affordances(card),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border),
    );
    f.render_widget(paragraph, area);
}

// ============================================================================
// Shared pieces
// ============================================================================

fn cover_span(item: &ItemView) -> Span<'static> {
    if item.has_cover {
        Span::styled("▣ ", Style::default().fg(Color::Cyan))
    } else {
        Span::styled("□ ", Style::default().fg(Color::DarkGray))
    }
}

/// Favorite flag plus whichever of preview/download the item offers.
fn affordances(item: &ItemView) -> Line<'static> {
    let mut spans = Vec::with_capacity(3);
    spans.push(if item.curated {
        Span::styled("♥ ", Style::default().fg(Color::Red))
    } else {
        Span::styled("♡ ", Style::default().fg(Color::DarkGray))
    });
    if item.has_preview {
        spans.push(Span::styled("[o]", Style::default().fg(Color::Gray)));
    }
    if item.has_download {
        spans.push(Span::styled("[d]", Style::default().fg(Color::Green)));
    }
    Line::from(spans)
}
