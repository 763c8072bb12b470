//! Maps the resolved mode, retrieval state and result set to what the body
//! area shows.
//!
//! The output is plain data; `ui::render` turns it into widgets. Loading,
//! error, empty and populated shapes are mutually exclusive, and `Idle` shows
//! none of them.

use crate::catalog::Item;
use crate::paginate::paginate;
use crate::query::Mode;
use crate::util::single_line;

/// Author label for items without one.
pub const UNKNOWN_AUTHOR: &str = "Desconhecido";

const SEARCH_FAILED: &str =
    "Não foi possível conectar ao servidor de busca. Tente novamente mais tarde.";
const NOTHING_FOUND: &str = "Nenhum livro encontrado";
const SEARCH_HINT: &str = "Tente buscar por outros termos ou autores.";
const CATEGORY_EMPTY: &str = "Nenhum livro encontrado para esta categoria.";
const CURATED_HINT: &str = "Marque livros com a tecla de favorito para vê-los aqui.";

/// Progress of the retrieval feeding the current result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalState {
    /// No query active.
    #[default]
    Idle,
    /// A remote retrieval is outstanding.
    Loading,
    /// The latest retrieval failed; the result set is empty.
    Failed,
    /// The result set is current (possibly empty).
    Loaded,
}

/// Display-ready projection of one [`Item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub id: String,
    pub title: String,
    pub author: String,
    pub source: String,
    pub summary: Option<String>,
    pub language: Option<String>,
    pub has_cover: bool,
    pub has_preview: bool,
    pub has_download: bool,
    pub curated: bool,
}

impl ItemView {
    /// Server text is flattened to one line and stripped of control sequences.
    pub fn new(item: &Item, curated: bool) -> Self {
        let author = item
            .author
            .as_deref()
            .map(single_line)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        Self {
            id: item.id.clone(),
            title: single_line(&item.title),
            author,
            source: single_line(&item.source),
            summary: item
                .summary
                .as_deref()
                .map(single_line)
                .filter(|s| !s.is_empty()),
            language: item.language.as_deref().map(single_line),
            has_cover: item.has_cover(),
            has_preview: item.has_preview(),
            has_download: item.has_download(),
            curated,
        }
    }
}

/// One ranked row of a category listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Global 1-based rank across pages.
    pub rank: usize,
    pub item: ItemView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedTable {
    pub category: String,
    pub page: usize,
    pub last_page: usize,
    pub first_rank: usize,
    pub last_rank: usize,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderShape {
    /// Nothing to show (`Idle`).
    Blank,
    Loading,
    Error {
        message: String,
    },
    Empty {
        title: String,
        hint: Option<String>,
    },
    /// Category mode: paginated, ranked listing.
    Table(RankedTable),
    /// Search and favorites: unranked cards.
    Grid(Vec<ItemView>),
}

/// Items currently visible for the mode: the current page in category mode,
/// the whole result set otherwise.
pub fn visible_items<'a>(
    mode: &Mode,
    results: &'a [Item],
    page_size: usize,
    page_index: usize,
) -> &'a [Item] {
    match mode {
        Mode::Idle => &results[..0],
        Mode::Category(_) => paginate(results, page_size, page_index).items,
        Mode::Search(_) | Mode::Curated => results,
    }
}

/// Choose the render shape for the current state.
///
/// `is_curated` answers favorites membership by item id.
pub fn present(
    mode: &Mode,
    state: RetrievalState,
    results: &[Item],
    page_size: usize,
    page_index: usize,
    is_curated: impl Fn(&str) -> bool,
) -> RenderShape {
    if *mode == Mode::Idle {
        return RenderShape::Blank;
    }

    match state {
        RetrievalState::Idle => return RenderShape::Blank,
        RetrievalState::Loading => return RenderShape::Loading,
        RetrievalState::Failed => {
            return RenderShape::Error {
                message: failure_message(mode),
            }
        }
        RetrievalState::Loaded => {}
    }

    if results.is_empty() {
        return empty_notice(mode);
    }

    match mode {
        Mode::Category(name) => {
            let page = paginate(results, page_size, page_index);
            if page.is_empty() {
                return empty_notice(mode);
            }
            let rows = page
                .items
                .iter()
                .enumerate()
                .map(|(local, item)| Row {
                    rank: page.rank_of(local),
                    item: ItemView::new(item, is_curated(&item.id)),
                })
                .collect();
            RenderShape::Table(RankedTable {
                category: name.clone(),
                page: page.index,
                last_page: page.last,
                first_rank: page.first_rank(),
                last_rank: page.last_rank(),
                rows,
            })
        }
        _ => RenderShape::Grid(
            results
                .iter()
                .map(|item| ItemView::new(item, is_curated(&item.id)))
                .collect(),
        ),
    }
}

fn failure_message(mode: &Mode) -> String {
    match mode {
        Mode::Category(name) => format!(
            "Não foi possível carregar a categoria {}. Tente novamente mais tarde.",
            name
        ),
        _ => SEARCH_FAILED.to_string(),
    }
}

fn empty_notice(mode: &Mode) -> RenderShape {
    let (title, hint) = match mode {
        Mode::Category(_) => (CATEGORY_EMPTY, None),
        Mode::Curated => (NOTHING_FOUND, Some(CURATED_HINT)),
        _ => (NOTHING_FOUND, Some(SEARCH_HINT)),
    };
    RenderShape::Empty {
        title: title.to_string(),
        hint: hint.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(n: usize) -> Vec<Item> {
        (1..=n)
            .map(|i| Item::new(format!("id-{i}"), format!("Livro {i}"), "Gutenberg"))
            .collect()
    }

    fn none(_: &str) -> bool {
        false
    }

    #[test]
    fn test_idle_is_blank_regardless_of_state() {
        for state in [
            RetrievalState::Idle,
            RetrievalState::Loading,
            RetrievalState::Failed,
            RetrievalState::Loaded,
        ] {
            assert_eq!(
                present(&Mode::Idle, state, &items(3), 10, 1, none),
                RenderShape::Blank
            );
        }
    }

    #[test]
    fn test_loading_error_empty_are_distinct() {
        let mode = Mode::Search("tolkien".to_string());
        let loading = present(&mode, RetrievalState::Loading, &[], 10, 1, none);
        let failed = present(&mode, RetrievalState::Failed, &[], 10, 1, none);
        let empty = present(&mode, RetrievalState::Loaded, &[], 10, 1, none);

        assert_eq!(loading, RenderShape::Loading);
        assert!(matches!(failed, RenderShape::Error { .. }));
        assert!(matches!(empty, RenderShape::Empty { .. }));
        assert_ne!(failed, empty);
    }

    #[test]
    fn test_failure_messages_are_mode_specific() {
        let search = present(
            &Mode::Search("x".to_string()),
            RetrievalState::Failed,
            &[],
            10,
            1,
            none,
        );
        assert_eq!(
            search,
            RenderShape::Error {
                message: SEARCH_FAILED.to_string()
            }
        );

        let category = present(
            &Mode::Category("dark".to_string()),
            RetrievalState::Failed,
            &[],
            10,
            1,
            none,
        );
        match category {
            RenderShape::Error { message } => assert!(message.contains("dark")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_category_renders_ranked_table() {
        let results = items(100);
        let mode = Mode::Category("fantasia".to_string());

        let shape = present(&mode, RetrievalState::Loaded, &results, 10, 2, none);
        let RenderShape::Table(table) = shape else {
            panic!("expected table");
        };
        assert_eq!(table.category, "fantasia");
        assert_eq!((table.page, table.last_page), (2, 10));
        assert_eq!((table.first_rank, table.last_rank), (11, 20));
        let ranks: Vec<usize> = table.rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (11..=20).collect::<Vec<_>>());
        assert_eq!(table.rows[0].item.title, "Livro 11");
    }

    #[test]
    fn test_empty_category_notice() {
        let shape = present(
            &Mode::Category("dark".to_string()),
            RetrievalState::Loaded,
            &[],
            10,
            1,
            none,
        );
        assert_eq!(
            shape,
            RenderShape::Empty {
                title: CATEGORY_EMPTY.to_string(),
                hint: None
            }
        );
    }

    #[test]
    fn test_curated_empty_is_notice_not_error() {
        let shape = present(&Mode::Curated, RetrievalState::Loaded, &[], 10, 1, none);
        assert!(matches!(shape, RenderShape::Empty { .. }));
    }

    #[test]
    fn test_search_renders_unranked_grid_with_curated_flags() {
        let results = items(3);
        let shape = present(
            &Mode::Search("livro".to_string()),
            RetrievalState::Loaded,
            &results,
            10,
            1,
            |id| id == "id-2",
        );
        let RenderShape::Grid(cards) = shape else {
            panic!("expected grid");
        };
        let flags: Vec<bool> = cards.iter().map(|c| c.curated).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_search_grid_is_not_paginated() {
        let results = items(25);
        let shape = present(
            &Mode::Search("x".to_string()),
            RetrievalState::Loaded,
            &results,
            10,
            1,
            none,
        );
        assert!(matches!(shape, RenderShape::Grid(ref cards) if cards.len() == 25));
    }

    #[test]
    fn test_item_view_defaults_and_sanitizes() {
        let mut item = Item::new("a", "Dom\nCasmurro\x1b[31m", "Gutenberg");
        item.author = Some("   ".to_string());
        item.preview_url = Some("https://example.com/read".to_string());

        let view = ItemView::new(&item, true);
        assert_eq!(view.title, "Dom Casmurro");
        assert_eq!(view.author, UNKNOWN_AUTHOR);
        assert!(view.has_preview);
        assert!(!view.has_download);
        assert!(view.curated);
    }

    #[test]
    fn test_visible_items_per_mode() {
        let results = items(15);
        assert!(visible_items(&Mode::Idle, &results, 10, 1).is_empty());
        assert_eq!(
            visible_items(&Mode::Category("dark".to_string()), &results, 10, 2).len(),
            5
        );
        assert_eq!(visible_items(&Mode::Curated, &results, 10, 2).len(), 15);
    }
}
