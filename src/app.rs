use crate::catalog::{CatalogClient, CategoryInfo, Item, RemoteQuery, RetrievalError};
use crate::keybindings::KeybindingRegistry;
use crate::paginate::{clamp_page, last_page};
use crate::present::{present, visible_items, RenderShape, RetrievalState};
use crate::query::{Mode, ModeResolver};
use crate::storage::CurationManager;
use crate::util::MAX_QUERY_LENGTH;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ============================================================================
// Background Events
// ============================================================================

/// A remote retrieval the event loop must dispatch.
///
/// Carries the generation it was triggered under; the response is only
/// committed if that generation is still current when it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    pub generation: u64,
    pub query: RemoteQuery,
}

/// Events from background tasks
pub enum AppEvent {
    /// A search or category fetch finished.
    RetrievalCompleted {
        generation: u64,
        query: RemoteQuery,
        result: Result<Vec<Item>, RetrievalError>,
    },
    /// Category metadata for the navigation bar.
    CategoriesLoaded(Result<Vec<CategoryInfo>, RetrievalError>),
    /// Highlights for the start screen.
    HighlightsLoaded(Result<Vec<Item>, RetrievalError>),
    /// A background task panicked.
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub client: CatalogClient,
    pub resolver: ModeResolver,
    /// Favorites, injected so tests can run against an in-memory store.
    pub curation: CurationManager,
    pub keybindings: KeybindingRegistry,
    pub page_size: usize,

    // Navigation bar
    /// Recognized categories in configured order, enriched with server metadata.
    pub nav_categories: Vec<CategoryInfo>,
    /// Chip matching the active category, if any.
    pub nav_selected: Option<usize>,
    /// "Books of the day" listed on the start screen.
    pub highlights: Arc<Vec<Item>>,
    /// Columns of the card grid as last drawn; vertical moves step by this.
    pub grid_columns: usize,

    // Query state
    pub mode: Mode,
    /// Token that produced `mode`, as typed (trimmed).
    pub active_token: String,
    /// Bumped on every resolution. Responses stamped with an older value are
    /// discarded.
    pub generation: u64,
    pub retrieval_state: RetrievalState,
    /// Result set shared cheaply with the renderer.
    pub results: Arc<Vec<Item>>,
    /// 1-based page index, category mode only.
    pub page: usize,
    /// Index into the visible items.
    pub selected: usize,

    // Input line
    pub input_mode: bool,
    pub input: String,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub show_help: bool,
    pub help_scroll_offset: usize,
    pub needs_redraw: bool,
    /// Loading spinner frame, advanced by the tick handler.
    pub spinner_frame: usize,

    /// Outstanding background tasks, aborted on drop. Superseded retrievals
    /// are left to finish; their responses are dropped by the generation check.
    pub task_handles: Vec<JoinHandle<()>>,
}

impl App {
    pub fn new(
        client: CatalogClient,
        resolver: ModeResolver,
        curation: CurationManager,
        page_size: usize,
    ) -> Self {
        let nav_categories = resolver
            .categories()
            .iter()
            .map(CategoryInfo::plain)
            .collect();

        Self {
            client,
            resolver,
            curation,
            keybindings: KeybindingRegistry::new(),
            page_size,
            nav_categories,
            nav_selected: None,
            highlights: Arc::new(Vec::new()),
            grid_columns: 1,
            mode: Mode::Idle,
            active_token: String::new(),
            generation: 0,
            retrieval_state: RetrievalState::Idle,
            results: Arc::new(Vec::new()),
            page: 1,
            selected: 0,
            input_mode: false,
            input: String::new(),
            status_message: None,
            show_help: false,
            help_scroll_offset: 0,
            needs_redraw: true,
            spinner_frame: 0,
            task_handles: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Mode transitions
    // ------------------------------------------------------------------------

    /// Resolve `token` and make it the active query.
    ///
    /// Local modes (`Idle`, `Curated`) complete immediately. Remote modes put
    /// the state into `Loading` and return the retrieval to dispatch.
    pub fn submit(&mut self, token: &str) -> Option<Retrieval> {
        let mode = self.resolver.resolve(Some(token));
        self.generation = self.generation.wrapping_add(1);
        self.active_token = token.trim().to_string();
        self.page = 1;
        self.selected = 0;
        self.needs_redraw = true;
        self.nav_selected = match &mode {
            Mode::Category(name) => self.nav_categories.iter().position(|c| c.name == *name),
            _ => None,
        };

        tracing::debug!(?mode, generation = self.generation, "Resolved query token");

        let retrieval = match &mode {
            Mode::Idle => {
                self.results = Arc::new(Vec::new());
                self.retrieval_state = RetrievalState::Idle;
                None
            }
            Mode::Curated => {
                self.curation.load();
                self.results = Arc::new(self.curation.items().to_vec());
                self.retrieval_state = RetrievalState::Loaded;
                None
            }
            Mode::Search(_) | Mode::Category(_) => {
                self.results = Arc::new(Vec::new());
                self.retrieval_state = RetrievalState::Loading;
                mode.remote_query().map(|query| Retrieval {
                    generation: self.generation,
                    query,
                })
            }
        };

        self.mode = mode;
        retrieval
    }

    /// Commit the response of a retrieval if it is still current.
    ///
    /// Returns `false` when the response was stale and discarded.
    pub fn apply_retrieval(
        &mut self,
        generation: u64,
        result: Result<Vec<Item>, RetrievalError>,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(
                received = generation,
                current = self.generation,
                "Discarding stale retrieval response"
            );
            return false;
        }
        if !self.mode.is_remote() {
            tracing::debug!(generation, "Discarding retrieval for a local mode");
            return false;
        }

        match result {
            Ok(items) => {
                tracing::info!(count = items.len(), generation, "Retrieval completed");
                self.results = Arc::new(items);
                self.retrieval_state = RetrievalState::Loaded;
            }
            Err(e) => {
                tracing::warn!(error = %e, generation, "Retrieval failed");
                self.results = Arc::new(Vec::new());
                self.retrieval_state = RetrievalState::Failed;
            }
        }
        self.page = 1;
        self.selected = 0;
        self.needs_redraw = true;
        true
    }

    /// Return to the idle state.
    pub fn clear_query(&mut self) {
        self.submit("");
    }

    pub fn show_favorites(&mut self) -> Option<Retrieval> {
        let sentinel = self.resolver.sentinel().to_string();
        self.submit(&sentinel)
    }

    /// Move to the next (or previous) category chip and open it.
    pub fn cycle_category(&mut self, forward: bool) -> Option<Retrieval> {
        let count = self.nav_categories.len();
        if count == 0 {
            return None;
        }
        let next = match (self.nav_selected, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(i), true) => (i + 1) % count,
            (Some(i), false) => (i + count - 1) % count,
        };
        let name = self.nav_categories[next].name.clone();
        self.submit(&name)
    }

    /// Replace the start-screen highlights.
    pub fn set_highlights(&mut self, items: Vec<Item>) {
        self.highlights = Arc::new(items);
        if self.mode == Mode::Idle {
            self.clamp_selection();
        }
        self.needs_redraw = true;
    }

    /// Merge server category metadata into the navigation bar.
    ///
    /// Only configured categories are shown, in configured order; the server
    /// contributes color and the sensitive flag.
    pub fn set_category_metadata(&mut self, remote: Vec<CategoryInfo>) {
        for chip in &mut self.nav_categories {
            if let Some(info) = remote
                .iter()
                .find(|r| r.name.trim().to_lowercase() == chip.name)
            {
                chip.color = info.color.clone();
                chip.sensitive = info.sensitive;
            }
        }
        for info in &remote {
            if !self.resolver.is_category(&info.name) {
                tracing::debug!(name = %info.name, "Ignoring unconfigured server category");
            }
        }
        self.needs_redraw = true;
    }

    // ------------------------------------------------------------------------
    // Input line
    // ------------------------------------------------------------------------

    pub fn begin_input(&mut self) {
        self.input_mode = true;
        self.input = self.active_token.clone();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = false;
        self.input.clear();
    }

    pub fn push_input(&mut self, c: char) {
        if self.input.chars().count() >= MAX_QUERY_LENGTH {
            self.set_status(format!(
                "Consulta muito longa (máx. {} caracteres)",
                MAX_QUERY_LENGTH
            ));
            return;
        }
        self.input.push(c);
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }

    /// Leave the input line and resolve what was typed.
    pub fn commit_input(&mut self) -> Option<Retrieval> {
        self.input_mode = false;
        let token = std::mem::take(&mut self.input);
        self.submit(&token)
    }

    // ------------------------------------------------------------------------
    // Paging and selection
    // ------------------------------------------------------------------------

    /// Items currently on screen, in display order.
    ///
    /// The start screen lists the highlights, so selection, favoriting and
    /// link opening work on them too.
    pub fn visible_items(&self) -> &[Item] {
        if self.mode == Mode::Idle {
            return &self.highlights;
        }
        visible_items(&self.mode, &self.results, self.page_size, self.page)
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.visible_items().get(self.selected)
    }

    pub fn last_page(&self) -> usize {
        last_page(self.results.len(), self.page_size)
    }

    /// Flip to another page. Only category listings are paginated.
    ///
    /// Returns `true` if the page changed.
    pub fn turn_page(&mut self, forward: bool) -> bool {
        if !matches!(self.mode, Mode::Category(_)) {
            return false;
        }
        let target = if forward {
            self.page.saturating_add(1)
        } else {
            self.page.saturating_sub(1)
        };
        let target = clamp_page(target, self.results.len(), self.page_size);
        if target == self.page {
            return false;
        }
        self.page = target;
        self.selected = 0;
        self.needs_redraw = true;
        true
    }

    /// Rows are a whole grid row apart when the card grid is on screen.
    fn vertical_step(&self) -> usize {
        match self.mode {
            Mode::Search(_) | Mode::Curated => self.grid_columns.max(1),
            Mode::Idle | Mode::Category(_) => 1,
        }
    }

    pub fn nav_up(&mut self) {
        let step = self.vertical_step();
        if self.selected >= step {
            self.selected -= step;
        }
    }

    /// Into the next row; on a short last grid row, its final card.
    pub fn nav_down(&mut self) {
        let len = self.visible_items().len();
        if len == 0 {
            return;
        }
        let step = self.vertical_step();
        let target = self.selected.saturating_add(step).min(len - 1);
        if target / step > self.selected / step {
            self.selected = target;
        }
    }

    /// Move within a grid row; in the ranked table, flip the page instead.
    pub fn nav_left(&mut self) {
        if matches!(self.mode, Mode::Category(_)) {
            self.turn_page(false);
        } else if self.vertical_step() > 1 && self.selected % self.grid_columns != 0 {
            self.selected -= 1;
        }
    }

    pub fn nav_right(&mut self) {
        if matches!(self.mode, Mode::Category(_)) {
            self.turn_page(true);
            return;
        }
        let len = self.visible_items().len();
        let columns = self.vertical_step();
        if columns > 1 && (self.selected + 1) % columns != 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_items().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    // ------------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------------

    /// Toggle favorite on the selected item. Returns the new state.
    pub fn toggle_selected(&mut self) -> Option<bool> {
        let item = self.selected_item()?.clone();
        Some(self.toggle_item(&item))
    }

    /// Toggle favorite on `item` and report the outcome in the status bar.
    ///
    /// While the favorites list is on screen it is refreshed in place; this
    /// is a local read, so the retrieval generation is left alone.
    pub fn toggle_item(&mut self, item: &Item) -> bool {
        let curated = self.curation.toggle(item);

        if let Some(e) = self.curation.take_write_error() {
            tracing::warn!(error = %e, id = %item.id, "Favorite change not saved");
            self.set_status("Não foi possível salvar os favoritos; a alteração vale só nesta sessão");
        } else if curated {
            self.set_status("Adicionado aos favoritos");
        } else {
            self.set_status("Removido dos favoritos");
        }

        if self.mode == Mode::Curated {
            self.results = Arc::new(self.curation.items().to_vec());
            self.clamp_selection();
        }
        self.needs_redraw = true;
        curated
    }

    // ------------------------------------------------------------------------
    // Presentation and status
    // ------------------------------------------------------------------------

    pub fn present(&self) -> RenderShape {
        present(
            &self.mode,
            self.retrieval_state,
            &self.results,
            self.page_size,
            self.page,
            |id| self.curation.is_curated(id),
        )
    }

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds).
    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    /// Track a spawned task, forgetting those that already finished.
    pub fn track_task(&mut self, handle: JoinHandle<()>) {
        self.task_handles.retain(|h| !h.is_finished());
        self.task_handles.push(handle);
    }
}

// ============================================================================
// Resource Cleanup
// ============================================================================

impl Drop for App {
    fn drop(&mut self) {
        let mut aborted = 0;
        for handle in self.task_handles.drain(..) {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            tracing::debug!(aborted, "Aborted background tasks on App drop");
        }
    }
}
