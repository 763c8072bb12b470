//! Background task event handling.

use crate::app::{App, AppEvent};
use crate::catalog::{CategoryInfo, Item, RemoteQuery, RetrievalError};

/// Apply one event from a background task to the application state.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::RetrievalCompleted {
            generation,
            query,
            result,
        } => handle_retrieval_completed(app, generation, query, result),
        AppEvent::CategoriesLoaded(result) => handle_categories_loaded(app, result),
        AppEvent::HighlightsLoaded(Ok(items)) => {
            tracing::info!(count = items.len(), "Loaded highlights");
            app.set_highlights(items);
        }
        AppEvent::HighlightsLoaded(Err(e)) => {
            tracing::warn!(error = %e, "Highlights unavailable");
        }
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.set_status(format!("Erro interno na tarefa {}", task));
        }
    }
}

fn handle_retrieval_completed(
    app: &mut App,
    generation: u64,
    query: RemoteQuery,
    result: Result<Vec<Item>, RetrievalError>,
) {
    // Stale generations are rejected inside `apply_retrieval`.
    if !app.apply_retrieval(generation, result) {
        tracing::debug!(?query, generation, "Ignored retrieval result");
    }
}

fn handle_categories_loaded(app: &mut App, result: Result<Vec<CategoryInfo>, RetrievalError>) {
    match result {
        Ok(categories) => {
            tracing::info!(count = categories.len(), "Loaded category metadata");
            app.set_category_metadata(categories);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Category metadata unavailable, using configured names");
        }
    }
}
