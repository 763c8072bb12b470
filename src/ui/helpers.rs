//! Helper functions for UI operations.
//!
//! Background task spawning for retrievals and category metadata, panic
//! capture for those tasks, and validated link opening.

use crate::app::{App, AppEvent, Retrieval};
use crate::catalog::RetrievalError;
use crate::util::validate_url_for_open;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// A panicking task would otherwise vanish silently inside the runtime and
/// leave the UI waiting forever; here the panic message comes back as
/// `Err(String)` so the caller can report it through the event channel.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Spawn the remote request for `retrieval`.
///
/// The response is sent back stamped with the retrieval's generation. A
/// superseded task is not aborted; its response is dropped on arrival.
pub(super) fn spawn_retrieval(
    app: &mut App,
    retrieval: Retrieval,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let client = app.client.clone();
    let tx = event_tx.clone();
    let Retrieval { generation, query } = retrieval;

    tracing::debug!(?query, generation, "Spawning retrieval task");

    let handle = tokio::spawn(async move {
        let result = match catch_task_panic(client.retrieve(&query)).await {
            Ok(result) => result,
            Err(panic_msg) => {
                tracing::error!(error = %panic_msg, generation, "Retrieval task panicked");
                Err(RetrievalError::TaskFailed(panic_msg))
            }
        };

        let event = AppEvent::RetrievalCompleted {
            generation,
            query,
            result,
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, "Failed to send retrieval result (receiver dropped)");
        }
    });
    app.track_task(handle);
}

/// Dispatch a retrieval if the transition produced one.
pub(super) fn dispatch(
    app: &mut App,
    retrieval: Option<Retrieval>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if let Some(retrieval) = retrieval {
        spawn_retrieval(app, retrieval, event_tx);
    }
}

/// Fetch category metadata for the navigation bar.
pub(super) fn spawn_category_fetch(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let client = app.client.clone();
    let tx = event_tx.clone();

    let handle = tokio::spawn(async move {
        let event = match catch_task_panic(client.categories()).await {
            Ok(result) => AppEvent::CategoriesLoaded(result),
            Err(panic_msg) => AppEvent::TaskPanicked {
                task: "categories",
                error: panic_msg,
            },
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, "Failed to send category metadata (receiver dropped)");
        }
    });
    app.track_task(handle);
}

/// Fetch the start-screen highlights.
pub(super) fn spawn_highlights_fetch(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let client = app.client.clone();
    let tx = event_tx.clone();

    let handle = tokio::spawn(async move {
        let event = match catch_task_panic(client.highlights()).await {
            Ok(result) => AppEvent::HighlightsLoaded(result),
            Err(panic_msg) => AppEvent::TaskPanicked {
                task: "highlights",
                error: panic_msg,
            },
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, "Failed to send highlights (receiver dropped)");
        }
    });
    app.track_task(handle);
}

/// Which link of the selected item to open.
#[derive(Debug, Clone, Copy)]
pub(super) enum LinkKind {
    Preview,
    Download,
}

/// Open the selected item's preview or download link in the system browser.
///
/// Links come from the catalog server, so only http(s) URLs with a host are
/// handed to the OS.
pub(super) fn open_selected_link(app: &mut App, kind: LinkKind) {
    let Some(item) = app.selected_item() else {
        return;
    };

    let link = match kind {
        LinkKind::Preview => item.preview_url.clone(),
        LinkKind::Download => item.download_url.clone(),
    };
    let Some(link) = link.filter(|l| !l.trim().is_empty()) else {
        app.set_status(match kind {
            LinkKind::Preview => "Leitura online indisponível para este livro",
            LinkKind::Download => "Download indisponível para este livro",
        });
        return;
    };

    match validate_url_for_open(link.trim()) {
        Ok(url) => {
            tracing::info!(url = %url, ?kind, "Opening link");
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!(error = %e, "Failed to open browser");
                app.set_status(format!("Falha ao abrir o navegador: {}", e));
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Refusing to open link");
            app.set_status(format!("Link inválido: {}", e));
        }
    }
}
