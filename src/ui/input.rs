//! Input handling for the TUI.
//!
//! Keys are routed to the help overlay, the query line or the browse
//! bindings, in that order.

use crate::app::{App, AppEvent};
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{dispatch, open_selected_link, LinkKind};
use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if app.show_help {
        handle_help_input(app, code);
        return Action::Continue;
    }

    // Ctrl+C always quits, even while typing.
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    if app.input_mode {
        handle_query_input(app, code, modifiers, event_tx);
        return Action::Continue;
    }

    handle_browse_input(app, code, modifiers, event_tx)
}

/// Handle input while the help overlay is visible.
///
/// Captures all keys: j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
}

/// Handle keys while the query line has focus.
fn handle_query_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match app.keybindings.action_for_key(code, modifiers, KbContext::Input) {
        Some(KbAction::SubmitQuery) => {
            let retrieval = app.commit_input();
            dispatch(app, retrieval, event_tx);
        }
        Some(KbAction::CancelQuery) => app.cancel_input(),
        _ => match code {
            KeyCode::Backspace => app.pop_input(),
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => app.push_input(c),
            _ => {}
        },
    }
}

/// Handle keys while browsing results.
fn handle_browse_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let Some(action) = app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Global)
    else {
        return Action::Continue;
    };

    match action {
        KbAction::Quit => return Action::Quit,
        KbAction::NavDown => app.nav_down(),
        KbAction::NavUp => app.nav_up(),
        KbAction::NavLeft => app.nav_left(),
        KbAction::NavRight => app.nav_right(),
        KbAction::EnterQuery => app.begin_input(),
        KbAction::ClearQuery => app.clear_query(),
        KbAction::NextPage => {
            app.turn_page(true);
        }
        KbAction::PrevPage => {
            app.turn_page(false);
        }
        KbAction::ToggleFavorite => {
            app.toggle_selected();
        }
        KbAction::OpenPreview => open_selected_link(app, LinkKind::Preview),
        KbAction::OpenDownload => open_selected_link(app, LinkKind::Download),
        KbAction::ShowFavorites => {
            let retrieval = app.show_favorites();
            dispatch(app, retrieval, event_tx);
        }
        KbAction::NextCategory => {
            let retrieval = app.cycle_category(true);
            dispatch(app, retrieval, event_tx);
        }
        KbAction::PrevCategory => {
            let retrieval = app.cycle_category(false);
            dispatch(app, retrieval, event_tx);
        }
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        // Only bound in the query line.
        KbAction::SubmitQuery | KbAction::CancelQuery => {}
    }
    Action::Continue
}
