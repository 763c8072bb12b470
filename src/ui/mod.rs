//! Terminal user interface.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input routing
//! - `events` - Background task event processing
//! - `helpers` - Task spawning and link opening
//! - `render` - Layout and query line
//! - `nav` - Category and favorites bar
//! - `body` - Loading, error, empty, table and card shapes
//! - `status` - Status bar
//! - `help` - Keybinding overlay

mod body;
mod events;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod nav;
mod render;
mod status;

pub use loop_runner::{run, Action};
