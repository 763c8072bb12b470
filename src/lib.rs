//! Query-mode resolution and result presentation for a terminal book
//! catalog client.
//!
//! A single input token is resolved to one of four modes (idle, search,
//! category, favorites); the matching retrieval runs in the background and
//! its results are shaped into a ranked, paginated table or a card grid.

pub mod app;
pub mod catalog;
pub mod config;
pub mod keybindings;
pub mod paginate;
pub mod present;
pub mod query;
pub mod storage;
pub mod ui;
pub mod util;
