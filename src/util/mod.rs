//! Utility functions for common operations.
//!
//! - **URL validation**: scheme checks for the API base URL and for preview/download links
//! - **Text processing**: control-sequence stripping and width-aware truncation

mod text;
mod url_validator;

pub use text::{display_width, single_line, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, validate_url_for_open, UrlValidationError};

/// Maximum allowed query token length accepted from the input line.
pub const MAX_QUERY_LENGTH: usize = 256;
