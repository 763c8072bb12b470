use thiserror::Error;
use url::Url;

/// Errors raised while validating URLs handed to us by the catalog.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

fn require_http(url: &Url) -> Result<(), UrlValidationError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Validates a preview or download locator before launching it in the browser.
///
/// Locators come from third-party providers, so anything that is not a plain
/// http(s) URL with a host (e.g. `file://`, `javascript:`) is refused.
///
/// ```
/// use estante::util::validate_url_for_open;
///
/// assert!(validate_url_for_open("https://www.gutenberg.org/ebooks/55752").is_ok());
/// assert!(validate_url_for_open("file:///etc/passwd").is_err());
/// ```
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;
    require_http(&url)?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(url)
}

/// Validates the catalog API base URL.
///
/// Unlike [`validate_url_for_open`], local hosts are expected here: the
/// catalog service commonly runs on `localhost` during development.
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;
    require_http(&url)?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(url)
}
