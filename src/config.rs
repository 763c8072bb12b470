//! Configuration file parser for ~/.config/estante/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as warnings since they are usually
//! typos.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::paginate::DEFAULT_PAGE_SIZE;
use crate::util::validate_base_url;

/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "ESTANTE_API_URL";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog service root, e.g. `http://localhost:8000/api`.
    pub api_base_url: String,

    /// Items per page in category listings.
    pub page_size: usize,

    /// Recognized category names. Matched case-insensitively.
    pub categories: Vec<String>,

    /// Token that opens the favorites list.
    pub curated_sentinel: String,

    pub request_timeout_secs: u64,

    /// Custom keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            categories: ["fantasia", "dark", "estudo", "quadrinhos"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            curated_sentinel: "favoritos".to_string(),
            request_timeout_secs: 30,
            keybindings: HashMap::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "api_base_url",
        "page_size",
        "categories",
        "curated_sentinel",
        "request_timeout_secs",
        "keybindings",
    ];

    /// Load and validate configuration from a TOML file.
    ///
    /// - Missing or blank file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Values that break an invariant → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            api = %config.api_base_url,
            categories = config.categories.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validated()
    }

    /// Normalize names and check the invariants the resolver relies on.
    ///
    /// Category names are trimmed, lower-cased and deduplicated; the sentinel
    /// is trimmed and lower-cased. A category equal to the sentinel is
    /// rejected so the token classes stay disjoint.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        self.curated_sentinel = self.curated_sentinel.trim().to_lowercase();
        if self.curated_sentinel.is_empty() {
            return Err(ConfigError::Invalid(
                "curated_sentinel must not be empty".to_string(),
            ));
        }

        let mut categories: Vec<String> = Vec::with_capacity(self.categories.len());
        for name in &self.categories {
            let name = name.trim().to_lowercase();
            if name.is_empty() || categories.contains(&name) {
                continue;
            }
            if name == self.curated_sentinel {
                return Err(ConfigError::Invalid(format!(
                    "category {:?} collides with curated_sentinel",
                    name
                )));
            }
            categories.push(name);
        }
        self.categories = categories;

        validate_base_url(&self.api_base_url)
            .map_err(|e| ConfigError::Invalid(format!("api_base_url: {}", e)))?;

        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pick the catalog base URL: CLI flag, then `ESTANTE_API_URL`, then the
    /// config file value.
    pub fn base_url(&self, cli_override: Option<&str>) -> Result<Url, ConfigError> {
        let env = std::env::var(API_URL_ENV).ok();
        self.base_url_from(cli_override, env.as_deref())
    }

    fn base_url_from(&self, cli: Option<&str>, env: Option<&str>) -> Result<Url, ConfigError> {
        let (origin, raw) = match (cli, env) {
            (Some(cli), _) => ("--api-url", cli),
            (None, Some(env)) if !env.trim().is_empty() => (API_URL_ENV, env),
            _ => ("api_base_url", self.api_base_url.as_str()),
        };
        tracing::debug!(origin, url = %raw, "Resolved catalog base URL");
        validate_base_url(raw.trim()).map_err(|e| ConfigError::Invalid(format!("{}: {}", origin, e)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.page_size, 10);
        assert_eq!(
            config.categories,
            vec!["fantasia", "dark", "estudo", "quadrinhos"]
        );
        assert_eq!(config.curated_sentinel, "favoritos");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.keybindings.is_empty());
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "   \n  \n  ").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.curated_sentinel, "favoritos");
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::parse("page_size = 20\n").unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.categories.len(), 4);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
api_base_url = "https://livros.example.com/api"
page_size = 25
categories = ["Romance", "  Poesia ", "romance"]
curated_sentinel = "Estante"
request_timeout_secs = 5

[keybindings]
quit = "Ctrl+q"
toggle_favorite = "s"
"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.api_base_url, "https://livros.example.com/api");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.categories, vec!["romance", "poesia"]);
        assert_eq!(config.curated_sentinel, "estante");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.keybindings.get("toggle_favorite").map(String::as_str),
            Some("s")
        );
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(matches!(
            Config::parse("page_size = \"ten\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("page_size = 12\ntheme = \"dark\"\n").unwrap();
        assert_eq!(config.page_size, 12);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(matches!(
            Config::parse("page_size = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_blank_sentinel_rejected() {
        assert!(matches!(
            Config::parse("curated_sentinel = \"  \"\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_category_colliding_with_sentinel_rejected() {
        let err = Config::parse("categories = [\"Favoritos\", \"dark\"]\n").unwrap_err();
        assert!(err.to_string().contains("favoritos"));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        assert!(matches!(
            Config::parse("api_base_url = \"ftp://example.com/api\"\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "categories = [\"terror\"]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.categories, vec!["terror"]);
    }

    #[test]
    fn test_base_url_precedence() {
        let config = Config::default();

        let url = config
            .base_url_from(Some("http://cli.example/api"), Some("http://env.example/api"))
            .unwrap();
        assert_eq!(url.host_str(), Some("cli.example"));

        let url = config
            .base_url_from(None, Some("http://env.example/api"))
            .unwrap();
        assert_eq!(url.host_str(), Some("env.example"));

        let url = config.base_url_from(None, Some("  ")).unwrap();
        assert_eq!(url.host_str(), Some("localhost"));

        let url = config.base_url_from(None, None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api");
    }

    #[test]
    fn test_invalid_cli_base_url_names_origin() {
        let err = Config::default()
            .base_url_from(Some("not a url"), None)
            .unwrap_err();
        assert!(err.to_string().contains("--api-url"));
    }
}
