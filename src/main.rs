use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;

use estante::app::{App, AppEvent};
use estante::catalog::CatalogClient;
use estante::config::Config;
use estante::keybindings::KeybindingRegistry;
use estante::present::UNKNOWN_AUTHOR;
use estante::query::ModeResolver;
use estante::storage::{CurationManager, FileStore};
use estante::ui;
use estante::util::single_line;

/// Get the config directory path (~/.config/estante/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("estante"))
}

#[derive(Parser, Debug)]
#[command(name = "estante", about = "Terminal client for a remote book catalog")]
struct Args {
    /// Token to resolve at startup (search text, category or favorites)
    #[arg(long, value_name = "TOKEN")]
    query: Option<String>,

    /// Catalog API base URL (overrides config and ESTANTE_API_URL)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Alternative config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the favorites list and exit
    #[arg(long)]
    list_favorites: bool,
}

/// Send tracing output to a log file so it never draws over the TUI.
fn init_logging(config_dir: &std::path::Path) -> Result<()> {
    let log_path = config_dir.join("estante.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // User-only access on Unix; the directory holds the favorites list.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            eprintln!(
                "Warning: failed to set permissions on {}: {}",
                config_dir.display(),
                e
            );
        }
    }

    init_logging(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Favorites
    let store = FileStore::open(config_dir.join("store")).context("Failed to open store")?;
    let (curation, outcome, backup) = CurationManager::open_file(store);
    tracing::debug!(?outcome, "Favorites loaded");
    if let Some(path) = backup {
        eprintln!(
            "Warning: favorites file was corrupt; a copy was saved to {}",
            path.display()
        );
    }

    if args.list_favorites {
        if curation.is_empty() {
            println!("Nenhum favorito salvo.");
        }
        for (i, item) in curation.items().iter().enumerate() {
            println!(
                "{:>3}. {} | {} | {}",
                i + 1,
                single_line(&item.title),
                single_line(item.author.as_deref().unwrap_or(UNKNOWN_AUTHOR)),
                single_line(&item.source),
            );
        }
        return Ok(());
    }

    let base_url = config
        .base_url(args.api_url.as_deref())
        .context("Invalid catalog API URL")?;
    let client = CatalogClient::new(base_url.clone(), config.request_timeout())
        .context("Failed to create catalog client")?;
    tracing::info!(base_url = %base_url, "Starting estante");

    let resolver = ModeResolver::new(&config.curated_sentinel, &config.categories);
    let mut app = App::new(client, resolver, curation, config.page_size);

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!("{}", warning);
        eprintln!("Warning: keybindings: {}", warning);
    }
    app.keybindings = keybindings;

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    ui::run(&mut app, event_tx, event_rx, args.query).await?;

    println!("Até logo!");
    Ok(())
}
