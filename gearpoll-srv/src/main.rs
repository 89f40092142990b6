//! gearpoll-srv - pairwise gear-impact survey service
//!
//! Presents respondents with pairs of fishing-gear items, records which item
//! they judge more environmentally damaging, and persists judgments to the
//! answer log. Supports resuming a partially-completed survey by email.

use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info};

use gearpoll_common::catalog::load_catalog_cached;
use gearpoll_common::config::ServiceConfig;
use gearpoll_common::db::init_database;
use gearpoll_common::Language;
use gearpoll_srv::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "gearpoll-srv", about = "Pairwise gear-impact survey service")]
struct Args {
    /// Root data folder (database, catalog, images)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// HTTP port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Path to TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting gearpoll-srv v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = ServiceConfig::resolve(
        args.root_folder.as_deref(),
        args.port,
        args.config.as_deref(),
    )?;
    config.ensure_root_folder()?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path).await?;

    info!("Catalog path: {}", config.catalog_path.display());
    let mut catalogs = HashMap::new();
    for language in Language::ALL {
        match load_catalog_cached(&config.catalog_path, language, config.max_catalog_items) {
            Ok(catalog) => {
                info!(
                    language = language.as_str(),
                    items = catalog.len(),
                    pairs = catalog.len() * catalog.len().saturating_sub(1) / 2,
                    "Catalog loaded"
                );
                catalogs.insert(language, catalog);
            }
            Err(e) => {
                error!(language = language.as_str(), "Failed to load catalog: {}", e);
                return Err(e.into());
            }
        }
    }

    let port = config.port;
    let state = AppState::new(pool, catalogs, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("gearpoll-srv listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
