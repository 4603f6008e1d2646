//! Folio server binary.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use folio_archive::reconcile;
use folio_core::{DocumentStore, SqliteStore};
use folio_server::{config::Config, serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let store: Arc<dyn DocumentStore> = if config.database == ":memory:" {
        Arc::new(SqliteStore::open_in_memory()?)
    } else {
        Arc::new(SqliteStore::open(Path::new(&config.database))?)
    };

    // Heal any article/citation link left broken by an interrupted
    // two-step write before taking traffic.
    let report = reconcile(&store)?;
    if !report.is_clean() {
        tracing::warn!(?report, "repaired inconsistent citation links at startup");
    }

    let state = Arc::new(AppState::new(store, &config));
    serve(&config.addr, state).await
}
