use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magnetdex_core::{
    load_config, validate_config, Fetcher, HttpTransport, Indexer, IngestScheduler,
    JiebaSegmenter, MirrorTransport, QrCodeRenderer, ScanCodeWriter, SqliteStore,
};
use magnetdex_server::api::create_router;
use magnetdex_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MAGNETDEX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "magnetdex {} starting (config {})",
        VERSION,
        &config_hash[..16]
    );
    info!("Database path: {:?}", config.database.path);

    let store = Arc::new(
        SqliteStore::new(&config.database.path).context("Failed to open torrent store")?,
    );
    info!("Torrent store initialized");

    let transport: Arc<dyn MirrorTransport> = Arc::new(HttpTransport::new(&config.fetcher));
    let fetcher = Arc::new(Fetcher::new(&config.fetcher, transport));
    info!(
        "Fetcher initialized with {} mirrors: {}",
        fetcher.mirrors().len(),
        fetcher
            .mirrors()
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut indexer = Indexer::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(JiebaSegmenter),
    );
    if config.indexer.scan_codes {
        info!("Writing scan codes under {:?}", config.indexer.scan_code_dir);
        indexer = indexer.with_scan_codes(ScanCodeWriter::new(
            config.indexer.scan_code_dir.clone(),
            Arc::new(QrCodeRenderer),
        ));
    }
    let indexer = Arc::new(indexer);

    let scheduler = Arc::new(IngestScheduler::new(
        config.scheduler.clone(),
        store.clone(),
        fetcher,
        indexer,
    ));

    if config.scheduler.enabled {
        scheduler.start().await;
        info!(
            "Ingestion scheduler started ({} workers, batch size {})",
            config.scheduler.workers, config.scheduler.batch_size
        );
    } else {
        info!("Ingestion scheduler disabled in config");
    }

    let state = Arc::new(AppState::new(config.clone(), store, scheduler.clone()));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if scheduler.is_running() {
        info!("Stopping ingestion scheduler...");
        scheduler.stop().await;
        info!("Ingestion scheduler stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
