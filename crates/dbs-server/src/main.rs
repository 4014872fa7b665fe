//! DBS Server - Main entry point

use anyhow::Result;
use dbs_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use dbs_server::{
    api,
    config::Config,
    db, features,
    ingest::BulkIngestor,
    statements::{StatementProvider, TemplateStatements},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("dbs-server")
        .filter_directives("dbs_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .overlay_env()?;

    // Keeps the file writer flushing until shutdown
    let _log_guard = init_logging(&log_config)?;

    info!("Starting DBS Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database).await?;
    db::migrate(&pool).await?;

    let templates = TemplateStatements::from_config(&config.ingest)?;
    info!(
        templates = templates.template_count(),
        schema_owner = %config.ingest.schema_owner,
        "SQL statements loaded"
    );
    let statements: Arc<dyn StatementProvider> = Arc::new(templates);
    let ingestor = Arc::new(BulkIngestor::new(pool.clone(), statements.clone(), &config.ingest));
    info!(
        id_strategy = ?config.ingest.id_strategy,
        lumi_strategy = %config.ingest.lumi_strategy,
        file_chunk_size = config.ingest.file_chunk_size,
        max_concurrent_units = config.ingest.max_concurrent_units,
        "Bulk ingestion ready"
    );

    let state = features::FeatureState {
        db: pool,
        statements,
        ingestor,
    };
    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for in-flight submissions", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
