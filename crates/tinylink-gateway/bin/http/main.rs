mod cli;

use crate::cli::{StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tinylink_core::{MappingStore, Shortener};
use tinylink_gateway::{App, AppState};
use tinylink_generator::RandomGenerator;
use tinylink_shortener::{ServiceConfig, ShortenerService};
use tinylink_storage::{CacheConfig, CachedStore, FileStore, InMemoryStore, MySqlStore};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(&config)?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        batch_workers = config.batch_workers,
        trusted_subnet = ?config.trusted_subnet,
        "starting tinylink gateway"
    );

    let shortener = match config.storage {
        StorageBackendArg::InMemory => build_shortener(InMemoryStore::new(), &config),
        StorageBackendArg::File => {
            let store = FileStore::open(&config.file_storage_path)
                .await
                .with_context(|| {
                    format!("open file store at {}", config.file_storage_path.display())
                })?;
            build_shortener(store, &config)
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(mysql_dsn)
                .await
                .context("connect to mysql")?;
            store.ensure_schema().await.context("create mysql schema")?;
            build_shortener(store, &config)
        }
    };

    let mut state = AppState::new(shortener, config.base_url.clone());
    if let Some(subnet) = config.trusted_subnet {
        state = state.with_trusted_subnet(subnet);
    }
    let app = App::router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

fn init_tracing(config: &CLI) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log level '{}'", config.log_level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!(e))
}

/// Wraps `store` in the resolve cache when enabled and builds the service.
fn build_shortener<S: MappingStore>(store: S, config: &CLI) -> Arc<dyn Shortener> {
    let service_config = ServiceConfig::builder()
        .request_timeout(Duration::from_millis(config.request_timeout_ms))
        .batch_workers(config.batch_workers)
        .list_policy(config.list_policy())
        .build();

    if config.resolve_cache_capacity == 0 {
        return Arc::new(ShortenerService::with_config(
            store,
            RandomGenerator::new(),
            service_config,
        ));
    }

    let cache = CacheConfig::builder()
        .max_capacity(config.resolve_cache_capacity)
        .build();
    Arc::new(ShortenerService::with_config(
        CachedStore::with_config(store, cache),
        RandomGenerator::new(),
        service_config,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
