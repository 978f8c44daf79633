mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use burrow_cache::{LayeredCache, MokaResponseCache, RedisResponseCache, ResponseCache};
use burrow_core::{ConfigResolver, GatewayConfig};
use burrow_gateway::{App, AppState};
use burrow_storage::{GitLabStore, InMemoryObjectStore, ObjectStore};
use burrow_telemetry::TelemetryConfig;
use clap::Parser;
use tokio::signal;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::cli::{StoreBackendArg, CLI};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    burrow_telemetry::init(&TelemetryConfig::builder().format(config.log_format).build())?;

    let raw = tokio::fs::read_to_string(&config.config)
        .await
        .with_context(|| format!("failed to read {}", config.config.display()))?;
    let resolver = ConfigResolver::new(GatewayConfig::from_json_str(&raw)?)?;

    info!(
        listen_addr = %config.listen_addr,
        config = %config.config.display(),
        store = %config.store,
        hosts = resolver.hosts().count(),
        "starting burrow gateway"
    );

    let store: Arc<dyn ObjectStore> = match config.store {
        StoreBackendArg::GitLab => Arc::new(GitLabStore::new()?),
        StoreBackendArg::InMemory => {
            warn!("using in-memory object store, uploads will not persist");
            Arc::new(InMemoryObjectStore::new())
        }
    };

    let ttl = Duration::from_secs(config.cache_ttl_secs);
    let l1: MokaResponseCache = MokaResponseCache::builder()
        .max_capacity(config.cache_capacity)
        .ttl(ttl)
        .build()
        .into();
    let cache: Arc<dyn ResponseCache> = match &config.redis_url {
        Some(url) => {
            let l2 = RedisResponseCache::connect(url)
                .await?
                .with_prefix(config.redis_key_prefix.as_str())
                .with_ttl(ttl);
            info!("using layered in-process and Redis response cache");
            Arc::new(LayeredCache::new(l1, l2))
        }
        None => Arc::new(l1),
    };

    let tasks = TaskTracker::new();
    let state = AppState::builder()
        .resolver(Arc::new(resolver))
        .store(store)
        .cache(cache)
        .tasks(tasks.clone())
        .build();

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router_with_body_limit(state, config.body_limit))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.close();
    let drain = Duration::from_secs(config.drain_timeout_secs);
    if tokio::time::timeout(drain, tasks.wait()).await.is_err() {
        warn!(pending = tasks.len(), "gave up waiting for pending cache writes");
    }

    info!("gateway stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
