// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Process bootstrap.
//!
//! # Startup order
//! ```text
//! open storage -> registry -> servers -> [metrics listener]
//!   -> health probe -> bind RPC listener -> sweeper -> serve
//! ```
//! Any failure before "serve" aborts startup; in particular an unhealthy
//! storage means the RPC port is never bound.
//!
//! # Shutdown
//! On SIGINT/SIGTERM the listener stops accepting, in-flight requests get
//! up to the grace period to finish, and whatever is still running after
//! that is abandoned.

use std::future::{Future, IntoFuture};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::admin::AdminServer;
use crate::clock::SystemTimeSource;
use crate::config::NodeConfig;
use crate::errors::ServiceError;
use crate::registry::Registry;
use crate::server::{build_metrics_router, build_router, AppState};
use crate::signer::KeyFileSignerFactory;
use crate::storage::{open_storage, StorageError};
use crate::telemetry;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("failed to open storage: {0}")]
    Storage(#[from] StorageError),
    #[error("health check failed: {0}")]
    Unhealthy(ServiceError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Full startup for the `arbor-node` binary. Returns once the server has
/// shut down.
pub async fn run(cfg: NodeConfig) -> Result<(), BootstrapError> {
    tracing::info!("Starting arbor-node with config: {:?}", cfg);

    if let Some(every) = cfg.dump_metrics_interval() {
        telemetry::spawn_metrics_dump(every);
    }

    let storage = open_storage(&cfg.storage_uri)?;
    let registry = Registry::new(
        storage,
        Arc::new(KeyFileSignerFactory),
        Arc::new(SystemTimeSource),
        cfg.settings(),
    );

    if cfg.export_metrics {
        let addr = cfg.metrics_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BootstrapError::Bind { addr, source })?;
        tracing::info!("Metrics listening on {}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, build_metrics_router()).await {
                tracing::error!("Metrics server failed: {}", e);
            }
        });
    }

    serve(
        registry,
        cfg.rpc_addr(),
        cfg.hard_delete_sweep_interval(),
        cfg.shutdown_grace(),
        shutdown_signal(),
    )
    .await
}

/// Health-gate, bind and serve until `shutdown` resolves.
pub async fn serve<F>(
    registry: Registry,
    addr: SocketAddr,
    sweep_interval: Option<Duration>,
    grace: Duration,
    shutdown: F,
) -> Result<(), BootstrapError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(registry);

    state.logs.is_healthy().await.map_err(BootstrapError::Unhealthy)?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BootstrapError::Bind { addr, source })?;
    let local = listener.local_addr().map_err(BootstrapError::Serve)?;
    tracing::info!("Listening on {}", local);

    let sweeper = sweep_interval.map(|every| spawn_hard_delete_sweeper(state.admin.clone(), every));

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async move {
        shutdown.await;
        tracing::info!("Shutdown requested, draining in-flight requests");
        let _ = stop_tx.send(true);
    });

    let grace_expired = async move {
        let stopping = stop_rx.wait_for(|stopping| *stopping).await.is_ok();
        if !stopping {
            // Signal future dropped without firing: never time out.
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    let result = tokio::select! {
        res = server.into_future() => res.map_err(BootstrapError::Serve),
        _ = grace_expired => {
            tracing::warn!("Grace period of {:?} elapsed, abandoning in-flight requests", grace);
            Ok(())
        }
    };

    if let Some(handle) = sweeper {
        handle.abort();
    }
    tracing::info!("Server stopped");
    result
}

pub fn spawn_hard_delete_sweeper(admin: AdminServer, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match admin.sweep_expired().await {
                Ok(swept) if !swept.is_empty() => tracing::info!("Sweeper hard-deleted {} trees", swept.len()),
                Ok(_) => tracing::debug!("Sweeper found nothing to hard delete"),
                Err(e) => tracing::error!("Sweeper failed: {}", e),
            }
        }
    })
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
}
