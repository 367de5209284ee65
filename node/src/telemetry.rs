// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Logs
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arbor_node=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Metrics. Without a recorder the macros are no-ops, so a failure
    // here degrades to "no metrics" instead of refusing to start.
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
    }

    metrics::describe_counter!("arbor_trees_created_total", "Trees created, by type");
    metrics::describe_counter!("arbor_tree_updates_total", "Committed tree mutations, by resulting state");
    metrics::describe_counter!("arbor_trees_hard_deleted_total", "Trees hard deleted by the retention sweeper");
    metrics::describe_counter!("arbor_roots_committed_total", "Signed roots committed, by tree type");
    metrics::describe_histogram!("arbor_root_commit_duration_seconds", "End-to-end root commit latency");
    metrics::describe_histogram!("arbor_sign_duration_seconds", "Time spent in the signer");
    metrics::describe_counter!("arbor_rpc_requests_total", "RPCs served, by method, route and status");
    metrics::describe_histogram!("arbor_rpc_duration_seconds", "RPC latency, by route");

    metrics::gauge!("arbor_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}

/// Periodically write the rendered metrics to the log.
pub fn spawn_metrics_dump(every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick fires immediately; skip it so the first dump has data.
        interval.tick().await;
        loop {
            interval.tick().await;
            tracing::info!("Metrics dump:\n{}", get_metrics());
        }
    })
}
