// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::registry::ServiceSettings;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "arbor-node", version, about = "Tree state and signed root commitment server")]
pub struct NodeConfig {
    /// Storage backend: `memory://` or `file://<path>`
    #[arg(long, env = "ARBOR_STORAGE_URI", default_value = "memory://")]
    pub storage_uri: String,

    #[arg(long, env = "ARBOR_BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: IpAddr,

    /// RPC port
    #[arg(long, env = "ARBOR_PORT", default_value_t = 8090)]
    pub port: u16,

    /// Serve Prometheus metrics on `--http-port`
    #[arg(long, env = "ARBOR_EXPORT_METRICS", default_value_t = true, action = ArgAction::Set)]
    pub export_metrics: bool,

    #[arg(long, env = "ARBOR_HTTP_PORT", default_value_t = 8091)]
    pub http_port: u16,

    /// Log the rendered metrics every N seconds (0 disables)
    #[arg(long, env = "ARBOR_DUMP_METRICS_INTERVAL_SECS", default_value_t = 0)]
    pub dump_metrics_interval_secs: u64,

    #[arg(long, env = "ARBOR_SOFT_DELETE_RETENTION_SECS", default_value_t = 7 * 24 * 3600)]
    pub soft_delete_retention_secs: u64,

    /// How often expired soft-deleted trees are hard deleted (0 disables)
    #[arg(long, env = "ARBOR_HARD_DELETE_SWEEP_INTERVAL_SECS", default_value_t = 3600)]
    pub hard_delete_sweep_interval_secs: u64,

    #[arg(long, env = "ARBOR_RPC_TIMEOUT_MS", default_value_t = 5000)]
    pub rpc_timeout_ms: u64,

    /// Upper bound on draining in-flight requests at shutdown
    #[arg(long, env = "ARBOR_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    pub shutdown_grace_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            storage_uri: "memory://".to_string(),
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8090,
            export_metrics: true,
            http_port: 8091,
            dump_metrics_interval_secs: 0,
            soft_delete_retention_secs: 7 * 24 * 3600,
            hard_delete_sweep_interval_secs: 3600,
            rpc_timeout_ms: 5000,
            shutdown_grace_secs: 5,
        }
    }
}

impl NodeConfig {
    pub fn rpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }

    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.http_port)
    }

    pub fn settings(&self) -> ServiceSettings {
        ServiceSettings {
            soft_delete_retention: Duration::from_secs(self.soft_delete_retention_secs),
            rpc_timeout: Duration::from_millis(self.rpc_timeout_ms),
        }
    }

    pub fn dump_metrics_interval(&self) -> Option<Duration> {
        (self.dump_metrics_interval_secs > 0).then(|| Duration::from_secs(self.dump_metrics_interval_secs))
    }

    pub fn hard_delete_sweep_interval(&self) -> Option<Duration> {
        (self.hard_delete_sweep_interval_secs > 0).then(|| Duration::from_secs(self.hard_delete_sweep_interval_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
