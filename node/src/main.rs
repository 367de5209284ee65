// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::process::ExitCode;

use arbor_node::bootstrap;
use arbor_node::config::NodeConfig;
use arbor_node::telemetry;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = NodeConfig::parse();
    telemetry::init_telemetry();

    match bootstrap::run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("arbor-node exiting: {}", e);
            ExitCode::FAILURE
        }
    }
}
