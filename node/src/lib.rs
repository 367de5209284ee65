// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod admin;
pub mod api;
pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod errors;
pub mod log_server;
pub mod map_server;
pub mod registry;
pub mod server;
pub mod signer;
pub mod storage;
pub mod telemetry;
