// Velopool Reporter: binary entry point
//
// Logging defaults to `info` and can be overridden with RUST_LOG. Any error
// that escapes `run` is fatal and exits with status 1.

use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use velopool_lib::engine::config::ReporterConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match ReporterConfig::parse().into_settings() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("[config] {}", e);
            std::process::exit(1);
        }
    };
    info!("[config] {:?}", settings);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(velopool_lib::run(settings)) {
        error!("{}", e);
        std::process::exit(1);
    }
}
