use std::net::SocketAddr;

use anyhow::Context;
use args::Args;
use clap::Parser;
use config::Config;
use fastrace::collector::{ConsoleReporter, Config as CollectorConfig};
use server::ServeConfig;
use tokio_util::sync::CancellationToken;

mod args;

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    server::logger::init(&args.log);

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;

    let listen_address = match args.listen_address.or(config.server.listen_address) {
        Some(address) => address,
        None => DEFAULT_LISTEN_ADDRESS.parse::<SocketAddr>()?,
    };

    if config.telemetry.console_traces {
        fastrace::set_reporter(ConsoleReporter, CollectorConfig::default());
    }

    let shutdown_signal = CancellationToken::new();

    tokio::spawn({
        let shutdown_signal = shutdown_signal.clone();

        async move {
            wait_for_signal().await;
            log::info!("shutdown requested");
            shutdown_signal.cancel();
        }
    });

    let result = server::serve(ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter: args.log,
    })
    .await;

    fastrace::flush();

    result.context("server error")
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            log::warn!("cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
