mod api;
mod auth;
mod error;
pub mod logger;
mod tracing;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use config::Config;
use coordinator::Coordinator;
use gateway::{CommandGateway, ProcessGateway, TracedGateway};
use registry::Registry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::Error;

pub(crate) type Result<T> = std::result::Result<T, error::Error>;

/// How long open connections get to finish once shutdown was requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct ServeConfig {
    pub listen_address: SocketAddr,
    pub config: Config,
    /// Cancelled to stop the server gracefully.
    pub shutdown_signal: CancellationToken,
    /// Filter for the logger, e.g. `info` or `server=debug,registry=debug`.
    pub log_filter: String,
}

pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter,
    }: ServeConfig,
) -> crate::Result<()> {
    logger::init(&log_filter);

    let registry = Registry::from_config(&config.store).await?;
    log::info!("client registry uses the {} store", registry.store_kind());

    bootstrap_admin(&config, &registry).await?;

    let gateway: Arc<dyn CommandGateway> = Arc::new(TracedGateway::new(ProcessGateway::new(&config.gateway)));

    let coordinator = Coordinator::new(&config, registry.clone(), gateway)
        .map_err(|e| error::Error::Bootstrap(format!("invalid command template: {e}")))?;

    let state = api::AppState {
        coordinator: Arc::new(coordinator),
    };

    let mut app = api::router(state);

    if config.server.auth.enabled {
        app = app.layer(auth::AuthLayer::new(registry, config.admin.username.clone()));
    } else {
        log::warn!("operator authentication is disabled, the API is open to anyone who can reach it");
    }

    // Added after the auth layer, so health checks need no credentials.
    if config.server.health.enabled {
        app = app.route(&config.server.health.path, get(api::health));
    }

    let app: Router = app.layer(tracing::TracingLayer);

    let listener = TcpListener::bind(listen_address).await.map_err(error::Error::Bind)?;

    match &config.server.tls {
        Some(tls_config) => {
            // Several crypto backends may be linked in; pick one explicitly.
            let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| error::Error::Tls(e.to_string()))?;

            log::info!("vpnadmin API available at: https://{listen_address}/api");

            let std_listener = listener.into_std().map_err(error::Error::Bind)?;

            let handle = Handle::new();

            tokio::spawn({
                let handle = handle.clone();

                async move {
                    shutdown_signal.cancelled().await;
                    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                }
            });

            axum_server::from_tcp_rustls(std_listener, rustls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| error::Error::Server(std::io::Error::other(e)))?;
        }
        None => {
            log::info!("vpnadmin API available at: http://{listen_address}/api");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal.cancelled_owned())
                .await
                .map_err(error::Error::Server)?;
        }
    }

    log::info!("server stopped");

    Ok(())
}

/// Stores the configured admin credential unless the store already has one.
async fn bootstrap_admin(config: &Config, registry: &Registry) -> crate::Result<()> {
    let Some(password) = &config.admin.password else {
        return Ok(());
    };

    let username = &config.admin.username;

    let created = registry
        .ensure_admin(username, password)
        .await
        .map_err(|e| error::Error::Bootstrap(format!("failed to create admin user '{username}': {e}")))?;

    if created {
        log::info!("created admin user '{username}'");
    } else {
        log::debug!("admin user '{username}' already exists, keeping the stored credential");
    }

    Ok(())
}
