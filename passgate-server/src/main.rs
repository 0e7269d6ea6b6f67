//! Passgate Server - REST API for passkey registration and login
//!
//! Exposes the passgate-core ceremonies via HTTP endpoints:
//! - POST /api/passkey/begin-register, /api/passkey/finish-register
//! - POST /api/passkey/begin-login, /api/passkey/finish-login
//! - POST /api/passkey/has-passkey
//! - GET /api/auth/session, /health, /ready

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use passgate_core::Ceremonies;
use passgate_server::{create_router_with_config, AppState, Backends, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passgate_server=debug,passgate_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "Configuration loaded");
    if config.uses_dev_secret() {
        tracing::warn!("Session tokens are signed with the development secret");
    }

    let backends = Backends::from_config(&config).await?;
    let state = AppState::new(&config, backends)?;
    tracing::info!(
        rp_id = %state.ceremonies.relying_party().rp_id(),
        counter_policy = %state.ceremonies.authentication().counter_policy(),
        "Ceremonies ready"
    );

    // Expiry is enforced at take time; the sweeper only reclaims memory
    spawn_session_sweeper(
        Arc::clone(&state.ceremonies),
        Duration::from_secs(config.session_sweep_secs.max(1)),
    );

    let app = create_router_with_config(&config, state);

    let addr = config.socket_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_session_sweeper(ceremonies: Arc<Ceremonies>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = ceremonies.sweep_expired_sessions();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired challenge sessions");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
