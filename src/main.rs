use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use hub_dispatch::api;
use hub_dispatch::config::Config;
use hub_dispatch::error::AppError;
use hub_dispatch::models::admin::{AdminPrincipal, Role};
use hub_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let state = AppState::new(config.zone_cache_ttl);
    if let Some(admin_id) = config.bootstrap_admin_id {
        state.admins.insert(
            admin_id,
            AdminPrincipal {
                id: admin_id,
                name: "bootstrap".to_string(),
                role: Role::SuperAdmin,
                assigned_hub: None,
            },
        );
        tracing::info!(admin_id = %admin_id, "bootstrap super admin seeded");
    }

    let app = api::rest::router(Arc::new(state));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        zone_cache_ttl_secs = config.zone_cache_ttl.as_secs(),
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
