//! Backend entry-point: loads settings, connects adapters and serves the
//! progress and certificate API.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use backend::settings::AppSettings;

use server::{ServerConfig, build_http_state, create_server};

fn startup_error(context: &str, error: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {error}"))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| startup_error("configuration", err))?;
    let database_url = settings
        .database_url()
        .map_err(|err| startup_error("configuration", err))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|err| startup_error("configuration", err))?;

    if settings.run_migrations {
        run_pending_migrations(database_url)
            .await
            .map_err(|err| startup_error("migrations", err))?;
    }

    let pool = DbPool::new(
        PoolConfig::new(database_url).with_max_size(settings.db_max_connections()),
    )
    .await
    .map_err(|err| startup_error("database pool", err))?;

    let http_state = build_http_state(&settings, &pool).await?;
    let health_state = web::Data::new(HealthState::new());
    let config = ServerConfig::new(bind_addr).with_http_state(http_state);
    info!(bind_addr = %config.bind_addr(), "starting server");
    let server = create_server(health_state.clone(), config)?;
    let result = server.await;
    health_state.mark_unhealthy();
    result
}
