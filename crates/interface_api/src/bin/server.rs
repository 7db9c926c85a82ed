//! Warranty Desk - API Server Binary
//!
//! ```bash
//! API_DATABASE_URL=postgres://... API_JWT_SECRET=... cargo run --bin warranty-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - bind address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - token lifetime (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - used when `RUST_LOG` is unset (default: info)
//! * `API_BUSINESS_TIMEZONE` - IANA zone for calendar months (default: Europe/Oslo)
//! * `API_CACHE_TTL_SECS` - query cache lifetime (default: 300)
//! * `API_RETRY_MAX_ATTEMPTS` / `API_RETRY_BASE_DELAY_MS` - retry policy (default: 3 / 200)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_dashboard::DashboardService;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PgClaimsAdapter};
use interface_api::{config::ApiConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.business_timezone,
        "Starting Warranty Desk API Server"
    );

    let pool = create_pool(DatabaseConfig::new(config.database_url.clone())).await?;
    run_migrations(&pool).await?;

    let adapter = Arc::new(PgClaimsAdapter::new(pool));
    let service = DashboardService::over(adapter, config.dashboard_config()?);

    let app = create_router(service, config.clone());
    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for Ctrl+C or SIGTERM so in-flight requests can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
