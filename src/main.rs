//! MontirKu Backend Server
//!
//! REST API and WebSocket notifications for customers, mechanics and admins.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;

use montirku_server::config::Config;
use montirku_server::db::{self, Database};
use montirku_server::middleware::RateLimiter;
use montirku_server::routes::build_router;
use montirku_server::state::AppState;
use montirku_server::store::Stores;

/// How often idle rate-limit buckets are dropped
const RATE_LIMIT_CLEANUP: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %format!("{:#}", e), "Server failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        pricing = ?config.pricing,
        "Starting MontirKu server"
    );

    let (stores, database) = match config.database_url {
        Some(_) => {
            let pool = db::create_pool(&config)
                .await
                .context("Failed to connect to database")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            (Stores::postgres(pool.clone()), Some(Database::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            (Stores::in_memory(), None)
        }
    };

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let app_state =
        AppState::build(&config, stores, database).context("Failed to build application state")?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        app_state
            .auth_service
            .ensure_admin(email, password)
            .await
            .context("Failed to bootstrap admin account")?;
    }

    let rate_limiter =
        RateLimiter::new(config.rate_limit_rps).trust_proxy_headers(config.trust_proxy_headers);
    rate_limiter.spawn_cleanup(RATE_LIMIT_CLEANUP);

    let app = build_router(app_state, &config, rate_limiter);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket available at ws://{}/ws", addr);
    tracing::info!("Health check at http://{}/health", addr);

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
