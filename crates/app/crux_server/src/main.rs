//! Crux backend HTTP server binary.
//!
//! Reads configuration from flags, the environment and an optional `.env`,
//! migrates the database, then serves the API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use crux_api::config::{ApiConfig, DEVELOPMENT_ENV};
use crux_core::auth::jwt::JwtSecrets;
use crux_core::auth::queries::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,crux_api=debug,crux_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "crux_server", about = "Crux backend API server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/crux"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// HMAC secret for access tokens.
    #[arg(long, env = "ACCESS_TOKEN_SECRET_KEY", hide_env_values = true)]
    access_token_secret: String,

    /// HMAC secret for refresh tokens.
    #[arg(long, env = "REFRESH_TOKEN_SECRET_KEY", hide_env_values = true)]
    refresh_token_secret: String,

    /// Deployment environment (development, staging, production).
    #[arg(long, env = "APP_ENV", default_value = DEVELOPMENT_ENV)]
    app_env: String,

    /// Version reported in response envelopes. Defaults to the crate version.
    #[arg(long, env = "API_VERSION")]
    api_version: Option<String>,

    /// Origins allowed for credentialed CORS requests.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Mark auth cookies `Secure`. Defaults to on outside development.
    #[arg(long, env = "SECURE_COOKIES")]
    secure_cookies: Option<bool>,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    info!(port = args.port, env = %args.app_env, "starting crux_server");

    let secrets = JwtSecrets::new(args.access_token_secret, args.refresh_token_secret)?;
    let config = ApiConfig::new(
        format!("{}:{}", args.host, args.port),
        secrets,
        args.app_env,
        args.api_version,
        args.secure_cookies,
        &args.cors_origins,
    )?;

    info!(
        max_connections = args.max_connections,
        "configuring connection pool"
    );
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    crux_api::migrate(&pool).await?;

    let state = crux_api::AppState::new(Arc::new(PgStore::new(pool)), config.clone());
    let app = crux_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(
        addr = %listener.local_addr()?,
        secure_cookies = config.secure_cookies,
        cors_origins = config.cors_origins.len(),
        "REST API listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}
