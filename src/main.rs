use anyhow::{Context, Result};
use chrono::Duration as TokenTtl;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use edushare::{
    AppConfig, AppState, DatabasePool, HttpOptions, MemoryStore, PasswordHashing,
    SecurityMiddlewareConfig, SecurityState, Store, TokenIssuer, UploadStore, create_app,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first - fails fast on a missing or weak JWT secret
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {:#}", e);
        eprintln!("Please check EDUSHARE_* environment variables.");
        e
    })?;

    init_logging(&config)?;

    info!("Starting EduShare API server");

    let store = open_store(&config).await?;

    let uploads = UploadStore::new(&config.storage.upload_dir);
    uploads
        .ensure_dir()
        .await
        .context("Failed to prepare upload directory")?;

    let tokens = TokenIssuer::new(
        config.auth.jwt_secret.as_bytes(),
        TokenTtl::hours(config.auth.token_ttl_hours),
    );

    let thresholds = config.reputation.to_thresholds();
    info!(
        upload_points = thresholds.upload_points,
        expert_min_ratings = thresholds.expert_min_ratings,
        expert_min_average = thresholds.expert_min_average,
        "Reputation system initialized"
    );

    let state = AppState::new(store, tokens, PasswordHashing::default(), thresholds, uploads);

    let security_state = SecurityState::new(SecurityMiddlewareConfig {
        rate_limit_per_minute: config.security.rate_limit_per_minute,
        log_requests: config.logging.log_requests,
    });
    spawn_rate_limiter_cleanup(&security_state);

    let app = create_app(
        state,
        security_state,
        &HttpOptions {
            enable_cors: config.security.enable_cors,
            max_body_bytes: config.storage.max_upload_bytes,
        },
    );

    let bind_addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("EduShare API listening on {}", bind_addr);
    info!(
        "Security middleware: Rate limit={}/min, Max body={}KB, CORS={}",
        config.security.rate_limit_per_minute,
        config.storage.max_upload_bytes / 1024,
        config.security.enable_cors
    );

    // Serve with connect info for client IP extraction
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the configured level when set.
fn init_logging(config: &AppConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string().to_lowercase()));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

/// PostgreSQL when enabled, otherwise the in-memory store
async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    if !config.database.postgres_enabled {
        warn!("PostgreSQL disabled, using in-memory store (data is lost on restart)");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = DatabasePool::new(
        &config.database.postgres_url,
        config.database.max_connections,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;

    pool.init_schema()
        .await
        .context("Failed to initialize database schema")?;

    info!("PostgreSQL store ready");
    Ok(Arc::new(pool))
}

fn spawn_rate_limiter_cleanup(security_state: &SecurityState) {
    let limiter = security_state.rate_limiter.clone();
    if !limiter.is_enabled() {
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
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
}
