use tracing_subscriber::EnvFilter;

use hattra_api::config;
use hattra_api::database::DatabaseManager;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Hattra API in {:?} mode", config.environment);

    if config.database.auto_migrate {
        match DatabaseManager::pool().await {
            Ok(pool) => {
                if let Err(e) = DatabaseManager::migrate(&pool).await {
                    tracing::warn!("Automatic migration failed: {}", e);
                }
            }
            Err(e) => tracing::warn!("Skipping automatic migration, database unavailable: {}", e),
        }
    }

    // Allow tests or deployments to override port via env
    let port = std::env::var("HATTRA_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Hattra API listening on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, hattra_api::app()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
