use ranked_threads::config::Config;
use ranked_threads::database::{create_pool, run_migrations};
use ranked_threads::error::Result;
use ranked_threads::storage::{MemoryStore, PgStore, Storage};
use ranked_threads::{AppState, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ranked_threads=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Configuration loaded successfully");

    let store: Arc<dyn Storage> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config.db_max_connections).await?;
            tracing::info!("Database connection pool created");

            run_migrations(&pool).await?;
            tracing::info!("Database migrations completed");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = format!("{}:{}", config.host, config.port);

    // Create application
    let app = create_app(AppState::new(store, config));

    // Create listener
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
