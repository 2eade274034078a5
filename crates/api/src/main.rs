//! Storefront API Server

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use storefront_api::{
    routes::create_router,
    store::{MemoryStore, PgStore},
    AppState, Config,
};
use storefront_shared::{create_pool, run_migrations};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,storefront_api=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!("Starting Storefront API Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!(config = ?config, "Configuration loaded");

    let state = match config.database_url.clone() {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(&database_url, config.db_timeout).await?;
            run_migrations(&pool).await?;
            tracing::info!("Database connection established");

            let store = Arc::new(PgStore::new(pool));
            AppState::new(config.clone(), store.clone(), store)?
        }
        None => {
            tracing::warn!("DATABASE_URL not set - using in-memory store, data will not persist");
            let store = Arc::new(MemoryStore::new());
            AppState::new(config.clone(), store.clone(), store)?
        }
    };

    if let Some(admin) = &config.bootstrap_admin {
        let created = state
            .auth
            .ensure_admin(&admin.email, &admin.password, &admin.name)
            .await?;
        if !created {
            tracing::info!("Bootstrap admin already present");
        }
    }

    // Explicit origin allowlist
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    tracing::info!(
        allowed_origins = ?allowed_origins,
        "CORS configured with {} allowed origins",
        allowed_origins.len()
    );

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .expose_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_address;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
