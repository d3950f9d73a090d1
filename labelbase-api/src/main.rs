//! Labelbase API server binary
//!
//! Boots the HTTP surface over the core engine: loads configuration,
//! connects the PostgreSQL stores, runs migrations, and serves the axum
//! router.
//!
//! ```bash
//! cargo run -p labelbase-api
//! ```

use labelbase_api::{
    app::{build_router, AppState},
    config::Config,
};
use labelbase_core::store::postgres::{create_pool, run_migrations, PgStores};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labelbase_api=info,labelbase_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Labelbase API server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(&config.database.url, config.database.max_connections).await?;
    run_migrations(&pool).await?;

    let stores = PgStores::stores(pool.clone());
    let state = AppState::new(pool, stores, config.clone());
    let app = build_router(state);

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
