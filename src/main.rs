use actix_web::HttpServer;
use lms_session_api::{
    AppState, MemoryStore, ObservabilityConfig, SqliteStore, StoreConfig, create_app,
};
use std::{env, sync::Arc};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let observability = ObservabilityConfig::from_env();
    init_tracing(&observability);

    let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let (state, sqlite) = match StoreConfig::from_env().database_url {
        Some(url) => {
            let store = SqliteStore::connect(&url)
                .await
                .map_err(std::io::Error::other)?;
            tracing::info!("using SQLite session store");
            let state = AppState::from_env(Arc::new(store.clone()), Arc::new(store.clone()))
                .map_err(std::io::Error::other)?;
            (state, Some(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; sessions are kept in memory only");
            let store = MemoryStore::new();
            let state = AppState::from_env(Arc::new(store.clone()), Arc::new(store))
                .map_err(std::io::Error::other)?;
            (state, None)
        }
    };

    tracing::info!(address = %bind_address, "server starting");

    HttpServer::new(move || create_app(state.clone()))
        .bind(&bind_address)?
        .run()
        .await?;

    if let Some(store) = sqlite {
        store.close().await;
    }
    tracing::info!("server stopped");
    Ok(())
}
