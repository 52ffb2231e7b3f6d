use profitify_application::config::{Config, StoreBackend};
use profitify_domain::repositories::item_store::ItemStore;
use profitify_infrastructure::persistence::memory_store::MemoryItemStore;
use profitify_infrastructure::persistence::postgres_store::PostgresItemStore;
use std::env;
use std::sync::Arc;

pub fn resolve_db_url(config: &Config) -> Result<String, String> {
    match config.store.url.as_deref() {
        Some(url) if !url.trim().is_empty() => Ok(url.to_string()),
        _ => env::var("PROFITIFY_DB_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                "missing store.url in config and env PROFITIFY_DB_URL is not set".to_string()
            }),
    }
}

pub async fn build_store(config: &Config) -> Result<Arc<dyn ItemStore>, String> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; nothing will be persisted");
            Ok(Arc::new(MemoryItemStore::new()))
        }
        StoreBackend::Postgres => {
            let db_url = resolve_db_url(config)?;
            let store = PostgresItemStore::connect(&db_url)
                .await
                .map_err(|err| err.to_string())?;
            store.ping().await.map_err(|err| err.to_string())?;
            Ok(Arc::new(store))
        }
    }
}
