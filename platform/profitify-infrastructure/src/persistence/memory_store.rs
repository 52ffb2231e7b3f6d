use async_trait::async_trait;
use parking_lot::RwLock;
use profitify_domain::repositories::item_store::{
    batch_keys, validate_identifier, Item, ItemKey, ItemStore, StoreError, TableSpec,
};
use std::collections::BTreeMap;

struct MemoryTable {
    spec: TableSpec,
    items: BTreeMap<ItemKey, Item>,
}

/// Process-local store with the same write semantics as the database
/// adapter. Backs `--store memory` dry runs and tests.
#[derive(Default)]
pub struct MemoryItemStore {
    tables: RwLock<BTreeMap<String, MemoryTable>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    pub fn item_count(&self, table: &str) -> Option<usize> {
        self.tables.read().get(table).map(|t| t.items.len())
    }

    /// Items of `table` in key order.
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.items.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().contains_key(table))
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError> {
        validate_identifier(&spec.name).map_err(StoreError::Validation)?;
        let mut tables = self.tables.write();
        if tables.contains_key(&spec.name) {
            return Err(StoreError::TableExists(spec.name.clone()));
        }
        tables.insert(
            spec.name.clone(),
            MemoryTable {
                spec: spec.clone(),
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        self.tables
            .write()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    async fn bulk_write(&self, table: &TableSpec, items: &[Item]) -> Result<(), StoreError> {
        let keys = batch_keys(items, table)?;
        let mut tables = self.tables.write();
        let stored = tables
            .get_mut(&table.name)
            .ok_or_else(|| StoreError::TableNotFound(table.name.clone()))?;
        if stored.spec != *table {
            return Err(StoreError::Validation(format!(
                "key schema mismatch for table {}",
                table.name
            )));
        }
        for (key, item) in keys.into_iter().zip(items.iter()) {
            stored.items.insert(key, item.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryItemStore;
    use profitify_domain::repositories::item_store::{
        marshal_item, Item, ItemStore, StoreError, TableSpec,
    };
    use profitify_domain::services::reference::REFERENCE_TICKERS;

    fn ticker_items(table: &TableSpec, count: usize) -> Vec<Item> {
        REFERENCE_TICKERS
            .iter()
            .take(count)
            .map(|t| marshal_item(&t.to_record(0), table).expect("marshal"))
            .collect()
    }

    #[tokio::test]
    async fn create_write_and_upsert() {
        let store = MemoryItemStore::new();
        let table = TableSpec::tickers("tickers");
        assert!(!store.table_exists("tickers").await.unwrap());
        store.create_table(&table).await.expect("create");
        assert!(store.table_exists("tickers").await.unwrap());

        store
            .bulk_write(&table, &ticker_items(&table, 10))
            .await
            .expect("write");
        store
            .bulk_write(&table, &ticker_items(&table, 12))
            .await
            .expect("overwrite");
        assert_eq!(store.item_count("tickers"), Some(12));
        assert_eq!(store.items("tickers")[0]["ticker"], "AAPL");
    }

    #[tokio::test]
    async fn rejects_missing_tables_and_oversized_batches() {
        let store = MemoryItemStore::new();
        let table = TableSpec::tickers("tickers");
        let err = store
            .bulk_write(&table, &ticker_items(&table, 1))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::TableNotFound("tickers".to_string()));

        store.create_table(&table).await.expect("create");
        let item = ticker_items(&table, 1).remove(0);
        let err = store
            .bulk_write(&table, &vec![item; 26])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge { .. }));
        assert_eq!(store.item_count("tickers"), Some(0));
    }

    #[tokio::test]
    async fn create_and_delete_report_conflicts() {
        let store = MemoryItemStore::new();
        let table = TableSpec::daily_bars("daily_summary");
        store.create_table(&table).await.expect("create");
        assert!(matches!(
            store.create_table(&table).await,
            Err(StoreError::TableExists(_))
        ));
        store.delete_table("daily_summary").await.expect("delete");
        assert!(matches!(
            store.delete_table("daily_summary").await,
            Err(StoreError::TableNotFound(_))
        ));
        assert!(store.table_names().is_empty());
        assert!(store
            .create_table(&TableSpec::tickers("bad name"))
            .await
            .is_err());
    }
}
