use profitify_domain::repositories::item_store::{marshal_item, ItemStore, StoreError, TableSpec};
use profitify_domain::services::generator::SeriesSpec;
use profitify_infrastructure::persistence::postgres_store::PostgresItemStore;
use std::time::{SystemTime, UNIX_EPOCH};

fn should_run_db_tests() -> bool {
    std::env::var("PROFITIFY_DB_RUN_TESTS").ok().as_deref() == Some("1")
}

fn db_url() -> Option<String> {
    std::env::var("PROFITIFY_DB_URL").ok()
}

fn unique_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{}_{}", std::process::id(), now)
}

#[tokio::test]
async fn postgres_store_provisions_and_upserts_bars() {
    if !should_run_db_tests() {
        eprintln!("skipping: set PROFITIFY_DB_RUN_TESTS=1 to run");
        return;
    }
    let Some(url) = db_url() else {
        eprintln!("skipping: PROFITIFY_DB_URL not set");
        return;
    };

    let store = PostgresItemStore::connect(&url).await.expect("connect");
    store.ping().await.expect("ping");

    let table = TableSpec::daily_bars(&format!("daily_summary_test_{}", unique_suffix()));
    assert!(!store.table_exists(&table.name).await.expect("exists"));
    store.create_table(&table).await.expect("create");
    assert!(store.table_exists(&table.name).await.expect("exists"));

    let spec = SeriesSpec {
        symbol: "TEST".to_string(),
        base_price: 100.0,
        trading_days: 25,
        start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
        seed: 42,
    };
    let items: Vec<_> = spec
        .bars()
        .map(|bar| marshal_item(&bar, &table).expect("marshal"))
        .collect();
    store.bulk_write(&table, &items).await.expect("write");
    // Same keys again: upsert, not a conflict error.
    store.bulk_write(&table, &items[..10]).await.expect("rewrite");

    let duplicate = vec![items[0].clone(), items[0].clone()];
    assert!(matches!(
        store.bulk_write(&table, &duplicate).await,
        Err(StoreError::Validation(_))
    ));

    store.delete_table(&table.name).await.expect("delete");
    assert!(matches!(
        store.delete_table(&table.name).await,
        Err(StoreError::TableNotFound(_))
    ));
}

#[tokio::test]
async fn postgres_store_sees_mixed_case_tables_it_created() {
    if !should_run_db_tests() {
        eprintln!("skipping: set PROFITIFY_DB_RUN_TESTS=1 to run");
        return;
    }
    let Some(url) = db_url() else {
        eprintln!("skipping: PROFITIFY_DB_URL not set");
        return;
    };

    let store = PostgresItemStore::connect(&url).await.expect("connect");
    let table = TableSpec::tickers(&format!("SeedTickers_{}", unique_suffix()));
    assert!(!store.table_exists(&table.name).await.expect("exists"));
    store.create_table(&table).await.expect("create");
    assert!(store.table_exists(&table.name).await.expect("exists"));

    store.delete_table(&table.name).await.expect("delete");
    assert!(!store.table_exists(&table.name).await.expect("exists"));
}

#[tokio::test]
async fn connect_to_unreachable_server_is_a_connection_error() {
    if !should_run_db_tests() {
        return;
    }
    let result = PostgresItemStore::connect("postgres://nobody@127.0.0.1:1/none").await;
    assert!(matches!(result, Err(StoreError::Connection(_))));
}
