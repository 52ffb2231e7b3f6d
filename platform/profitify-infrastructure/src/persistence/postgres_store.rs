use async_trait::async_trait;
use profitify_domain::repositories::item_store::{
    batch_keys, validate_identifier, Item, ItemStore, KeyKind, StoreError, TableSpec,
};
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client as PgClient, NoTls};

const ITEM_COLUMN: &str = "item";

/// Item store over PostgreSQL. Each table holds its key attributes as
/// columns next to the full item as JSONB.
///
/// The client pipelines concurrent queries, so one store is shared by all
/// workers without extra locking.
pub struct PostgresItemStore {
    client: PgClient,
}

impl PostgresItemStore {
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(db_url, NoTls)
            .await
            .map_err(|err| StoreError::Connection(format!("failed to connect to postgres: {err}")))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgres connection error");
            }
        });
        Ok(Self { client })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|err| StoreError::Connection(format!("postgres ping failed: {err}")))
    }
}

#[async_trait]
impl ItemStore for PostgresItemStore {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        // Quoted like the DDL so mixed-case names are not folded.
        let regclass = quote_table(table)?;
        let row = self
            .client
            .query_one("SELECT to_regclass($1::text) IS NOT NULL", &[&regclass])
            .await
            .map_err(|err| StoreError::Connection(format!("failed to describe table {table}: {err}")))?;
        Ok(row.get(0))
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError> {
        let sql = create_table_sql(spec)?;
        self.client.batch_execute(&sql).await.map_err(|err| {
            StoreError::Provisioning(format!("failed to create table {}: {err}", spec.name))
        })?;
        tracing::debug!(table = %spec.name, "postgres table created");
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        if !self.table_exists(table).await? {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        let sql = format!("DROP TABLE {}", quote_table(table)?);
        self.client.batch_execute(&sql).await.map_err(|err| {
            StoreError::Provisioning(format!("failed to delete table {table}: {err}"))
        })
    }

    async fn bulk_write(&self, table: &TableSpec, items: &[Item]) -> Result<(), StoreError> {
        let keys = batch_keys(items, table)?;
        let sql = upsert_sql(table, items.len())?;
        let docs: Vec<Value> = items.iter().cloned().map(Value::Object).collect();

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(items.len() * 3);
        for (key, doc) in keys.iter().zip(docs.iter()) {
            params.push(&key.partition);
            if let Some(sort) = key.sort.as_ref() {
                params.push(sort);
            }
            params.push(doc);
        }

        // One statement, so the batch commits or fails as a whole.
        self.client
            .execute(sql.as_str(), &params)
            .await
            .map(|_| ())
            .map_err(|err| StoreError::Write(format!("bulk write to {} failed: {err}", table.name)))
    }
}

fn quote_ident(value: &str) -> String {
    format!("\"{value}\"")
}

fn quote_table(name: &str) -> Result<String, StoreError> {
    validate_identifier(name).map_err(StoreError::Validation)?;
    Ok(name.split('.').map(quote_ident).collect::<Vec<_>>().join("."))
}

fn key_columns(spec: &TableSpec) -> Result<Vec<String>, StoreError> {
    spec.key_attributes()
        .map(|attr| {
            validate_identifier(&attr.name).map_err(StoreError::Validation)?;
            if attr.name == ITEM_COLUMN {
                return Err(StoreError::Validation(format!(
                    "key attribute may not be named {ITEM_COLUMN}"
                )));
            }
            Ok(quote_ident(&attr.name))
        })
        .collect()
}

pub(crate) fn create_table_sql(spec: &TableSpec) -> Result<String, StoreError> {
    let table = quote_table(&spec.name)?;
    let columns = key_columns(spec)?;
    let mut defs = Vec::with_capacity(columns.len() + 1);
    // Partition keys are stored in their string form whatever their kind.
    defs.push(format!("{} TEXT NOT NULL", columns[0]));
    if let Some(sort) = &spec.sort_key {
        let sql_type = match sort.kind {
            KeyKind::Number => "BIGINT",
            KeyKind::String => {
                return Err(StoreError::Validation(format!(
                    "string sort key {} is not supported",
                    sort.name
                )))
            }
        };
        defs.push(format!("{} {sql_type} NOT NULL", columns[1]));
    }
    defs.push(format!("{ITEM_COLUMN} JSONB NOT NULL"));
    Ok(format!(
        "CREATE TABLE {table} ({}, PRIMARY KEY ({}))",
        defs.join(", "),
        columns.join(", ")
    ))
}

pub(crate) fn upsert_sql(spec: &TableSpec, rows: usize) -> Result<String, StoreError> {
    let table = quote_table(&spec.name)?;
    let columns = key_columns(spec)?;
    let width = columns.len() + 1;

    let values = (0..rows)
        .map(|row| {
            let placeholders = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "INSERT INTO {table} ({}, {ITEM_COLUMN}) VALUES {values} \
         ON CONFLICT ({}) DO UPDATE SET {ITEM_COLUMN} = EXCLUDED.{ITEM_COLUMN}",
        columns.join(", "),
        columns.join(", ")
    ))
}
