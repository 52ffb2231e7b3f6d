use crate::entities::ticker::TickerRecord;
use crate::value_objects::daily_bar::DailyBar;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Largest batch a single bulk write accepts.
pub const MAX_BULK_WRITE_ITEMS: usize = 25;

/// Wire representation of one stored item: attribute name -> value.
pub type Item = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub kind: KeyKind,
}

impl KeyAttribute {
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: KeyKind::String,
        }
    }

    pub fn number(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: KeyKind::Number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
}

impl TableSpec {
    /// Daily bars: partition by ticker, sorted by timestamp.
    pub fn daily_bars(name: &str) -> Self {
        Self {
            name: name.to_string(),
            partition_key: KeyAttribute::string("ticker"),
            sort_key: Some(KeyAttribute::number("timestamp")),
        }
    }

    /// Ticker metadata: partition by ticker only.
    pub fn tickers(name: &str) -> Self {
        Self {
            name: name.to_string(),
            partition_key: KeyAttribute::string("ticker"),
            sort_key: None,
        }
    }

    pub fn key_attributes(&self) -> impl Iterator<Item = &KeyAttribute> {
        std::iter::once(&self.partition_key).chain(self.sort_key.iter())
    }
}

/// Primary key extracted from a marshalled item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub partition: String,
    pub sort: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarshalError {
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("failed to serialize record: {0}")]
    Serialize(String),
    #[error("record did not serialize to an object")]
    NotAnObject,
    #[error("missing key attribute `{0}`")]
    MissingKey(String),
    #[error("key attribute `{name}` has the wrong type (expected {expected})")]
    KeyType { name: String, expected: &'static str },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("table already exists: {0}")]
    TableExists(String),
    #[error("batch of {size} items exceeds the bulk-write limit of {max}")]
    BatchTooLarge { size: usize, max: usize },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("provisioning failed: {0}")]
    Provisioning(String),
}

/// Storage port consumed by the seeding pipeline.
///
/// Implementations must be safe to share between concurrently running
/// workers. `bulk_write` is all-or-nothing from the caller's point of view.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError>;
    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError>;
    async fn delete_table(&self, table: &str) -> Result<(), StoreError>;
    async fn bulk_write(&self, table: &TableSpec, items: &[Item]) -> Result<(), StoreError>;
}

/// A record type the pipeline can marshal into an [`Item`].
pub trait StoreRecord: Serialize + Send + Sync + 'static {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Short label used in logs.
    fn label(&self) -> &str;
}

impl StoreRecord for DailyBar {
    fn validate(&self) -> Result<(), String> {
        DailyBar::validate(self)
    }

    fn label(&self) -> &str {
        &self.ticker
    }
}

impl StoreRecord for TickerRecord {
    fn validate(&self) -> Result<(), String> {
        TickerRecord::validate(self)
    }

    fn label(&self) -> &str {
        &self.ticker
    }
}

pub fn marshal_item<T: StoreRecord>(record: &T, table: &TableSpec) -> Result<Item, MarshalError> {
    record.validate().map_err(MarshalError::Invalid)?;
    let value =
        serde_json::to_value(record).map_err(|err| MarshalError::Serialize(err.to_string()))?;
    let Value::Object(item) = value else {
        return Err(MarshalError::NotAnObject);
    };
    item_key(&item, table)?;
    Ok(item)
}

pub fn item_key(item: &Item, table: &TableSpec) -> Result<ItemKey, MarshalError> {
    let partition = match item.get(&table.partition_key.name) {
        None | Some(Value::Null) => {
            return Err(MarshalError::MissingKey(table.partition_key.name.clone()))
        }
        Some(value) => key_as_string(value, &table.partition_key)?,
    };

    let sort = match &table.sort_key {
        None => None,
        Some(attr) => match item.get(&attr.name) {
            None | Some(Value::Null) => return Err(MarshalError::MissingKey(attr.name.clone())),
            Some(value) => Some(key_as_number(value, attr)?),
        },
    };

    Ok(ItemKey { partition, sort })
}

/// Store-side checks shared by adapters before a bulk write: size limit,
/// well-formed keys, no key repeated within the batch.
pub fn batch_keys(items: &[Item], table: &TableSpec) -> Result<Vec<ItemKey>, StoreError> {
    if items.is_empty() {
        return Err(StoreError::Validation("bulk write with no items".to_string()));
    }
    if items.len() > MAX_BULK_WRITE_ITEMS {
        return Err(StoreError::BatchTooLarge {
            size: items.len(),
            max: MAX_BULK_WRITE_ITEMS,
        });
    }
    let mut keys: Vec<ItemKey> = Vec::with_capacity(items.len());
    for item in items {
        let key = item_key(item, table).map_err(|err| StoreError::Validation(err.to_string()))?;
        if keys.contains(&key) {
            return Err(StoreError::Validation(format!(
                "duplicate key in batch: {}",
                key.partition
            )));
        }
        keys.push(key);
    }
    Ok(keys)
}

fn key_as_string(value: &Value, attr: &KeyAttribute) -> Result<String, MarshalError> {
    match (attr.kind, value) {
        (KeyKind::String, Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        (KeyKind::Number, _) => key_as_number(value, attr).map(|n| n.to_string()),
        _ => Err(MarshalError::KeyType {
            name: attr.name.clone(),
            expected: "non-empty string",
        }),
    }
}

fn key_as_number(value: &Value, attr: &KeyAttribute) -> Result<i64, MarshalError> {
    match (attr.kind, value.as_i64()) {
        (KeyKind::Number, Some(n)) => Ok(n),
        _ => Err(MarshalError::KeyType {
            name: attr.name.clone(),
            expected: "integer number",
        }),
    }
}

/// Accepts `name` or `schema.name` made of `[A-Za-z_][A-Za-z0-9_]*` parts.
pub fn validate_identifier(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("identifier is empty".to_string());
    }
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() > 2 {
        return Err(format!("invalid identifier: {value}"));
    }
    for part in parts {
        let mut chars = part.chars();
        let first = match chars.next() {
            Some(ch) => ch,
            None => return Err(format!("invalid identifier: {value}")),
        };
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(format!("invalid identifier: {value}"));
        }
        if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(format!("invalid identifier: {value}"));
        }
    }
    Ok(())
}
