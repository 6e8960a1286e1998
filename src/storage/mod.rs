//! Record store: named tables of keyed records, filtered queries, and the
//! file-backed gateway that loads and dumps them.

pub mod json;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::types::{Item, Resource};

pub use json::{JsonStore, PersistenceGateway, StorageBackend, backend_for_path};

/// Errors raised by the store and its backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("expected {0} table to exist")]
    MissingTable(&'static str),

    #[error("unknown file type for {}: only .json databases are supported", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed database document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{table} already contains `{key}`")]
    DuplicateKey { table: &'static str, key: String },

    #[error("{table} has no entry `{key}`")]
    NotFound { table: &'static str, key: String },

    #[error("{table}.{field} cannot be updated")]
    ImmutableField {
        table: &'static str,
        field: &'static str,
    },

    #[error("invalid value for {table}.{field}: {reason}")]
    InvalidValue {
        table: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl StoreError {
    /// A required table is absent from the loaded document.
    pub fn is_configuration(&self) -> bool {
        matches!(self, StoreError::MissingTable(_))
    }

    /// An insert or update was rejected by the table.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateKey { .. }
                | StoreError::NotFound { .. }
                | StoreError::ImmutableField { .. }
                | StoreError::InvalidValue { .. }
        )
    }
}

/// A record type stored in a named table and addressed by its primary key.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Named columns that can be filtered, ordered on, or updated.
    type Field: Copy + fmt::Display;

    /// Table name in the stored document.
    const TABLE: &'static str;

    fn key(&self) -> &str;
    fn set_key(&mut self, key: String);
    /// Fresh record with default column values.
    fn with_key(key: &str) -> Self;
    /// Formatted column value as used by filters and ordering.
    fn field(&self, field: Self::Field) -> Cow<'_, str>;
    fn set_field(&mut self, field: Self::Field, value: &str) -> Result<(), StoreError>;
}

/// Equality filter on a formatted column value.
#[derive(Debug, Clone)]
pub struct Filter<F> {
    pub field: F,
    pub value: String,
    pub negate: bool,
}

impl<F> Filter<F> {
    pub fn eq(field: F, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            negate: false,
        }
    }

    pub fn ne(field: F, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            negate: true,
        }
    }

    fn matches<R: Record<Field = F>>(&self, record: &R) -> bool
    where
        F: Copy,
    {
        (record.field(self.field) == self.value.as_str()) != self.negate
    }
}

/// Query parameters: all filters must match; results are ordered by
/// `order_by` (then primary key), or by primary key when unset.
#[derive(Debug, Clone)]
pub struct Query<F> {
    pub filters: Vec<Filter<F>>,
    pub order_by: Option<F>,
}

impl<F> Default for Query<F> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order_by: None,
        }
    }
}

impl<F> Query<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter<F>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: F) -> Self {
        self.order_by = Some(field);
        self
    }
}

/// Records of one type keyed by primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    entries: BTreeMap<String, R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R: Record> Table<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = R>) -> Result<Self, StoreError> {
        let mut table = Self::new();
        for record in records {
            table.insert_record(record)?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Records in primary-key order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.entries.values()
    }

    pub fn query(&self, query: &Query<R::Field>) -> Vec<&R> {
        let mut rows: Vec<&R> = self
            .entries
            .values()
            .filter(|record| query.filters.iter().all(|f| f.matches(*record)))
            .collect();
        if let Some(field) = query.order_by {
            // Stable sort keeps primary-key order among equal values.
            rows.sort_by(|a, b| a.field(field).cmp(&b.field(field)));
        }
        rows
    }

    /// Adds a record with default columns under `key`.
    pub fn insert(&mut self, key: &str) -> Result<(), StoreError> {
        self.insert_record(R::with_key(key))
    }

    pub fn insert_record(&mut self, record: R) -> Result<(), StoreError> {
        if self.entries.contains_key(record.key()) {
            return Err(StoreError::DuplicateKey {
                table: R::TABLE,
                key: record.key().to_string(),
            });
        }
        self.entries.insert(record.key().to_string(), record);
        Ok(())
    }

    pub fn update(&mut self, key: &str, field: R::Field, value: &str) -> Result<(), StoreError> {
        let record = self.entries.get_mut(key).ok_or_else(|| StoreError::NotFound {
            table: R::TABLE,
            key: key.to_string(),
        })?;
        record.set_field(field, value)
    }
}

impl<R: Record> Serialize for Table<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}

impl<'de, R: Record> Deserialize<'de> for Table<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut entries = BTreeMap::<String, R>::deserialize(deserializer)?;
        for (key, record) in entries.iter_mut() {
            record.set_key(key.clone());
        }
        Ok(Self { entries })
    }
}

/// The whole document: the two tables the board reads, plus any other tables
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    resources: Option<Table<Resource>>,
    items: Option<Table<Item>>,
    other: Map<String, Value>,
}

impl Database {
    pub fn new(resources: Table<Resource>, items: Table<Item>) -> Self {
        Self {
            resources: Some(resources),
            items: Some(items),
            other: Map::new(),
        }
    }

    pub fn resources(&self) -> Result<&Table<Resource>, StoreError> {
        self.resources
            .as_ref()
            .ok_or(StoreError::MissingTable(Resource::TABLE))
    }

    pub fn resources_mut(&mut self) -> Result<&mut Table<Resource>, StoreError> {
        self.resources
            .as_mut()
            .ok_or(StoreError::MissingTable(Resource::TABLE))
    }

    pub fn items(&self) -> Result<&Table<Item>, StoreError> {
        self.items
            .as_ref()
            .ok_or(StoreError::MissingTable(Item::TABLE))
    }

    pub fn items_mut(&mut self) -> Result<&mut Table<Item>, StoreError> {
        self.items
            .as_mut()
            .ok_or(StoreError::MissingTable(Item::TABLE))
    }

    /// Fails with a configuration error unless both board tables exist.
    pub fn validate(&self) -> Result<(), StoreError> {
        self.resources()?;
        self.items()?;
        Ok(())
    }

    pub fn remove_items_table(&mut self) -> Option<Table<Item>> {
        self.items.take()
    }

    pub(crate) fn from_document(mut document: Map<String, Value>) -> Result<Self, StoreError> {
        let resources = document
            .remove(Resource::TABLE)
            .map(serde_json::from_value)
            .transpose()?;
        let items = document
            .remove(Item::TABLE)
            .map(serde_json::from_value)
            .transpose()?;
        Ok(Self {
            resources,
            items,
            other: document,
        })
    }

    pub(crate) fn to_document(&self) -> Result<Map<String, Value>, StoreError> {
        let mut document = self.other.clone();
        if let Some(resources) = &self.resources {
            document.insert(Resource::TABLE.to_string(), serde_json::to_value(resources)?);
        }
        if let Some(items) = &self.items {
            document.insert(Item::TABLE.to_string(), serde_json::to_value(items)?);
        }
        Ok(document)
    }
}
