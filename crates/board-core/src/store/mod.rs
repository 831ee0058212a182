//! Generic document store adapter.
//!
//! Engines never talk to a database directly. They read and write JSON
//! documents in named collections through [`DocumentStore`], which keeps
//! the persistence backend swappable:
//! - [`MemoryStore`] keeps everything in-process (tests, throwaway boards)
//! - [`SqliteStore`] persists documents in a single `SQLite` table
//!
//! Writes are plain read-modify-write sequences issued by the engines; no
//! adapter offers cross-document transactions.

pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A stored document body: a JSON object keyed by camelCase field names.
pub type Document = Map<String, Value>;

/// Length of generated document IDs.
pub const ID_LEN: usize = 20;

/// The four collections the board persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Problems,
    Comments,
    Notifications,
    Users,
}

impl Collection {
    /// Stable collection name used as the storage key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Problems => "problems",
            Self::Comments => "comments",
            Self::Notifications => "notifications",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "problems" => Ok(Self::Problems),
            "comments" => Ok(Self::Comments),
            "notifications" => Ok(Self::Notifications),
            "users" => Ok(Self::Users),
            other => Err(StoreError::UnknownCollection(other.to_string())),
        }
    }
}

/// A single field-equality condition. Queries AND all filters together.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if `doc` carries `field` with exactly `value`.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

/// A document together with the ID the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Document,
}

impl Record {
    /// Decode the record into a typed entity. The record ID is injected as
    /// the `id` field before deserializing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the document does not match `T`.
    pub fn decode<T: DeserializeOwned>(self, collection: Collection) -> Result<T, StoreError> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|source| StoreError::Corrupt {
            collection,
            id: self.id,
            source,
        })
    }
}

/// Errors raised by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{id} does not exist")]
    Missing { collection: Collection, id: String },

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("document {collection}/{id} is corrupt: {source}")]
    Corrupt {
        collection: Collection,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Storage operations the engines depend on.
///
/// Implementations must be safe to share across threads; every method takes
/// `&self` so one store can back several engines at once.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document under a generated ID and return that ID.
    fn create(&self, collection: Collection, fields: Document) -> Result<String, StoreError>;

    /// Create or fully replace the document stored under `id`.
    fn set(&self, collection: Collection, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Fetch a document, or `None` when it does not exist.
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>, StoreError>;

    /// Merge `fields` into an existing document. Fields not named are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] when the document does not exist.
    fn update(&self, collection: Collection, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Remove a document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] when the document does not exist.
    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Return every document matching all `filters`, in creation order.
    fn query(&self, collection: Collection, filters: &[Filter]) -> Result<Vec<Record>, StoreError>;

    /// The timestamp the store assigns to `createdAt` / `updatedAt`.
    fn server_timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Generate an opaque alphanumeric document ID.
#[must_use]
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Serialize a typed value into a document body.
///
/// # Errors
///
/// Returns [`StoreError::Encode`] if `value` does not serialize to a JSON object.
pub fn encode<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value).map_err(StoreError::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Encode(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        )))),
    }
}

/// Build a partial document from `(field, value)` pairs.
pub fn fields<I, K>(pairs: I) -> Document
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Timestamp value in the shape stored in documents.
#[must_use]
pub fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: String,
        name: String,
    }

    #[test]
    fn generated_ids_are_alphanumeric_and_distinct() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn collection_names_parse_back() {
        for c in [
            Collection::Problems,
            Collection::Comments,
            Collection::Notifications,
            Collection::Users,
        ] {
            assert_eq!(c.as_str().parse::<Collection>().expect("parse"), c);
        }
        assert!("widgets".parse::<Collection>().is_err());
    }

    #[test]
    fn decode_injects_record_id() {
        let record = Record {
            id: "abc".into(),
            fields: fields([("name", json!("bolt"))]),
        };
        let thing: Thing = record.decode(Collection::Problems).expect("decode");
        assert_eq!(
            thing,
            Thing {
                id: "abc".into(),
                name: "bolt".into()
            }
        );
    }

    #[test]
    fn decode_reports_corrupt_documents() {
        let record = Record {
            id: "abc".into(),
            fields: fields([("name", json!(42))]),
        };
        let err = record
            .decode::<Thing>(Collection::Comments)
            .expect_err("wrong type must fail");
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.to_string().contains("comments/abc"));
    }

    #[test]
    fn filter_requires_exact_value() {
        let doc = fields([("read", json!(false)), ("type", json!("watch"))]);
        assert!(Filter::equals("read", false).matches(&doc));
        assert!(!Filter::equals("read", true).matches(&doc));
        assert!(!Filter::equals("missing", "x").matches(&doc));
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode(&42).is_err());
        let doc = encode(&json!({"a": 1})).expect("object encodes");
        assert_eq!(doc.get("a"), Some(&json!(1)));
    }
}
