//! Engines: stateless views over a [`DocumentStore`] that implement the
//! board's operations.
//!
//! Each engine borrows the store and the effective [`BoardConfig`]; build
//! them through [`crate::Board`] rather than by hand. Operations follow a
//! plain read-modify-write sequence and persist only the fields they change.

pub mod comment;
pub mod notification;
pub mod problem;
pub mod thread;
pub mod user;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::{BoardError, ErrorCode, Result};
use crate::store::{self, Collection, Document, DocumentStore, Record, StoreError};

pub use comment::{AcceptToggle, CommentEngine, ReactionToggle};
pub use notification::NotificationEngine;
pub use problem::{EmpathyToggle, ProblemEngine, WatchToggle};
pub use thread::{CommentForest, ThreadNode, build_threads};
pub use user::{MigrationReport, UserEngine};

/// Reject blank IDs before they reach the store.
fn require_id(id: &str, code: ErrorCode) -> Result<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(BoardError::validation(code, "id is blank"));
    }
    Ok(trimmed)
}

/// Map a store failure, turning `Missing` into the entity's not-found error.
fn store_error(err: StoreError, code: ErrorCode, entity: &'static str) -> BoardError {
    match err {
        StoreError::Missing { id, .. } => BoardError::not_found(code, entity, id),
        other => other.into(),
    }
}

/// Fetch and decode one entity, failing with `code` when it is absent.
fn load<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    code: ErrorCode,
    entity: &'static str,
) -> Result<T> {
    let record = store
        .get(collection, id)?
        .ok_or_else(|| BoardError::not_found(code, entity, id))?;
    Ok(record.decode(collection)?)
}

fn decode_all<T: DeserializeOwned>(collection: Collection, records: Vec<Record>) -> Result<Vec<T>> {
    records
        .into_iter()
        .map(|record| record.decode(collection).map_err(BoardError::from))
        .collect()
}

/// Encode an entity for a create/set call. The `id` field belongs to the
/// store key, not the body.
fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    let mut doc = store::encode(value)?;
    doc.remove("id");
    Ok(doc)
}

fn members_value(members: &BTreeSet<String>) -> Value {
    Value::Array(members.iter().cloned().map(Value::String).collect())
}

fn newest_first<T>(items: &mut Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) {
    // Reverse first so equal timestamps keep newest-inserted first.
    items.reverse();
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

/// Log a failed side effect that ran after the primary write succeeded.
/// The error is returned unchanged.
fn side_effect<T>(what: &'static str, subject: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        tracing::warn!(
            effect = what,
            subject,
            error = %err,
            "side effect failed after primary write"
        );
    }
    result
}

fn non_blank(value: &str) -> bool {
    !value.trim().is_empty()
}
