//! In-process document store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{Collection, Document, DocumentStore, Filter, Record, StoreError, generate_id};

#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    fields: Document,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    docs: BTreeMap<(Collection, String), Slot>,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// A [`DocumentStore`] backed by a mutex-guarded map.
///
/// Query results come back in insertion order, matching [`super::SqliteStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of documents currently stored in `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked while holding the lock.
    pub fn len(&self, collection: Collection) -> Result<usize, StoreError> {
        Ok(self
            .lock()?
            .docs
            .keys()
            .filter(|(c, _)| *c == collection)
            .count())
    }
}

impl DocumentStore for MemoryStore {
    fn create(&self, collection: Collection, fields: Document) -> Result<String, StoreError> {
        let mut inner = self.lock()?;
        let mut id = generate_id();
        while inner.docs.contains_key(&(collection, id.clone())) {
            id = generate_id();
        }
        let seq = inner.bump();
        inner.docs.insert((collection, id.clone()), Slot { seq, fields });
        debug!(%collection, %id, "created document");
        Ok(id)
    }

    fn set(&self, collection: Collection, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (collection, id.to_string());
        let seq = match inner.docs.get(&key) {
            Some(slot) => slot.seq,
            None => inner.bump(),
        };
        inner.docs.insert(key, Slot { seq, fields });
        debug!(%collection, %id, "set document");
        Ok(())
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .docs
            .get(&(collection, id.to_string()))
            .map(|slot| Record {
                id: id.to_string(),
                fields: slot.fields.clone(),
            }))
    }

    fn update(&self, collection: Collection, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let slot = inner
            .docs
            .get_mut(&(collection, id.to_string()))
            .ok_or_else(|| StoreError::Missing {
                collection,
                id: id.to_string(),
            })?;
        for (key, value) in fields {
            slot.fields.insert(key, value);
        }
        debug!(%collection, %id, "updated document");
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .docs
            .remove(&(collection, id.to_string()))
            .ok_or_else(|| StoreError::Missing {
                collection,
                id: id.to_string(),
            })?;
        debug!(%collection, %id, "deleted document");
        Ok(())
    }

    fn query(&self, collection: Collection, filters: &[Filter]) -> Result<Vec<Record>, StoreError> {
        let inner = self.lock()?;
        let mut hits: Vec<(u64, Record)> = inner
            .docs
            .iter()
            .filter(|((c, _), slot)| {
                *c == collection && filters.iter().all(|f| f.matches(&slot.fields))
            })
            .map(|((_, id), slot)| {
                (
                    slot.seq,
                    Record {
                        id: id.clone(),
                        fields: slot.fields.clone(),
                    },
                )
            })
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        Ok(hits.into_iter().map(|(_, record)| record).collect())
    }
}
