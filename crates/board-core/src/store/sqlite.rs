//! `SQLite`-backed document store.
//!
//! Runtime defaults follow the usual single-writer setup:
//! - `journal_mode = WAL` so readers never block the writer
//! - `busy_timeout = 5s` to ride out transient lock contention
//!
//! The connection is guarded by a mutex; each call is one short statement
//! (or one short transaction for merges).

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, ToSql, params, params_from_iter};
use serde_json::Value;
use tracing::debug;

use super::{Collection, Document, DocumentStore, Filter, Record, StoreError, generate_id, migrations};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`DocumentStore`] persisting every collection in one `SQLite` table.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store database, apply runtime pragmas, and
    /// migrate the schema to the latest version.
    ///
    /// # Errors
    ///
    /// Returns an error if opening/configuring/migrating the database fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create store directory {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("open store database {}", path.display()))?;
        Self::init(conn)
    }

    /// Open a private in-memory database (nothing survives the handle).
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` cannot allocate or migrate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory store")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        configure_connection(&conn).context("configure sqlite pragmas")?;
        migrations::migrate(&mut conn).context("apply store migrations")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

fn body_text(fields: &Document) -> Result<String, StoreError> {
    serde_json::to_string(fields).map_err(StoreError::Encode)
}

fn parse_body(collection: Collection, id: &str, body: &str) -> Result<Document, StoreError> {
    serde_json::from_str(body).map_err(|source| StoreError::Corrupt {
        collection,
        id: id.to_string(),
        source,
    })
}

/// `json_extract` over `field`, with the path inlined as a string literal.
///
/// The path must be literal SQL text rather than a bound parameter: `SQLite`
/// only matches the expression indexes from migration v2 against an
/// identical expression.
fn extract_expr(field: &str) -> String {
    let path = format!("$.\"{}\"", field.replace('"', ""));
    format!("json_extract(body, '{}')", path.replace('\'', "''"))
}

/// A scalar filter value bound as a SQL parameter.
enum Bound {
    Int(i64),
    Real(f64),
    Text(String),
}

impl ToSql for Bound {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            Self::Int(v) => v.to_sql(),
            Self::Real(v) => v.to_sql(),
            Self::Text(v) => v.to_sql(),
        }
    }
}

/// Translate the filters that `SQLite` can evaluate natively into a WHERE
/// fragment. Arrays and objects are left to the in-process re-check.
/// Parameter `?1` is reserved for the collection.
fn push_filters(sql: &mut String, bound: &mut Vec<Bound>, filters: &[Filter]) {
    for filter in filters {
        let scalar = match &filter.value {
            Value::Bool(b) => Bound::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(v) => Bound::Int(v),
                None => match n.as_f64() {
                    Some(v) => Bound::Real(v),
                    None => continue,
                },
            },
            Value::String(s) => Bound::Text(s.clone()),
            Value::Null => {
                sql.push_str(&format!(" AND {} IS NULL", extract_expr(&filter.field)));
                continue;
            }
            Value::Array(_) | Value::Object(_) => continue,
        };
        bound.push(scalar);
        sql.push_str(&format!(
            " AND {} = ?{}",
            extract_expr(&filter.field),
            bound.len() + 1
        ));
    }
}

/// The full SELECT for [`DocumentStore::query`], plus its filter parameters.
fn select_sql(filters: &[Filter]) -> (String, Vec<Bound>) {
    let mut sql = String::from("SELECT doc_id, body FROM documents WHERE collection = ?1");
    let mut bound = Vec::new();
    push_filters(&mut sql, &mut bound, filters);
    sql.push_str(" ORDER BY seq ASC");
    (sql, bound)
}

impl DocumentStore for SqliteStore {
    fn create(&self, collection: Collection, fields: Document) -> Result<String, StoreError> {
        let conn = self.lock()?;
        let body = body_text(&fields)?;
        let now = now_us();
        loop {
            let id = generate_id();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO documents
                    (collection, doc_id, body, created_at_us, updated_at_us)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![collection.as_str(), id, body, now],
            )?;
            if inserted == 1 {
                debug!(%collection, %id, "created document");
                return Ok(id);
            }
        }
    }

    fn set(&self, collection: Collection, id: &str, fields: Document) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let body = body_text(&fields)?;
        conn.execute(
            "INSERT INTO documents (collection, doc_id, body, created_at_us, updated_at_us)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (collection, doc_id)
             DO UPDATE SET body = excluded.body, updated_at_us = excluded.updated_at_us",
            params![collection.as_str(), id, body, now_us()],
        )?;
        debug!(%collection, %id, "set document");
        Ok(())
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>, StoreError> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|body| {
            Ok(Record {
                id: id.to_string(),
                fields: parse_body(collection, id, &body)?,
            })
        })
        .transpose()
    }

    fn update(&self, collection: Collection, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = body else {
            return Err(StoreError::Missing {
                collection,
                id: id.to_string(),
            });
        };

        let mut merged = parse_body(collection, id, &body)?;
        for (key, value) in fields {
            merged.insert(key, value);
        }
        tx.execute(
            "UPDATE documents SET body = ?3, updated_at_us = ?4
             WHERE collection = ?1 AND doc_id = ?2",
            params![collection.as_str(), id, body_text(&merged)?, now_us()],
        )?;
        tx.commit()?;
        debug!(%collection, %id, "updated document");
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
            params![collection.as_str(), id],
        )?;
        if removed == 0 {
            return Err(StoreError::Missing {
                collection,
                id: id.to_string(),
            });
        }
        debug!(%collection, %id, "deleted document");
        Ok(())
    }

    fn query(&self, collection: Collection, filters: &[Filter]) -> Result<Vec<Record>, StoreError> {
        let conn = self.lock()?;
        let (sql, bound) = select_sql(filters);

        let collection_param = Bound::Text(collection.as_str().to_string());
        let all_params = std::iter::once(&collection_param).chain(bound.iter());

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(all_params), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let fields = parse_body(collection, &id, &body)?;
            if filters.iter().all(|f| f.matches(&fields)) {
                records.push(Record { id, fields });
            }
        }
        Ok(records)
    }
}
