//! `SQLite` schema migrations for the document store.
//!
//! Each step's SQL also records its version in `store_meta`; this driver
//! only tracks `PRAGMA user_version`.

use super::schema;
use rusqlite::Connection;

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// The schema version recorded in `PRAGMA user_version`.
///
/// # Errors
///
/// Returns an error if querying `SQLite` fails or the stored value is
/// negative.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Bring the store schema up to [`LATEST_SCHEMA_VERSION`].
///
/// All pending steps run in one transaction: a failure leaves the database
/// at the version it was opened with.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let from = current_schema_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    let Some(last) = pending.last().map(|m| m.version) else {
        return Ok(from);
    };

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
    }
    tx.pragma_update(None, "user_version", i64::from(last))?;
    tx.commit()?;
    tracing::info!(from, to = last, "migrated store schema");
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use crate::store::schema;
    use rusqlite::{Connection, params};

    fn sqlite_object_exists(
        conn: &Connection,
        object_type: &str,
        object_name: &str,
    ) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            )",
            params![object_type, object_name],
            |row| row.get(0),
        )
    }

    #[test]
    fn migrate_empty_db_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        assert!(sqlite_object_exists(&conn, "table", "documents")?);
        assert!(sqlite_object_exists(&conn, "table", "store_meta")?);
        for index in schema::REQUIRED_INDEXES {
            assert!(
                sqlite_object_exists(&conn, "index", index)?,
                "missing expected index {index}"
            );
        }

        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let meta_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM store_meta", [], |row| row.get(0))?;
        assert_eq!(meta_rows, 1);

        let schema_version: i64 = conn.query_row(
            "SELECT schema_version FROM store_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(schema_version, i64::from(LATEST_SCHEMA_VERSION));

        Ok(())
    }

    #[test]
    fn migrate_upgrades_from_v1_keeping_documents() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.pragma_update(None, "user_version", 1_i64)?;
        conn.execute(
            "INSERT INTO documents (collection, doc_id, body, created_at_us, updated_at_us)
             VALUES ('problems', 'p1', '{\"title\":\"Late bus\",\"userId\":\"u1\"}', 1, 1)",
            [],
        )?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let owned: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents
             WHERE collection = 'problems' AND json_extract(body, '$.\"userId\"') = 'u1'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(owned, 1);

        let recorded: i64 = conn.query_row(
            "SELECT schema_version FROM store_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(recorded, 2);

        Ok(())
    }

    #[test]
    fn schema_rejects_unknown_collections_and_invalid_json() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;

        let bad_collection = conn.execute(
            "INSERT INTO documents (collection, doc_id, body, created_at_us, updated_at_us)
             VALUES ('widgets', 'w1', '{}', 1, 1)",
            [],
        );
        assert!(bad_collection.is_err());

        let bad_json = conn.execute(
            "INSERT INTO documents (collection, doc_id, body, created_at_us, updated_at_us)
             VALUES ('users', 'u1', 'not json', 1, 1)",
            [],
        );
        assert!(bad_json.is_err());

        Ok(())
    }
}
