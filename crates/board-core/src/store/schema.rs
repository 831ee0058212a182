//! `SQLite` schema for the document store.
//!
//! Every collection shares one table:
//! - `documents` keeps the JSON body of each document, keyed by
//!   `(collection, doc_id)`; `seq` preserves creation order for queries
//! - `store_meta` tracks the applied schema version

/// Migration v1: document table plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL
        CHECK (collection IN ('problems', 'comments', 'notifications', 'users')),
    doc_id TEXT NOT NULL CHECK (length(trim(doc_id)) > 0),
    body TEXT NOT NULL CHECK (json_valid(body)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    UNIQUE (collection, doc_id)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: expression indexes for the equality filters engines issue
/// on every read path (owner, parent problem, recipient). Queries must spell
/// the same `json_extract` expression for these to be used.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_documents_user
    ON documents(collection, json_extract(body, '$."userId"'));

CREATE INDEX IF NOT EXISTS idx_documents_problem
    ON documents(collection, json_extract(body, '$."problemId"'));

CREATE INDEX IF NOT EXISTS idx_documents_recipient
    ON documents(collection, json_extract(body, '$."recipientId"'));

UPDATE store_meta SET schema_version = 2 WHERE id = 1;
"#;

/// Indexes that must exist after all migrations are applied.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_documents_user",
    "idx_documents_problem",
    "idx_documents_recipient",
];
