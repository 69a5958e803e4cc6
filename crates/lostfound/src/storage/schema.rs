//! `SQLite` schema definitions for lostfound.
//!
//! Every collection shares one `documents` table; bodies are JSON text.

/// SQL statement to create the documents table.
pub const CREATE_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    PRIMARY KEY (collection, key)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_DOCUMENTS_TABLE, CREATE_METADATA_TABLE];

/// Index on the id number of stored profiles, used to find the owner of a
/// found ID. Added in schema version 2.
pub const CREATE_ID_NUMBER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_documents_id_number
ON documents(collection, json_extract(body, '$.idNumber'))
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_documents_table_contains_required_columns() {
        assert!(CREATE_DOCUMENTS_TABLE.contains("collection TEXT NOT NULL"));
        assert!(CREATE_DOCUMENTS_TABLE.contains("key TEXT NOT NULL"));
        assert!(CREATE_DOCUMENTS_TABLE.contains("body TEXT NOT NULL"));
        assert!(CREATE_DOCUMENTS_TABLE.contains("PRIMARY KEY (collection, key)"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
