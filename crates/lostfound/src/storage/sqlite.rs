//! `SQLite` document store.
//!
//! Documents are kept as JSON text in a single table keyed by
//! `(collection, key)`. Equality queries go through `json_extract`, so any
//! top-level field can be matched without a schema.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use super::{migrations, Document, DocumentStore};
use crate::error::{Error, Result};

/// Document store backed by a `SQLite` database file.
#[derive(Debug)]
pub struct SqliteDocumentStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file in bytes; 0 for in-memory databases.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Build the `json_extract` path for a top-level field.
    ///
    /// The path is inlined into SQL so that the expression index on
    /// `idNumber` applies, hence the restricted character set.
    fn field_path(field: &str) -> Result<String> {
        if field.is_empty()
            || !field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::internal(format!("invalid document field: {field:?}")));
        }
        Ok(format!("$.{field}"))
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<(String, String)> {
        Ok((row.get(0)?, row.get(1)?))
    }

    fn parse_documents(rows: Vec<(String, String)>) -> Result<Vec<Document>> {
        rows.into_iter()
            .map(|(key, body)| {
                Ok(Document {
                    key,
                    body: serde_json::from_str(&body)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .conn()?
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str(&b).map_err(Error::from))
            .transpose()
    }

    async fn set(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        let body = serde_json::to_string(document)?;
        self.conn()?.execute(
            r"
            INSERT INTO documents (collection, key, body) VALUES (?1, ?2, ?3)
            ON CONFLICT (collection, key) DO UPDATE SET
                body = excluded.body,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            ",
            params![collection, key, body],
        )?;
        debug!("Set document {}/{}", collection, key);
        Ok(())
    }

    async fn add(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        let body = serde_json::to_string(document)?;
        self.conn()?.execute(
            "INSERT INTO documents (collection, key, body) VALUES (?1, ?2, ?3)",
            params![collection, key, body],
        )?;
        debug!("Added document {}/{}", collection, key);
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        let path = Self::field_path(field)?;
        let needle = serde_json::to_string(value)?;
        let sql = format!(
            "SELECT key, body FROM documents
             WHERE collection = ?1 AND json_extract(body, '{path}') = json_extract(?2, '$')
             ORDER BY rowid"
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![collection, needle], Self::row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::parse_documents(rows)
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT key, body FROM documents WHERE collection = ?1 ORDER BY rowid")?;
        let rows = stmt
            .query_map([collection], Self::row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::parse_documents(rows)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
