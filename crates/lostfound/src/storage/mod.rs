//! Storage layer for lostfound.
//!
//! Profiles and reports live in a schemaless document store with two
//! collections: `users`, keyed by identity, and `items`, append-only. The
//! [`DocumentStore`] trait is the seam between the bot and a backend;
//! [`Registry`] adds the typed profile and report operations on top.

pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::StorageBackend;
use crate::error::{Error, Result};
use crate::model::{Identity, Profile, Report};

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// Collection holding one profile per identity.
pub const USERS: &str = "users";

/// Collection holding item reports.
pub const ITEMS: &str = "items";

/// A stored document and its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Key of the document inside its collection.
    pub key: String,
    /// The document body, always a JSON object.
    pub body: Value,
}

/// A keyed store of JSON documents grouped into named collections.
///
/// Documents are opaque to the store; no schema is enforced.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Get a document by key.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>>;

    /// Create or overwrite the document at `key`.
    async fn set(&self, collection: &str, key: &str, document: &Value) -> Result<()>;

    /// Insert a new document; fails if `key` is already taken.
    async fn add(&self, collection: &str, key: &str, document: &Value) -> Result<()>;

    /// All documents whose top-level `field` equals `value`, oldest first.
    async fn query_eq(&self, collection: &str, field: &str, value: &Value)
        -> Result<Vec<Document>>;

    /// Every document in the collection, oldest first.
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Number of documents in the collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Open the document store selected by `backend`.
///
/// `database_path` is only used by the `SQLite` backend.
///
/// # Errors
///
/// Returns an error if the database cannot be opened.
pub fn open_store(backend: StorageBackend, database_path: &Path) -> Result<Arc<dyn DocumentStore>> {
    match backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteDocumentStore::open(database_path)?)),
        StorageBackend::Memory => {
            warn!("Using the in-memory store; profiles and reports will not persist");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

/// Typed access to profiles and reports.
#[derive(Debug, Clone)]
pub struct Registry {
    store: Arc<dyn DocumentStore>,
}

impl Registry {
    /// Wrap a document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Get the underlying document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Look up the profile registered by `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the document is malformed.
    pub async fn profile(&self, identity: Identity) -> Result<Option<Profile>> {
        let key = identity.document_key();
        match self.store.get(USERS, &key).await? {
            Some(body) => decode(USERS, &key, body).map(Some),
            None => Ok(None),
        }
    }

    /// Store `profile` under `identity`, replacing any previous profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn save_profile(&self, identity: Identity, profile: &Profile) -> Result<()> {
        let body = serde_json::to_value(profile)?;
        self.store
            .set(USERS, &identity.document_key(), &body)
            .await?;
        debug!("Saved profile for identity {}", identity);
        Ok(())
    }

    /// Find the first profile registered with `id_number`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the document is malformed.
    pub async fn find_by_id_number(&self, id_number: &str) -> Result<Option<Profile>> {
        let value = Value::String(id_number.to_string());
        let matches = self.store.query_eq(USERS, "idNumber", &value).await?;
        match matches.into_iter().next() {
            Some(doc) => decode(USERS, &doc.key, doc.body).map(Some),
            None => Ok(None),
        }
    }

    /// Append a report and return its document key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the key is already taken.
    pub async fn append_report(&self, report: &Report) -> Result<String> {
        let key = report.document_key();
        let body = serde_json::to_value(report)?;
        self.store.add(ITEMS, &key, &body).await?;
        debug!("Appended {} report {}", report.kind, key);
        Ok(key)
    }

    /// All reports, oldest first.
    ///
    /// Documents that do not decode as reports are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn reports(&self) -> Result<Vec<Report>> {
        let docs = self.store.get_all(ITEMS).await?;
        let reports = docs
            .into_iter()
            .filter_map(|doc| match decode::<Report>(ITEMS, &doc.key, doc.body) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Skipping unreadable report: {}", e);
                    None
                }
            })
            .collect();
        Ok(reports)
    }

    /// Count stored profiles and reports.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn stats(&self) -> Result<RegistryStats> {
        Ok(RegistryStats {
            profiles: self.store.count(USERS).await?,
            reports: self.store.count(ITEMS).await?,
        })
    }
}

/// Statistics about the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of registered profiles.
    pub profiles: usize,
    /// Number of filed reports.
    pub reports: usize,
}

fn decode<T: serde::de::DeserializeOwned>(collection: &str, key: &str, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| Error::document_decode(collection, key, e.to_string()))
}
