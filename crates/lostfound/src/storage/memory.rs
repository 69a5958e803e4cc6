//! In-memory document store.
//!
//! Nothing survives a restart. Used by tests and by `store.backend = "memory"`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, DocumentStore};
use crate::error::{Error, Result};

/// Document store holding every collection in a map.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn collections(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .lock()
            .map_err(|_| Error::internal("document store lock poisoned"))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .collections()?
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.key == key))
            .map(|d| d.body.clone()))
    }

    async fn set(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        let mut collections = self.collections()?;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.key == key) {
            Some(existing) => existing.body = document.clone(),
            None => docs.push(Document {
                key: key.to_string(),
                body: document.clone(),
            }),
        }
        Ok(())
    }

    async fn add(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        let mut collections = self.collections()?;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.key == key) {
            return Err(Error::internal(format!(
                "document {collection}/{key} already exists"
            )));
        }
        docs.push(Document {
            key: key.to_string(),
            body: document.clone(),
        });
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        Ok(self
            .collections()?
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.body.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .collections()?
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collections()?.get(collection).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_and_overwrite() {
        let store = MemoryDocumentStore::new();
        store.set("users", "42", &json!({ "n": 1 })).await.unwrap();
        store.set("users", "42", &json!({ "n": 2 })).await.unwrap();

        assert_eq!(store.get("users", "42").await.unwrap(), Some(json!({ "n": 2 })));
        assert_eq!(store.count("users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_key() {
        let store = MemoryDocumentStore::new();
        store.add("items", "a", &json!({})).await.unwrap();
        assert!(store.add("items", "a", &json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_query_eq() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "7", &json!({ "idNumber": "X123" }))
            .await
            .unwrap();
        store
            .set("users", "8", &json!({ "idNumber": "Y456" }))
            .await
            .unwrap();

        let found = store
            .query_eq("users", "idNumber", &json!("X123"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "7");
        assert!(store
            .query_eq("missing", "idNumber", &json!("X123"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let store = MemoryDocumentStore::new();
        assert!(store.get_all("items").await.unwrap().is_empty());
        assert_eq!(store.count("items").await.unwrap(), 0);
    }
}
