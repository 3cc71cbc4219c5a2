//! In-memory document store
//!
//! Ordered maps behind a tokio `RwLock`. Used by tests and by embedders
//! that do not need persistence. Counts writes so callers can assert that
//! an operation did (or did not) touch the store.

use crate::error::{PracticumError, Result};
use crate::storage::{DocRef, Document, DocumentStore};
use crate::types::Fields;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

type Collection = BTreeMap<String, Fields>;

/// Document store held entirely in process memory
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write operations performed so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, doc: &DocRef) -> Result<Option<Fields>> {
        debug!("Reading {}", doc);
        let collections = self.collections.read().await;
        Ok(collections
            .get(&doc.collection)
            .and_then(|c| c.get(&doc.id))
            .cloned())
    }

    async fn set(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        debug!("Writing {}", doc);
        let mut collections = self.collections.write().await;
        collections
            .entry(doc.collection.clone())
            .or_default()
            .insert(doc.id.clone(), fields);
        self.record_write();
        Ok(())
    }

    async fn merge(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        debug!("Merging into {}", doc);
        let mut collections = self.collections.write().await;
        let existing = collections
            .entry(doc.collection.clone())
            .or_default()
            .entry(doc.id.clone())
            .or_default();
        existing.extend(fields);
        self.record_write();
        Ok(())
    }

    async fn update(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        debug!("Updating {}", doc);
        let mut collections = self.collections.write().await;
        let existing = collections
            .get_mut(&doc.collection)
            .and_then(|c| c.get_mut(&doc.id))
            .ok_or_else(|| PracticumError::NotFound(doc.to_string()))?;
        existing.extend(fields);
        self.record_write();
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        debug!("Adding {}/{}", collection, id);
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        self.record_write();
        Ok(id)
    }

    async fn delete(&self, doc: &DocRef) -> Result<()> {
        debug!("Deleting {}", doc);
        let mut collections = self.collections.write().await;
        if let Some(collection) = collections.get_mut(&doc.collection) {
            collection.remove(&doc.id);
        }
        self.record_write();
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        debug!("Listing {}", collection);
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        debug!("Querying {} where {} == {}", collection, field, value);
        let matches = |fields: &Fields| match fields.get(field) {
            Some(Value::String(s)) => s == value,
            Some(Value::Number(n)) => n.to_string() == value,
            _ => false,
        };
        Ok(self
            .list(collection)
            .await?
            .into_iter()
            .filter(|doc| matches(&doc.fields))
            .collect())
    }
}
