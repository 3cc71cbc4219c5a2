//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use practicum_core::storage::paths;
use practicum_core::{
    DocRef, Document, DocumentStore, Fields, InMemoryStore, PracticeLedger, PracticumError,
    Result,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// JSON object literal to a field map
pub fn fields(value: Value) -> Fields {
    value
        .as_object()
        .cloned()
        .expect("fixture must be a JSON object")
}

/// Store wrapper that fails selected operations
///
/// Reads fail for any collection (or record collection) in `failing_reads`,
/// `query_eq` also fails for collections in `failing_queries`, and deletes
/// fail for any record id in `failing_deletes`.
pub struct FlakyStore {
    pub inner: InMemoryStore,
    failing_reads: Mutex<HashSet<String>>,
    failing_queries: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            failing_reads: Mutex::new(HashSet::new()),
            failing_queries: Mutex::new(HashSet::new()),
            failing_deletes: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_reads_of(self, collection: impl Into<String>) -> Self {
        self.failing_reads.lock().unwrap().insert(collection.into());
        self
    }

    /// Fail only filtered queries of a collection; plain reads still work
    pub fn fail_queries_of(self, collection: impl Into<String>) -> Self {
        self.failing_queries.lock().unwrap().insert(collection.into());
        self
    }

    pub fn fail_delete_of(self, id: impl Into<String>) -> Self {
        self.failing_deletes.lock().unwrap().insert(id.into());
        self
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        self.failing_reads.lock().unwrap().clear();
        self.failing_queries.lock().unwrap().clear();
        self.failing_deletes.lock().unwrap().clear();
    }

    fn check_read(&self, collection: &str) -> Result<()> {
        if self.failing_reads.lock().unwrap().contains(collection) {
            return Err(PracticumError::StoreRead(format!("permission denied: {}", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, doc: &DocRef) -> Result<Option<Fields>> {
        self.check_read(&doc.collection)?;
        self.inner.get(doc).await
    }

    async fn set(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        self.inner.set(doc, fields).await
    }

    async fn merge(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        self.inner.merge(doc, fields).await
    }

    async fn update(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        self.inner.update(doc, fields).await
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        self.inner.add(collection, fields).await
    }

    async fn delete(&self, doc: &DocRef) -> Result<()> {
        if self.failing_deletes.lock().unwrap().contains(&doc.id) {
            return Err(PracticumError::StoreWrite(format!("delete rejected: {}", doc)));
        }
        self.inner.delete(doc).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        self.check_read(collection)?;
        self.inner.list(collection).await
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        self.check_read(collection)?;
        if self.failing_queries.lock().unwrap().contains(collection) {
            return Err(PracticumError::StoreRead(format!("query rejected: {}", collection)));
        }
        self.inner.query_eq(collection, field, value).await
    }
}

/// Seed a student record
pub async fn put_student(store: &dyn DocumentStore, id: &str, data: Value) {
    store
        .set(&paths::student(id), fields(data))
        .await
        .expect("Failed to seed student");
}

/// Seed a school record
pub async fn put_school(store: &dyn DocumentStore, id: &str, name: &str) {
    store
        .set(&paths::school(id), fields(serde_json::json!({ "name": name })))
        .await
        .expect("Failed to seed school");
}

/// Ledger over a shared store
pub fn ledger_for(store: Arc<dyn DocumentStore>) -> Arc<PracticeLedger> {
    Arc::new(PracticeLedger::new(store))
}
