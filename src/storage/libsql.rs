//! LibSQL document store backend
//!
//! Holds every record as a JSON object in a single `documents` table keyed by
//! `(collection, id)`. Works against a local file, an in-memory database, or
//! a remote libSQL endpoint.

use crate::error::{PracticumError, Result};
use crate::storage::{DocRef, Document, DocumentStore};
use crate::types::Fields;
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)
"#;

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
    /// Remote database (Turso Cloud)
    Remote { url: String, token: String },
}

/// LibSQL-backed document store
pub struct LibsqlStore {
    _db: Database,
    // In-memory databases are per connection, so one connection is kept for
    // the lifetime of the store.
    conn: Connection,
}

fn read_err(e: impl std::fmt::Display) -> PracticumError {
    PracticumError::StoreRead(e.to_string())
}

fn write_err(e: impl std::fmt::Display) -> PracticumError {
    PracticumError::StoreWrite(e.to_string())
}

impl LibsqlStore {
    /// Open (and if needed create) a store
    ///
    /// # Example
    /// ```ignore
    /// let store = LibsqlStore::new(ConnectionMode::Local("practicum.db".into())).await?;
    /// ```
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        info!("Connecting to LibSQL database: {:?}", redacted(&mode));

        let db = match mode {
            ConnectionMode::Local(ref path) => {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Builder::new_local(path).build().await.map_err(|e| {
                    PracticumError::StoreRead(format!("Failed to open database {}: {}", path, e))
                })?
            }
            ConnectionMode::InMemory => Builder::new_local(":memory:")
                .build()
                .await
                .map_err(|e| {
                    PracticumError::StoreRead(format!("Failed to create in-memory database: {}", e))
                })?,
            ConnectionMode::Remote { ref url, ref token } => {
                Builder::new_remote(url.clone(), token.clone())
                    .build()
                    .await
                    .map_err(|e| {
                        PracticumError::StoreRead(format!("Failed to create remote database: {}", e))
                    })?
            }
        };

        let conn = db
            .connect()
            .map_err(|e| PracticumError::StoreRead(format!("Failed to get connection: {}", e)))?;

        conn.execute(SCHEMA, ())
            .await
            .map_err(|e| PracticumError::StoreWrite(format!("Failed to initialise schema: {}", e)))?;

        debug!("Document table ready");
        Ok(Self { _db: db, conn })
    }

    async fn write_fields(&self, doc: &DocRef, fields: &Fields) -> Result<()> {
        let data = serde_json::to_string(fields)?;
        self.conn
            .execute(
                "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![
                    doc.collection.clone(),
                    doc.id.clone(),
                    data,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn collect_rows(&self, mut rows: libsql::Rows) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await.map_err(read_err)? {
            let id: String = row.get(0).map_err(read_err)?;
            let data: String = row.get(1).map_err(read_err)?;
            documents.push(Document::new(id, serde_json::from_str(&data)?));
        }
        Ok(documents)
    }
}

/// Connection mode with the remote token hidden, for logging
fn redacted(mode: &ConnectionMode) -> ConnectionMode {
    match mode {
        ConnectionMode::Remote { url, .. } => ConnectionMode::Remote {
            url: url.clone(),
            token: "***".to_string(),
        },
        other => other.clone(),
    }
}

#[async_trait]
impl DocumentStore for LibsqlStore {
    async fn get(&self, doc: &DocRef) -> Result<Option<Fields>> {
        debug!("Reading {}", doc);
        let mut rows = self
            .conn
            .query(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![doc.collection.clone(), doc.id.clone()],
            )
            .await
            .map_err(read_err)?;

        match rows.next().await.map_err(read_err)? {
            Some(row) => {
                let data: String = row.get(0).map_err(read_err)?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        debug!("Writing {}", doc);
        self.write_fields(doc, &fields).await
    }

    async fn merge(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        debug!("Merging into {}", doc);
        let mut existing = self.get(doc).await?.unwrap_or_default();
        existing.extend(fields);
        self.write_fields(doc, &existing).await
    }

    async fn update(&self, doc: &DocRef, fields: Fields) -> Result<()> {
        debug!("Updating {}", doc);
        let mut existing = self
            .get(doc)
            .await?
            .ok_or_else(|| PracticumError::NotFound(doc.to_string()))?;
        existing.extend(fields);
        self.write_fields(doc, &existing).await
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        debug!("Adding {}/{}", collection, id);
        self.write_fields(&DocRef::new(collection, id.clone()), &fields)
            .await?;
        Ok(id)
    }

    async fn delete(&self, doc: &DocRef) -> Result<()> {
        debug!("Deleting {}", doc);
        self.conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![doc.collection.clone(), doc.id.clone()],
            )
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        debug!("Listing {}", collection);
        let rows = self
            .conn
            .query(
                "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id",
                params![collection.to_string()],
            )
            .await
            .map_err(read_err)?;
        self.collect_rows(rows).await
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        debug!("Querying {} where {} == {}", collection, field, value);
        let rows = self
            .conn
            .query(
                "SELECT id, data FROM documents
                 WHERE collection = ?1 AND CAST(json_extract(data, ?2) AS TEXT) = ?3
                 ORDER BY id",
                params![
                    collection.to_string(),
                    format!("$.\"{}\"", field),
                    value.to_string()
                ],
            )
            .await
            .map_err(read_err)?;
        self.collect_rows(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = LibsqlStore::new(ConnectionMode::InMemory).await.unwrap();
        let doc = DocRef::new("schools", "s1");

        store.set(&doc, fields(json!({ "name": "SOŠ Benešov" }))).await.unwrap();
        store.merge(&doc, fields(json!({ "city": "Benešov" }))).await.unwrap();

        let stored = store.get(&doc).await.unwrap().unwrap();
        assert_eq!(stored.get("name"), Some(&json!("SOŠ Benešov")));
        assert_eq!(stored.get("city"), Some(&json!("Benešov")));

        store.delete(&doc).await.unwrap();
        assert_eq!(store.get(&doc).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_matches_numeric_and_text_values() {
        let store = LibsqlStore::new(ConnectionMode::InMemory).await.unwrap();
        store
            .set(&DocRef::new("students", "1"), fields(json!({ "schoolId": "17" })))
            .await
            .unwrap();
        store
            .set(&DocRef::new("students", "2"), fields(json!({ "schoolId": 17 })))
            .await
            .unwrap();
        store
            .set(&DocRef::new("students", "3"), fields(json!({ "schoolId": "18" })))
            .await
            .unwrap();

        let found = store.query_eq("students", "schoolId", "17").await.unwrap();
        let ids: Vec<_> = found.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = LibsqlStore::new(ConnectionMode::InMemory).await.unwrap();
        let result = store
            .update(&DocRef::new("students", "404"), fields(json!({ "name": "X" })))
            .await;
        assert!(matches!(result, Err(PracticumError::NotFound(_))));
    }
}
