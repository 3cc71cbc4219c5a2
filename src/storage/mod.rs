//! Storage layer for the practicum service layer
//!
//! Every entity lives in a remote document store addressed as named record
//! collections. The services only ever talk to [`DocumentStore`]; backends
//! are injected at construction time.

pub mod libsql;
pub mod memory;
pub mod paths;

use crate::error::Result;
use crate::types::Fields;
use async_trait::async_trait;

pub use paths::DocRef;

/// A stored record: identity plus raw fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Document store trait defining all required operations
///
/// Collections are slash-separated paths (`students/42/logs`). No operation
/// is transactional across records and writes are last-writer-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one record; `None` when it does not exist
    async fn get(&self, doc: &DocRef) -> Result<Option<Fields>>;

    /// Overwrite a record, creating it if needed
    async fn set(&self, doc: &DocRef, fields: Fields) -> Result<()>;

    /// Merge fields into a record, creating it if needed
    async fn merge(&self, doc: &DocRef, fields: Fields) -> Result<()>;

    /// Merge fields into an existing record; `NotFound` when absent
    async fn update(&self, doc: &DocRef, fields: Fields) -> Result<()>;

    /// Append a record with a store-assigned id and return that id
    async fn add(&self, collection: &str, fields: Fields) -> Result<String>;

    /// Delete a record (absent records are not an error)
    async fn delete(&self, doc: &DocRef) -> Result<()>;

    /// Every record of a collection
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Records of a collection whose `field` equals `value`
    async fn query_eq(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>>;
}
