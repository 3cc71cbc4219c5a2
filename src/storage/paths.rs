//! Record addresses used by the services
//!
//! Field names and collection names here are the wire contract with the
//! store and with the external import that seeds it.

use crate::error::{PracticumError, Result};
use std::fmt;

pub const STUDENTS: &str = "students";
pub const SCHOOLS: &str = "schools";
pub const CONTENT: &str = "content";
pub const FAQ: &str = "faq";
pub const SYSTEM_SETTINGS: &str = "system_settings";

/// Address of a single record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: String,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Trim an identity and reject blank or path-breaking values
pub fn normalize_id(what: &str, raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(PracticumError::MissingIdentifier(format!("{} is required", what)));
    }
    if id.contains('/') {
        return Err(PracticumError::Validation(format!(
            "{} must not contain '/': {}",
            what, id
        )));
    }
    Ok(id.to_string())
}

pub fn student(id: &str) -> DocRef {
    DocRef::new(STUDENTS, id)
}

pub fn school(id: &str) -> DocRef {
    DocRef::new(SCHOOLS, id)
}

pub fn student_logs(student_id: &str) -> String {
    format!("{}/{}/logs", STUDENTS, student_id)
}

pub fn student_microteachings(student_id: &str) -> String {
    format!("{}/{}/microteachings", STUDENTS, student_id)
}

/// Primary FAQ source: `content/faq` with an `items` sequence
pub fn faq_content() -> DocRef {
    DocRef::new(CONTENT, "faq")
}

/// Grounding corpus settings: `documents` sequence or legacy `content`
pub fn knowledge_base() -> DocRef {
    DocRef::new(SYSTEM_SETTINGS, "knowledgeBase")
}

pub fn import_history() -> DocRef {
    DocRef::new(SYSTEM_SETTINGS, "importHistory")
}
