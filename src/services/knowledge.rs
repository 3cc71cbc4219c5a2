//! Knowledge corpus resolver
//!
//! Manages the ordered set of policy documents that ground the assistant
//! and decides which text the assistant is grounded in. Selection is a
//! fixed fallback chain over whole documents, not a search.

use crate::error::{PracticumError, Result};
use crate::storage::{paths, DocumentStore};
use crate::types::{text_field, Fields, KnowledgeDocument};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Built-in grounding text: the institution's practice guidelines
pub const DEFAULT_INSTRUCTION: &str = include_str!("../data/default_instruction.txt");

/// Separator placed between uploaded documents
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// One rule of the grounding fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingRule {
    /// Every uploaded document's content, in sequence order
    UploadedDocuments,
    /// The settings record's legacy single `content` field
    LegacyContent,
    /// [`DEFAULT_INSTRUCTION`]
    BuiltInDefault,
}

impl GroundingRule {
    /// Evaluation order; the first rule that yields text wins
    pub const CHAIN: [GroundingRule; 3] = [
        GroundingRule::UploadedDocuments,
        GroundingRule::LegacyContent,
        GroundingRule::BuiltInDefault,
    ];

    /// Text this rule yields for the given settings record, if any
    pub fn apply(&self, settings: Option<&Fields>) -> Option<String> {
        match self {
            GroundingRule::UploadedDocuments => {
                let documents = settings?.get("documents")?.as_array()?;
                if documents.is_empty() {
                    return None;
                }
                let contents: Vec<String> = documents
                    .iter()
                    .filter_map(KnowledgeDocument::from_value)
                    .map(|d| d.content)
                    .collect();
                Some(contents.join(DOCUMENT_SEPARATOR))
            }
            GroundingRule::LegacyContent => match settings?.get("content")? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            },
            GroundingRule::BuiltInDefault => Some(DEFAULT_INSTRUCTION.to_string()),
        }
    }
}

/// Run the fallback chain over a (possibly absent) settings record
pub fn resolve_from(settings: Option<&Fields>) -> (GroundingRule, String) {
    GroundingRule::CHAIN
        .iter()
        .find_map(|rule| rule.apply(settings).map(|text| (*rule, text)))
        .unwrap_or_else(|| (GroundingRule::BuiltInDefault, DEFAULT_INSTRUCTION.to_string()))
}

fn decode_documents(settings: Option<&Fields>) -> Vec<KnowledgeDocument> {
    settings
        .and_then(|s| s.get("documents"))
        .and_then(Value::as_array)
        .map(|docs| docs.iter().filter_map(KnowledgeDocument::from_value).collect())
        .unwrap_or_default()
}

/// Knowledge corpus service
pub struct KnowledgeCorpus {
    store: Arc<dyn DocumentStore>,
}

impl KnowledgeCorpus {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Text the assistant is grounded in
    ///
    /// Never fails: an unreadable settings record falls back to the
    /// built-in text so the assistant can still answer.
    pub async fn resolve_grounding_text(&self) -> String {
        let settings = match self.store.get(&paths::knowledge_base()).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to read knowledge base, using built-in text: {}", e);
                None
            }
        };

        let (rule, text) = resolve_from(settings.as_ref());
        debug!("Grounding resolved by {:?} ({} chars)", rule, text.chars().count());
        text
    }

    /// Current document sequence; empty when nothing was ever uploaded
    pub async fn list_documents(&self) -> Result<Vec<KnowledgeDocument>> {
        let settings = self.store.get(&paths::knowledge_base()).await?;
        Ok(decode_documents(settings.as_ref()))
    }

    /// Append a document at the end of the sequence
    ///
    /// Ids are not checked for duplicates; a repeated id leaves both entries.
    pub async fn add_document(&self, mut document: KnowledgeDocument) -> Result<()> {
        if document.id.trim().is_empty() {
            return Err(PracticumError::Validation("Document id is required".to_string()));
        }
        if document.content.trim().is_empty() {
            return Err(PracticumError::Validation(
                "Document content is required".to_string(),
            ));
        }
        document.uploaded_at.get_or_insert_with(Utc::now);

        let mut documents = self.stored_documents().await?;
        documents.push(document.to_value());
        let count = documents.len();
        self.persist(documents).await?;

        info!("Knowledge base now holds {} documents", count);
        Ok(())
    }

    /// Remove every document with the given id
    ///
    /// Returns whether anything was removed; nothing is written otherwise.
    pub async fn remove_document(&self, id: &str) -> Result<bool> {
        let documents = self.stored_documents().await?;
        let before = documents.len();
        let remaining: Vec<Value> = documents
            .into_iter()
            .filter(|doc| document_id(doc).as_deref() != Some(id))
            .collect();

        if remaining.len() == before {
            debug!("No knowledge document with id {}", id);
            return Ok(false);
        }

        self.persist(remaining).await?;
        info!("Removed knowledge document {}", id);
        Ok(true)
    }

    /// The stored `documents` sequence, elements exactly as stored
    async fn stored_documents(&self) -> Result<Vec<Value>> {
        let settings = self.store.get(&paths::knowledge_base()).await?;
        Ok(match settings.as_ref().and_then(|s| s.get("documents")) {
            Some(Value::Array(documents)) => documents.clone(),
            _ => Vec::new(),
        })
    }

    async fn persist(&self, documents: Vec<Value>) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("documents".into(), Value::Array(documents));
        self.store.merge(&paths::knowledge_base(), fields).await
    }
}

fn document_id(document: &Value) -> Option<String> {
    document.as_object().and_then(|fields| text_field(fields, "id"))
}
