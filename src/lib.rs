//! Practicum - field-practice tracking and grounded policy assistant
//!
//! The service layer behind a teacher-training practice portal:
//! - Per-student practice ledger (activities, hours, microteaching evaluations)
//! - Roster statistics with per-student failure containment
//! - Safe reconciliation of the stored roster against an authoritative id list
//! - Student dashboards (self, school, peers, FAQ)
//! - A question-answering assistant grounded strictly in an editable policy corpus
//!
//! # Architecture
//!
//! - **Types**: Records and their named default rules
//! - **Storage**: The [`DocumentStore`] contract plus in-memory and libSQL backends
//! - **Services**: Ledger, knowledge corpus, responder, roster engine, dashboard
//!
//! Services receive their store and text generator at construction, so
//! tests substitute [`InMemoryStore`] and a mock generator without any
//! global state.
//!
//! # Example
//!
//! ```ignore
//! use practicum_core::{InMemoryStore, NewLogEntry, PracticeLedger};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(InMemoryStore::new());
//!     let ledger = PracticeLedger::new(store);
//!
//!     ledger
//!         .add_log_entry("42", NewLogEntry::new("2026-03-02", "Náslech v hodině", 2.0))
//!         .await?;
//!     println!("{}h", ledger.student_total_hours("42").await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod storage;
pub mod timestamp;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{PracticumError, Result};
pub use services::{
    AuthoritativeIds, DashboardComposer, GeminiClient, GenerationError, GroundedResponder,
    KnowledgeCorpus, LlmConfig, PracticeLedger, Reply, RosterEngine, TextGenerator,
};
pub use storage::libsql::{ConnectionMode, LibsqlStore};
pub use storage::memory::InMemoryStore;
pub use storage::{DocRef, Document, DocumentStore};
pub use types::{
    CompletionStatus, Dashboard, DateInput, FaqItem, Fields, ImportHistory, KnowledgeDocument,
    MicroteachingEvaluation, NewLogEntry, PracticeLogEntry, School, Student, StudentStats,
};
