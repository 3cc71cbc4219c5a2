//! Services layer for the practicum system
//!
//! Each service receives its store (and, for the responder, its text
//! generator) at construction; none holds state between calls.

pub mod dashboard;
pub mod knowledge;
pub mod ledger;
pub mod llm;
pub mod responder;
pub mod roster;

pub use dashboard::{DashboardComposer, FaqSource};
pub use knowledge::{GroundingRule, KnowledgeCorpus, DEFAULT_INSTRUCTION};
pub use ledger::{total_hours, PracticeLedger};
pub use llm::{GeminiClient, GenerationError, LlmConfig, TextGenerator};
pub use responder::{GroundedResponder, Reply};
pub use roster::{AuthoritativeIds, RosterEngine, SchoolNames};
