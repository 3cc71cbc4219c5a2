//! Grounded responder
//!
//! Answers a student's question strictly from the resolved policy corpus.
//! Every outcome, including failures, comes back as a [`Reply`] carrying a
//! user-facing sentence; the chat surface calling this has no error path.

use crate::services::knowledge::KnowledgeCorpus;
use crate::services::llm::{GenerationError, TextGenerator};
use std::sync::Arc;
use tracing::{debug, error};

/// Returned when no service credential is configured
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "Omlouvám se, ale momentálně nejsem k dispozici (chybí klíč).";

/// Returned when the service reports the model missing or unavailable
pub const UNAVAILABLE_MESSAGE: &str =
    "Omlouvám se, služba AI je momentálně nedostupná. Zkuste to prosím později.";

/// Returned for every other failure
pub const FAILURE_MESSAGE: &str =
    "Omlouvám se, došlo k chybě při komunikaci s AI. Zkuste to prosím později.";

/// Sentence the model must return verbatim when the corpus has no answer
pub const NOT_IN_CORPUS_APOLOGY: &str =
    "Tuto informaci bohužel nemám v aktuálních metodikách. Kontaktujte prosím koordinátora praxí.";

/// Outcome of one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Model output, unmodified
    Answer(String),
    MissingCredential,
    /// Retry-later failure (model not found or service unavailable)
    Unavailable,
    Failure,
}

impl Reply {
    /// The sentence to show the user
    pub fn text(&self) -> &str {
        match self {
            Reply::Answer(text) => text,
            Reply::MissingCredential => MISSING_CREDENTIAL_MESSAGE,
            Reply::Unavailable => UNAVAILABLE_MESSAGE,
            Reply::Failure => FAILURE_MESSAGE,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Reply::Answer(_))
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Map a service failure to the reply the user sees
pub fn classify(err: &GenerationError) -> Reply {
    let message = err.message.to_lowercase();
    let not_found = err.status == Some(404)
        || message.contains("404")
        || message.contains("not_found")
        || message.contains("not found");
    let unavailable = err.status == Some(503)
        || message.contains("503")
        || message.contains("unavailable");

    if not_found || unavailable {
        Reply::Unavailable
    } else {
        Reply::Failure
    }
}

/// Combine the strict instruction, the grounding text and the question
pub fn build_prompt(grounding_text: &str, question: &str) -> String {
    format!(
        "Jsi asistent pro praxe. TÝMTO TI STRIKTNĚ ZAKAZUJI používat obecné znalosti z internetu. \
         ODPOVÍDEJ POUZE A VÝHRADNĚ na základě textu níže. Pokud odpověď v textu nenajdeš, nespekuluj. \
         Omluv se a napiš: '{}'\n\n--- KONTEXT METODIKY ---\n\n{}\n\nOtázka studenta: {}",
        NOT_IN_CORPUS_APOLOGY, grounding_text, question
    )
}

/// Question answering grounded in the knowledge corpus
pub struct GroundedResponder {
    corpus: Arc<KnowledgeCorpus>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl GroundedResponder {
    /// `generator` is `None` when no credential is configured
    pub fn new(corpus: Arc<KnowledgeCorpus>, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { corpus, generator }
    }

    /// Answer one question; never fails
    pub async fn answer(&self, question: &str) -> Reply {
        let Some(generator) = &self.generator else {
            error!("Generative-text credential is missing");
            return Reply::MissingCredential;
        };

        let grounding = self.corpus.resolve_grounding_text().await;
        let prompt = build_prompt(&grounding, question);
        debug!("Sending grounded prompt ({} chars)", prompt.chars().count());

        match generator.generate(&prompt).await {
            Ok(text) => Reply::Answer(text),
            Err(e) => {
                error!("Generative-text service error: {}", e);
                classify(&e)
            }
        }
    }
}
