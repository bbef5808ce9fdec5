//! Tiered response resolution for balas.
//!
//! Given an inbound message, the resolver escalates through three
//! strategies; the first to produce a reply wins:
//!
//! 1. **Keyword** — operator-curated template matched exactly or by
//!    whole-word containment.
//! 2. **QA** — curated question/answer table matched by exact text, tag
//!    containment, or token-overlap similarity.
//! 3. **AI** — generative fallback gated by a topic-sensitivity
//!    classification, with a fixed templated reply when the completion
//!    capability fails.
//!
//! The ordering trades recall for cost and determinism: curated answers
//! are never overridden by probabilistic generation, and the AI is
//! reserved for genuine knowledge gaps.

mod ai;
pub mod template;

use std::sync::Arc;

use balas_core::completion::Completion;
use balas_core::knowledge::QaEntry;
use balas_core::profile::OrgProfile;
use balas_store::KnowledgeTables;
use tracing::debug;

/// The response resolver. Stateless apart from its completion handle;
/// `resolve` is a pure decision over its inputs.
pub struct Resolver {
    completion: Arc<dyn Completion>,
}

impl Resolver {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self { completion }
    }

    /// Resolve an inbound message to a reply.
    ///
    /// Returns `None` only when the pipeline decides to stay silent;
    /// callers must treat that as a valid outcome, not an error. Once the
    /// AI strategy is reached it always yields text (its fallback cannot
    /// fail), so in practice a reply is produced for every invocation.
    pub async fn resolve(
        &self,
        message: &str,
        tables: &KnowledgeTables,
        profile: &OrgProfile,
    ) -> Option<String> {
        if let Some(entry) = tables.find_keyword(message) {
            debug!(keyword = %entry.keyword, "Keyword strategy hit");
            return Some(template::render(&entry.response, profile));
        }

        if let Some(entry) = tables.find_qa(message) {
            debug!(qa_id = entry.id, "QA strategy hit");
            return Some(compose_qa_reply(entry));
        }

        debug!("Knowledge tables missed, escalating to AI strategy");
        Some(self.ai_reply(message, profile).await)
    }
}

/// Compose a QA reply: the answer, an attribution line when the entry
/// names an answerer, and the source link on its own line when present.
fn compose_qa_reply(entry: &QaEntry) -> String {
    let mut reply = entry.answer.clone();

    if let Some(attributed_to) = entry
        .attributed_to
        .as_deref()
        .filter(|a| !a.trim().is_empty())
    {
        reply.push_str(&format!("\n\n_Dijawab oleh: {attributed_to}_"));
    }

    if let Some(url) = entry.url.as_deref().filter(|u| !u.trim().is_empty()) {
        reply.push_str(&format!("\n🔗 {url}"));
    }

    reply
}
