//! Completion trait — the abstraction over the text-completion capability.
//!
//! The resolver's AI strategy calls this twice per invocation: once to
//! classify the message's topic, once to generate the reply. Both calls
//! carry independent parameters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System-level instructions. `None` sends the user text alone,
    /// which is how the classification probe is phrased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// The user-visible text to complete against.
    pub user_text: String,

    /// Generation cap.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

/// The completion capability.
///
/// Implementations may fail or return empty output; callers decide what
/// that means. The resolver converts every failure into its fixed
/// fallback reply — a completion error never reaches a counterparty.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Human-readable backend name (e.g., "groq").
    fn name(&self) -> &str;

    /// Run one completion and return the generated text.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<String, CompletionError>;
}
