//! Text-completion client implementations for balas.
//!
//! The resolver's AI strategy only ever needs two plain completions per
//! message (classify, then generate), so the client surface is small:
//! one OpenAI-compatible chat-completions call, no streaming.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatCompletion;
