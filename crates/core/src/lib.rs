//! # Balas Core
//!
//! Domain types, traits, and error definitions for the balas auto-responder.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The chat transport and the text-completion capability are defined as
//! traits here; implementations live in their respective crates. This
//! enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod completion;
pub mod contact;
pub mod error;
pub mod knowledge;
pub mod profile;
pub mod session;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use completion::{Completion, CompletionRequest};
pub use contact::{Contact, ContactBook};
pub use error::{CompletionError, Error, Result, SessionError, StoreError, TransportError};
pub use knowledge::{KeywordEntry, QaEntry};
pub use profile::OrgProfile;
pub use session::{SessionSnapshot, SessionState};
pub use transport::{ChatAddress, ChatTransport, InboundMessage, TransportEvent};
