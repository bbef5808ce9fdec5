//! JSON document stores for balas — contacts, knowledge tables, and the
//! org profile.
//!
//! Every store follows the same pattern: the whole document is loaded
//! into memory on open and flushed back to disk on every mutation. This
//! gives fast reads with durable writes, and keeps the on-disk files
//! readable by the original admin tooling.
//!
//! Data faults (missing file, malformed JSON) load as an empty document
//! with a warning — never a fatal error.

pub mod contacts;
pub mod import;
pub mod knowledge;
pub mod profile;

pub use contacts::ContactRegistry;
pub use import::ImportReport;
pub use knowledge::{KnowledgeStore, KnowledgeTables, NewQaEntry};
pub use profile::OrgProfileStore;

use balas_core::error::StoreError;
use std::path::Path;

/// Write a JSON document to `path`, creating parent directories first.
pub(crate) fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Storage(format!("Failed to create data directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(value)
        .map_err(|e| StoreError::Storage(format!("Failed to serialize document: {e}")))?;

    std::fs::write(path, content)
        .map_err(|e| StoreError::Storage(format!("Failed to write {}: {e}", path.display())))
}

/// Read a JSON document from `path`. Missing or malformed files yield
/// `None` (the caller substitutes its empty/default document).
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed data file, starting empty");
            None
        }
    }
}
