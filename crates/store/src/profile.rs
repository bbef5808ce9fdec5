//! Org profile store — the single JSON document behind `bot-config.json`.

use std::path::PathBuf;

use balas_core::error::StoreError;
use balas_core::profile::OrgProfile;
use tokio::sync::RwLock;
use tracing::debug;

/// Load-whole/save-whole store for the organization profile.
///
/// A missing or malformed file yields the default placeholder profile.
pub struct OrgProfileStore {
    path: PathBuf,
    profile: RwLock<OrgProfile>,
}

impl OrgProfileStore {
    pub fn open(path: PathBuf) -> Self {
        let profile = crate::read_json(&path).unwrap_or_default();
        debug!(path = %path.display(), "Org profile loaded");
        Self {
            path,
            profile: RwLock::new(profile),
        }
    }

    pub async fn get(&self) -> OrgProfile {
        self.profile.read().await.clone()
    }

    /// Replace the profile and persist it synchronously.
    pub async fn set(&self, profile: OrgProfile) -> Result<(), StoreError> {
        let mut current = self.profile.write().await;
        crate::write_json(&self.path, &profile)?;
        *current = profile;
        Ok(())
    }
}
