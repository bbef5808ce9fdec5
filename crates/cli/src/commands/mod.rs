pub mod cleanup;
pub mod doctor;
pub mod init;
pub mod serve;

use balas_config::AppConfig;
use std::path::PathBuf;

/// Resolve the app config from an explicit path or the default lookup.
pub fn load_config(path: Option<PathBuf>) -> Result<AppConfig, balas_config::ConfigError> {
    match path {
        Some(path) => AppConfig::load_from(&path),
        None => AppConfig::load(),
    }
}
