//! `balas init` — write a starter configuration file.

use balas_config::AppConfig;
use std::path::PathBuf;

pub fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.unwrap_or_else(|| PathBuf::from("balas.toml"));

    if path.exists() {
        println!("ℹ️  {} already exists — leaving it untouched.", path.display());
        return Ok(());
    }

    std::fs::write(&path, AppConfig::default_toml())?;
    println!("✅ Wrote {}.", path.display());
    println!("   Set an API key (BALAS_API_KEY / GROQ_API_KEY) and run: balas serve");
    Ok(())
}
