//! `balas cleanup` — remove the transport auth session.
//!
//! After a hard disconnect the underlying session directory can be left
//! locked or half-written; removing it forces a fresh QR pairing on the
//! next start.

use std::path::PathBuf;

pub fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let auth_dir = &config.session.auth_dir;

    if !auth_dir.exists() {
        println!("ℹ️  No auth session at {} — nothing to clean.", auth_dir.display());
        println!("✅ Ready to start: balas serve");
        return Ok(());
    }

    println!("🧹 Removing auth session at {}...", auth_dir.display());
    match std::fs::remove_dir_all(auth_dir) {
        Ok(()) => {
            println!("✅ Auth session removed. The next start will ask for a QR scan.");
            Ok(())
        }
        Err(e) => {
            println!("❌ Could not remove the session: {e}");
            println!("💡 Stop any running balas process and try again, or remove the directory manually.");
            Err(e.into())
        }
    }
}
