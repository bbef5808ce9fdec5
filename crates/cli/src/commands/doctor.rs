//! `balas doctor` — diagnose configuration and data directories.

use std::path::PathBuf;

pub fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 balas doctor");
    println!("===============\n");

    let mut issues = 0;

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            return Err(e.into());
        }
    };

    if config.has_api_key() {
        println!("  ✅ Completion API key configured");
    } else {
        println!("  ⚠️  No API key — set BALAS_API_KEY / GROQ_API_KEY or [completion].api_key");
        issues += 1;
    }

    match std::fs::create_dir_all(&config.data_dir) {
        Ok(()) => println!("  ✅ Data directory writable ({})", config.data_dir.display()),
        Err(e) => {
            println!("  ❌ Data directory not writable: {e}");
            issues += 1;
        }
    }

    if config.session.auth_dir.exists() {
        println!(
            "  ✅ Transport auth session present ({})",
            config.session.auth_dir.display()
        );
    } else {
        println!("  ℹ️  No transport auth session — first start will require a QR scan");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
