//! `balas serve` — wire everything together and run the control surface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use balas_gateway::GatewayState;
use balas_providers::OpenAiCompatCompletion;
use balas_resolver::Resolver;
use balas_session::{SessionLifecycle, SessionRuntime};
use balas_store::{ContactRegistry, KnowledgeStore, OrgProfileStore};
use balas_transport::{WhatsAppConfig, WhatsAppTransport};
use tracing::{info, warn};

pub async fn run(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    autostart: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    // A missing API key is not fatal: keyword and QA replies still work,
    // and AI-strategy calls collapse into the fixed fallback.
    let completion = match OpenAiCompatCompletion::from_config(&config.completion) {
        Ok(completion) => completion,
        Err(e) => {
            warn!(error = %e, "AI replies will fall back to the fixed template");
            OpenAiCompatCompletion::new(
                "groq",
                config.completion.api_url.clone(),
                "",
                config.completion.model.clone(),
            )
        }
    };

    let transport = Arc::new(WhatsAppTransport::new(WhatsAppConfig {
        auth_dir: config.session.auth_dir.clone(),
    }));
    let contacts = Arc::new(ContactRegistry::open(config.data_dir.join("contacts.json")));
    let knowledge = Arc::new(KnowledgeStore::open(&config.data_dir));
    let profile = Arc::new(OrgProfileStore::open(config.data_dir.join("bot-config.json")));

    let runtime = SessionRuntime::new(
        SessionLifecycle::new(Duration::from_secs(config.session.cleanup_window_secs)),
        transport,
        Resolver::new(Arc::new(completion)),
        Arc::clone(&contacts),
        Arc::clone(&knowledge),
        Arc::clone(&profile),
    );

    if autostart {
        match runtime.start().await {
            Ok(()) => info!("Session autostart accepted"),
            Err(e) => warn!(error = %e, "Session autostart failed; start it via the API"),
        }
    }

    let state = Arc::new(GatewayState {
        runtime,
        contacts,
        knowledge,
        profile,
    });

    balas_gateway::serve(&config.gateway.host, config.gateway.port, state).await?;
    Ok(())
}
