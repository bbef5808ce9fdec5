//! WhatsApp transport adapter (stub).
//!
//! Implements the ChatTransport trait for a WhatsApp Web session. In
//! production, this would drive a headless WhatsApp Web bridge that
//! persists its auth state under the configured directory and emits the
//! network's `qr` / `authenticated` / `ready` / `disconnected` events.
//! Currently a stub that can receive and emit events via an in-process
//! channel.

use std::path::PathBuf;

use async_trait::async_trait;
use balas_core::error::TransportError;
use balas_core::transport::{ChatAddress, ChatTransport, TransportEvent};
use tokio::sync::mpsc;
use tracing::info;

/// WhatsApp transport configuration.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Where the Web session's auth state lives. Removing this directory
    /// forces a fresh QR pairing on the next start.
    pub auth_dir: PathBuf,
}

/// WhatsApp transport adapter.
pub struct WhatsAppTransport {
    config: WhatsAppConfig,
    /// Sender for injecting events (for testing, or a bridge process).
    inject_tx: tokio::sync::Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            inject_tx: tokio::sync::Mutex::new(None),
        }
    }

    /// Inject an event as if it came from the network (for testing).
    pub async fn inject(&self, event: TransportEvent) -> Result<(), TransportError> {
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(event)
                .await
                .map_err(|_| TransportError::ConnectionLost("Event channel closed".into()))
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

#[async_trait]
impl ChatTransport for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(&self) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        info!(auth_dir = %self.config.auth_dir.display(), "WhatsApp transport starting (stub mode)");
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        // In production: spawn the WhatsApp Web bridge here and forward
        // its qr/authenticated/ready/disconnected/message events into tx.
        Ok(rx)
    }

    async fn send(
        &self,
        chat_id: &ChatAddress,
        content: &str,
    ) -> Result<(), TransportError> {
        if self.inject_tx.lock().await.is_none() {
            return Err(TransportError::NotConnected);
        }
        info!(
            chat_id = %chat_id,
            content_len = content.len(),
            "WhatsApp send (stub)"
        );
        // In production: dispatch through the WhatsApp Web bridge.
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        info!("WhatsApp transport disconnecting");
        *self.inject_tx.lock().await = None;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, TransportError> {
        Ok(self.inject_tx.lock().await.is_some())
    }
}
