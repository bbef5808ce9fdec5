//! ChatTransport trait — the abstraction over the chat network.
//!
//! A transport connects balas to a one-to-one messaging platform. It
//! emits lifecycle events (QR challenge, ready, disconnect) and inbound
//! messages on a single async stream, and sends replies back out.
//! The wire protocol behind it is deliberately out of scope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// An opaque channel address identifying a counterparty chat.
///
/// Addresses follow the underlying network's conventions: direct chats
/// end in `@c.us`, groups in `@g.us`, and status/story traffic uses the
/// `status@broadcast` pseudo-address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatAddress(pub String);

impl ChatAddress {
    /// Whether this address is a direct one-to-one chat.
    pub fn is_direct(&self) -> bool {
        self.0.ends_with("@c.us")
    }

    /// Whether this address is a group chat.
    pub fn is_group(&self) -> bool {
        self.0.ends_with("@g.us")
    }

    /// Whether this address is the broadcast/status pseudo-channel.
    pub fn is_broadcast(&self) -> bool {
        self.0.contains("status@broadcast") || self.0.ends_with("@broadcast")
    }

    /// The local part before `@`, used as a display-name fallback.
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChatAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An inbound message event from the chat network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The counterparty address this message came from.
    pub from: ChatAddress,

    /// The text content.
    pub body: String,

    /// Network timestamp in whole seconds since the Unix epoch.
    pub timestamp_secs: i64,

    /// Push-name of the sender, when the network supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_display_name: Option<String>,

    /// Whether this is a status/story update rather than a chat message.
    #[serde(default)]
    pub is_status: bool,

    /// Whether this originated from a group or broadcast list.
    #[serde(default)]
    pub is_group_or_broadcast: bool,
}

impl InboundMessage {
    /// The message timestamp as UTC, if it is representable.
    pub fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.timestamp_secs, 0)
    }
}

/// Events emitted by a chat transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The network issued a pairing challenge to be scanned.
    QrChallenge(String),

    /// Credentials were accepted; connection setup continues.
    Authenticated,

    /// The connection is usable; messages may now flow.
    Ready,

    /// Authentication failed terminally.
    AuthFailure(String),

    /// The connection dropped, with the network's reason string.
    Disconnected(String),

    /// An inbound message arrived.
    Message(InboundMessage),
}

/// The core chat transport trait.
///
/// Implementations handle connection setup, event delivery, and message
/// dispatch for a specific chat network.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name (e.g., "whatsapp").
    fn name(&self) -> &str;

    /// Connect and start emitting events.
    ///
    /// Returns a receiver that yields lifecycle events and inbound
    /// messages. The transport handles reconnection plumbing internally;
    /// a terminal failure surfaces as `AuthFailure` or `Disconnected`.
    async fn start(
        &self,
    ) -> std::result::Result<tokio::sync::mpsc::Receiver<TransportEvent>, TransportError>;

    /// Send a reply to a chat.
    async fn send(
        &self,
        chat_id: &ChatAddress,
        content: &str,
    ) -> std::result::Result<(), TransportError>;

    /// Tear down the underlying connection.
    async fn disconnect(&self) -> std::result::Result<(), TransportError>;

    /// Health check — is the transport connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, TransportError> {
        Ok(true)
    }
}
