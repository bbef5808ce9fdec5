//! Contact types — per-counterparty state owned by the contact registry.
//!
//! Field names on the wire (and in `contacts.json`) keep the original
//! admin-UI format: `number`, `name`, `autoReply`, `lastMessage`,
//! `lastMessageTime`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::transport::ChatAddress;

/// Per-counterparty state tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// The counterparty's channel address. Unique per registry.
    #[serde(rename = "number")]
    pub id: ChatAddress,

    /// Display name: the sender's push-name when known, otherwise the
    /// local part of the address.
    #[serde(rename = "name")]
    pub display_name: String,

    /// Whether the resolver may answer this contact automatically.
    #[serde(rename = "autoReply")]
    pub auto_reply: bool,

    /// Text of the most recent inbound message.
    #[serde(rename = "lastMessage")]
    pub last_message_text: String,

    /// When the most recent inbound message arrived.
    #[serde(rename = "lastMessageTime")]
    pub last_message_at: DateTime<Utc>,
}

/// The full registry snapshot: all contacts plus the day they were last
/// wiped. If the stored day differs from today at load time, the whole
/// snapshot is replaced with an empty one — a hard daily reset, not a
/// per-contact expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactBook {
    #[serde(rename = "lastResetDate")]
    pub last_reset_date: NaiveDate,

    pub contacts: Vec<Contact>,
}

impl ContactBook {
    /// An empty book stamped with the given day.
    pub fn fresh(day: NaiveDate) -> Self {
        Self {
            last_reset_date: day,
            contacts: Vec::new(),
        }
    }

    pub fn find(&self, id: &ChatAddress) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.id == id)
    }

    pub fn find_mut(&mut self, id: &ChatAddress) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| &c.id == id)
    }
}
