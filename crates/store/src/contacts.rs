//! Contact registry — per-counterparty state with a daily reset policy.
//!
//! The registry owns `contacts.json` exclusively. Every mutation is
//! immediately followed by a full-snapshot write; there is no partial
//! update path, so persistence is a single critical section per mutation.

use std::path::PathBuf;

use balas_core::contact::{Contact, ContactBook};
use balas_core::error::StoreError;
use balas_core::transport::ChatAddress;
use chrono::{Local, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// The contact registry backed by a single JSON document.
pub struct ContactRegistry {
    path: PathBuf,
    book: RwLock<ContactBook>,
}

impl ContactRegistry {
    /// Open the registry at the given path.
    ///
    /// Applies the daily-reset invariant: a stored snapshot from a
    /// previous calendar day is replaced by an empty one.
    pub fn open(path: PathBuf) -> Self {
        let today = Local::now().date_naive();
        let book = Self::load_from_disk(&path, today);
        debug!(path = %path.display(), contacts = book.contacts.len(), "Contact registry loaded");
        Self {
            path,
            book: RwLock::new(book),
        }
    }

    fn load_from_disk(path: &PathBuf, today: NaiveDate) -> ContactBook {
        let Some(book) = crate::read_json::<ContactBook>(path) else {
            return ContactBook::fresh(today);
        };

        if book.last_reset_date != today {
            info!(
                stored = %book.last_reset_date,
                today = %today,
                dropped = book.contacts.len(),
                "New day — resetting contact registry"
            );
            return ContactBook::fresh(today);
        }

        book
    }

    /// Re-apply the daily reset against the in-memory book. Called on
    /// every write path so a process running past midnight still wipes.
    fn roll_day(book: &mut ContactBook, today: NaiveDate) {
        if book.last_reset_date != today {
            info!(
                stored = %book.last_reset_date,
                today = %today,
                dropped = book.contacts.len(),
                "New day — resetting contact registry"
            );
            *book = ContactBook::fresh(today);
        }
    }

    async fn flush(&self, book: &ContactBook) -> Result<(), StoreError> {
        crate::write_json(&self.path, book)
    }

    /// A point-in-time copy of the whole book.
    pub async fn snapshot(&self) -> ContactBook {
        self.book.read().await.clone()
    }

    /// All contacts, in insertion order.
    pub async fn list(&self) -> Vec<Contact> {
        self.book.read().await.contacts.clone()
    }

    pub async fn get(&self, id: &ChatAddress) -> Option<Contact> {
        self.book.read().await.find(id).cloned()
    }

    /// Record an inbound message for a contact, creating the contact on
    /// first sight.
    ///
    /// New contacts start with `auto_reply = true` and are named after
    /// the hint, falling back to the local part of the address. Existing
    /// contacts get their last-message fields overwritten; the name is
    /// updated only when a non-empty hint is supplied.
    ///
    /// The full snapshot is persisted synchronously before returning.
    pub async fn upsert(
        &self,
        id: &ChatAddress,
        incoming_text: &str,
        display_name_hint: Option<&str>,
    ) -> Result<Contact, StoreError> {
        let mut book = self.book.write().await;
        Self::roll_day(&mut book, Local::now().date_naive());

        let now = Utc::now();
        let contact = if let Some(idx) = book.contacts.iter().position(|c| &c.id == id) {
            let existing = &mut book.contacts[idx];
            existing.last_message_text = incoming_text.to_string();
            existing.last_message_at = now;
            if let Some(hint) = display_name_hint
                && !hint.is_empty()
            {
                existing.display_name = hint.to_string();
            }
            existing.clone()
        } else {
            let name = display_name_hint
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| id.local_part().to_string());
            let contact = Contact {
                id: id.clone(),
                display_name: name,
                auto_reply: true,
                last_message_text: incoming_text.to_string(),
                last_message_at: now,
            };
            book.contacts.push(contact.clone());
            contact
        };

        self.flush(&book).await?;
        Ok(contact)
    }

    /// Toggle the auto-reply flag for an existing contact.
    ///
    /// Fails with `ContactNotFound` if no contact with that address
    /// exists — this operation never creates one.
    pub async fn set_auto_reply(
        &self,
        id: &ChatAddress,
        enabled: bool,
    ) -> Result<Contact, StoreError> {
        let mut book = self.book.write().await;
        Self::roll_day(&mut book, Local::now().date_naive());

        let contact = book
            .find_mut(id)
            .ok_or_else(|| StoreError::ContactNotFound(id.to_string()))?;
        contact.auto_reply = enabled;
        let contact = contact.clone();

        self.flush(&book).await?;
        info!(contact = %contact.display_name, enabled, "Auto-reply toggled");
        Ok(contact)
    }
}
