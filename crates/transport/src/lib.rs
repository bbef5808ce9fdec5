//! Chat transport adapters for balas.
//!
//! The transport is an external collaborator behind the
//! [`balas_core::transport::ChatTransport`] trait; the wire protocol of
//! the underlying chat network is deliberately out of scope.
//!
//! Available transports:
//! - **WhatsApp** — WhatsApp Web session adapter (stub, needs a
//!   WhatsApp Web bridge in production)

pub mod whatsapp;

pub use whatsapp::{WhatsAppConfig, WhatsAppTransport};
