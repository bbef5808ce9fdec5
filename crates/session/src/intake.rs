//! The intake filter — ordered drop rules applied before any resolver
//! invocation. The first matching rule short-circuits and the message is
//! dropped.

use balas_core::session::SessionSnapshot;
use balas_core::transport::InboundMessage;

/// Why a message was dropped before processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Originates from a group or broadcast address.
    GroupOrBroadcast,

    /// Flagged as a status/story update.
    StatusUpdate,

    /// Not a direct one-to-one chat address.
    NotDirectChat,

    /// Session not ready, or the message predates readiness (queued by
    /// the network while the responder was down).
    NotReadyOrStale,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::GroupOrBroadcast => "group or broadcast traffic",
            Self::StatusUpdate => "status update",
            Self::NotDirectChat => "not a direct chat",
            Self::NotReadyOrStale => "session not ready or message predates readiness",
        };
        f.write_str(label)
    }
}

/// Stateless rule evaluation over a message and a session snapshot.
pub struct IntakeFilter;

impl IntakeFilter {
    /// Evaluate the drop rules in order. `None` means the message may
    /// proceed to the contact registry and, auto-reply permitting, the
    /// resolver.
    pub fn evaluate(msg: &InboundMessage, session: &SessionSnapshot) -> Option<DropReason> {
        if msg.is_group_or_broadcast || msg.from.is_group() {
            return Some(DropReason::GroupOrBroadcast);
        }

        if msg.is_status || msg.from.is_broadcast() {
            return Some(DropReason::StatusUpdate);
        }

        if !msg.from.is_direct() {
            return Some(DropReason::NotDirectChat);
        }

        let processable = msg
            .timestamp()
            .is_some_and(|ts| session.can_process_inbound(ts));
        if !processable {
            return Some(DropReason::NotReadyOrStale);
        }

        None
    }
}
