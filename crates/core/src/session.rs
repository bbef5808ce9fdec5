//! Session state types — the connection lifecycle as seen by the rest of
//! the system.
//!
//! The lifecycle manager (in `balas-session`) owns the single mutable
//! instance; everything else reads immutable [`SessionSnapshot`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The connection lifecycle states.
///
/// ```text
/// Uninitialized → Initializing → AwaitingScan → Ready
///                      └──────────(restored)────┘
/// Ready → Disconnecting → Cleaning → Uninitialized
/// any → Uninitialized on auth failure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    AwaitingScan,
    Ready,
    Disconnecting,
    Cleaning,
}

impl SessionState {
    /// The status label exposed on the control surface.
    ///
    /// `Disconnecting` is transient and reported as `cleaning`;
    /// `Uninitialized` is reported as `offline`.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "offline",
            Self::Initializing => "initializing",
            Self::AwaitingScan => "awaitingScan",
            Self::Ready => "ready",
            Self::Disconnecting | Self::Cleaning => "cleaning",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status_label())
    }
}

/// An immutable read of the lifecycle at one instant.
///
/// All fields come from a single locked read, so a snapshot never shows a
/// half-applied transition (e.g. `ready_since` set while the state is not
/// yet `Ready`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,

    /// Set on entry to `Ready`, cleared on leaving it. The authority for
    /// message-recency gating.
    pub ready_since: Option<DateTime<Utc>>,

    /// The pairing challenge payload, present only while awaiting scan.
    pub qr: Option<String>,

    /// Incremented each time the session enters `Ready`. Replies resolved
    /// under an older epoch are stale and must not be dispatched.
    pub epoch: u64,
}

impl SessionSnapshot {
    /// Gating predicate for the intake filter: only a `Ready` session
    /// processes messages, and only messages stamped at or after
    /// `ready_since` (older ones were queued by the network while the
    /// responder was down).
    pub fn can_process_inbound(&self, timestamp: DateTime<Utc>) -> bool {
        if self.state != SessionState::Ready {
            return false;
        }
        match self.ready_since {
            Some(since) => timestamp >= since,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ready_snapshot(since: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            state: SessionState::Ready,
            ready_since: Some(since),
            qr: None,
            epoch: 1,
        }
    }

    #[test]
    fn status_labels() {
        assert_eq!(SessionState::Uninitialized.status_label(), "offline");
        assert_eq!(SessionState::Initializing.status_label(), "initializing");
        assert_eq!(SessionState::AwaitingScan.status_label(), "awaitingScan");
        assert_eq!(SessionState::Ready.status_label(), "ready");
        assert_eq!(SessionState::Disconnecting.status_label(), "cleaning");
        assert_eq!(SessionState::Cleaning.status_label(), "cleaning");
    }

    #[test]
    fn gating_requires_ready_state() {
        let now = Utc::now();
        let mut snap = ready_snapshot(now);
        assert!(snap.can_process_inbound(now));

        snap.state = SessionState::Cleaning;
        assert!(!snap.can_process_inbound(now));
    }

    #[test]
    fn gating_discards_messages_before_readiness() {
        let since = Utc::now();
        let snap = ready_snapshot(since);
        assert!(!snap.can_process_inbound(since - Duration::seconds(5)));
        assert!(snap.can_process_inbound(since));
        assert!(snap.can_process_inbound(since + Duration::seconds(5)));
    }

    #[test]
    fn gating_without_ready_since_is_closed() {
        let snap = SessionSnapshot {
            state: SessionState::Ready,
            ready_since: None,
            qr: None,
            epoch: 0,
        };
        assert!(!snap.can_process_inbound(Utc::now()));
    }
}
