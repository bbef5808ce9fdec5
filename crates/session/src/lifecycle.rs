//! The session lifecycle state machine.
//!
//! ```text
//! Uninitialized --start()--> Initializing
//! Initializing  --qrChallenge--> AwaitingScan
//! Initializing  --connectionEstablished--> Ready   (restored session)
//! AwaitingScan  --connectionEstablished--> Ready
//! Ready         --connectionLost--> Disconnecting -> Cleaning
//! Cleaning      --quiescence window--> Uninitialized
//! any state     --authFailure--> Uninitialized
//! ```
//!
//! All mutable state lives in one struct behind one `RwLock`, so every
//! transition is atomic with respect to readers: no snapshot can show
//! `ready_since` set while the state is not `Ready`. The quiescence
//! window is an owned, abortable task — re-entry cancels the previous
//! one, so cleanup cycles never overlap.

use std::sync::Arc;
use std::time::Duration;

use balas_core::error::SessionError;
use balas_core::session::{SessionSnapshot, SessionState};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Inner {
    state: SessionState,
    ready_since: Option<DateTime<Utc>>,
    qr: Option<String>,
    epoch: u64,
    cleanup: Option<JoinHandle<()>>,
}

/// The single owner of session state. Cheap to clone handles via `Arc`.
pub struct SessionLifecycle {
    inner: Arc<RwLock<Inner>>,
    cleanup_window: Duration,
}

impl SessionLifecycle {
    /// Create a lifecycle in `Uninitialized` with the given quiescence
    /// window.
    pub fn new(cleanup_window: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: SessionState::Uninitialized,
                ready_since: None,
                qr: None,
                epoch: 0,
                cleanup: None,
            })),
            cleanup_window,
        }
    }

    /// An atomic read of the whole lifecycle.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read().await;
        SessionSnapshot {
            state: inner.state,
            ready_since: inner.ready_since,
            qr: inner.qr.clone(),
            epoch: inner.epoch,
        }
    }

    /// Accept a start request: `Uninitialized → Initializing`.
    ///
    /// Rejected — not queued — while the previous session is still
    /// draining (`Cleaning`), and while a session is already up.
    pub async fn begin_start(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.write().await;
        match inner.state {
            SessionState::Uninitialized => {
                inner.state = SessionState::Initializing;
                info!("Session initializing");
                Ok(())
            }
            SessionState::Cleaning => Err(SessionError::StartRejected(
                "previous session still cleaning up, retry shortly".into(),
            )),
            _ => Err(SessionError::AlreadyRunning),
        }
    }

    /// A pairing challenge arrived. Repeated challenges refresh the
    /// stored payload.
    pub async fn qr_challenge(&self, qr: String) {
        let mut inner = self.inner.write().await;
        match inner.state {
            SessionState::Initializing | SessionState::AwaitingScan => {
                inner.state = SessionState::AwaitingScan;
                inner.qr = Some(qr);
                info!("QR challenge received, awaiting scan");
            }
            state => debug!(state = %state, "Ignoring QR challenge in non-startup state"),
        }
    }

    /// The connection became usable: enter `Ready`, stamp `ready_since`,
    /// clear the challenge, and advance the epoch.
    pub async fn connection_established(&self) {
        let mut inner = self.inner.write().await;
        match inner.state {
            SessionState::Initializing | SessionState::AwaitingScan => {
                inner.state = SessionState::Ready;
                inner.ready_since = Some(Utc::now());
                inner.qr = None;
                inner.epoch += 1;
                info!(epoch = inner.epoch, "Session ready");
            }
            state => debug!(state = %state, "Ignoring ready event in unexpected state"),
        }
    }

    /// The connection dropped. `Disconnecting → Cleaning` is immediate,
    /// collapsed under one lock so no reader sees a half-applied stop;
    /// the quiescence window then drains back to `Uninitialized`.
    pub async fn connection_lost(&self, reason: &str) {
        let mut inner = self.inner.write().await;
        match inner.state {
            SessionState::Uninitialized | SessionState::Cleaning => {
                debug!(reason, "Ignoring disconnect in idle state");
            }
            _ => {
                warn!(reason, "Connection lost, entering cleanup");
                inner.state = SessionState::Cleaning;
                inner.ready_since = None;
                inner.qr = None;
                Self::schedule_cleanup(&self.inner, &mut inner, self.cleanup_window);
            }
        }
    }

    /// Accept a stop request. Returns `false` when there is nothing to
    /// stop (`Uninitialized`) or a stop is already draining (`Cleaning`).
    ///
    /// The caller is told the stop was accepted before any teardown of
    /// the underlying connection completes; actual transport teardown is
    /// the runtime's fire-and-forget concern.
    pub async fn begin_stop(&self) -> bool {
        let mut inner = self.inner.write().await;
        match inner.state {
            SessionState::Uninitialized | SessionState::Cleaning => false,
            _ => {
                info!("Session stopping, entering cleanup");
                inner.state = SessionState::Cleaning;
                inner.ready_since = None;
                inner.qr = None;
                Self::schedule_cleanup(&self.inner, &mut inner, self.cleanup_window);
                true
            }
        }
    }

    /// Terminal authentication failure: reset to `Uninitialized` from
    /// any state, cancelling a pending cleanup window.
    pub async fn auth_failure(&self, reason: &str) {
        let mut inner = self.inner.write().await;
        warn!(reason, "Authentication failure, session reset");
        if let Some(task) = inner.cleanup.take() {
            task.abort();
        }
        inner.state = SessionState::Uninitialized;
        inner.ready_since = None;
        inner.qr = None;
    }

    /// Arm the quiescence window, cancelling any previous one so cleanup
    /// cycles never overlap.
    fn schedule_cleanup(shared: &Arc<RwLock<Inner>>, inner: &mut Inner, window: Duration) {
        if let Some(previous) = inner.cleanup.take() {
            previous.abort();
        }

        let shared = Arc::clone(shared);
        inner.cleanup = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut inner = shared.write().await;
            if inner.state == SessionState::Cleaning {
                inner.state = SessionState::Uninitialized;
                inner.cleanup = None;
                info!("Cleanup window elapsed, session can be started again");
            }
        }));
    }
}
