//! The session runtime — consumes a transport's event stream, drives the
//! lifecycle, and routes surviving messages through the registry and the
//! resolver.
//!
//! One intake loop per session. Each surviving message is handled in its
//! own task so a slow AI call never stalls the loop; per-contact ordering
//! is preserved with keyed locks. Errors in one message's handling are
//! logged at the per-message boundary and never terminate the loop.

use std::sync::Arc;

use balas_core::error::Error;
use balas_core::session::SessionState;
use balas_core::transport::{ChatTransport, InboundMessage, TransportEvent};
use balas_resolver::Resolver;
use balas_store::{ContactRegistry, KnowledgeStore, OrgProfileStore};
use tracing::{debug, info, warn};

use crate::intake::IntakeFilter;
use crate::keyed::KeyedLocks;
use crate::lifecycle::SessionLifecycle;

/// Everything one running session needs, shared behind an `Arc`.
pub struct SessionRuntime {
    lifecycle: SessionLifecycle,
    transport: Arc<dyn ChatTransport>,
    resolver: Resolver,
    contacts: Arc<ContactRegistry>,
    knowledge: Arc<KnowledgeStore>,
    profile: Arc<OrgProfileStore>,
    locks: KeyedLocks,
}

impl SessionRuntime {
    pub fn new(
        lifecycle: SessionLifecycle,
        transport: Arc<dyn ChatTransport>,
        resolver: Resolver,
        contacts: Arc<ContactRegistry>,
        knowledge: Arc<KnowledgeStore>,
        profile: Arc<OrgProfileStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            lifecycle,
            transport,
            resolver,
            contacts,
            knowledge,
            profile,
            locks: KeyedLocks::new(),
        })
    }

    /// Read-only view of the lifecycle for status queries and gating.
    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    /// Start the session: accept the start request, connect the
    /// transport, and spawn the intake loop.
    pub async fn start(self: &Arc<Self>) -> Result<(), Error> {
        self.lifecycle.begin_start().await?;

        let events = match self.transport.start().await {
            Ok(events) => events,
            Err(e) => {
                self.lifecycle
                    .auth_failure("transport failed to start")
                    .await;
                return Err(e.into());
            }
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_intake_loop(events).await;
        });
        Ok(())
    }

    /// Accept a stop request and schedule transport teardown in the
    /// background. Returns whether there was a session to stop; the
    /// answer is given before teardown completes.
    pub async fn stop(&self) -> bool {
        if !self.lifecycle.begin_stop().await {
            return false;
        }

        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.disconnect().await {
                warn!(error = %e, "Transport teardown reported an error");
            }
        });
        true
    }

    async fn run_intake_loop(
        self: Arc<Self>,
        mut events: tokio::sync::mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::QrChallenge(qr) => {
                    self.lifecycle.qr_challenge(qr).await;
                }
                TransportEvent::Authenticated => {
                    info!("Transport authenticated");
                }
                TransportEvent::Ready => {
                    self.lifecycle.connection_established().await;
                }
                TransportEvent::AuthFailure(reason) => {
                    self.lifecycle.auth_failure(&reason).await;
                }
                TransportEvent::Disconnected(reason) => {
                    self.lifecycle.connection_lost(&reason).await;
                }
                TransportEvent::Message(msg) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.handle_message(msg).await;
                    });
                }
            }
        }
        debug!("Transport event stream closed, intake loop ending");
    }

    /// Per-message boundary: filter, per-contact critical section, and a
    /// catch-all so one bad message never takes the loop down.
    async fn handle_message(self: Arc<Self>, msg: InboundMessage) {
        let snapshot = self.lifecycle.snapshot().await;
        if let Some(reason) = IntakeFilter::evaluate(&msg, &snapshot) {
            debug!(from = %msg.from, %reason, "Inbound message dropped");
            return;
        }

        let _guard = self.locks.acquire(&msg.from.0).await;
        if let Err(e) = self.process_message(&msg, snapshot.epoch).await {
            warn!(from = %msg.from, error = %e, "Message handling failed");
        }
    }

    async fn process_message(&self, msg: &InboundMessage, epoch: u64) -> Result<(), Error> {
        let contact = self
            .contacts
            .upsert(&msg.from, &msg.body, msg.sender_display_name.as_deref())
            .await?;
        info!(from = %contact.display_name, "Message received");

        if !contact.auto_reply {
            debug!(from = %contact.display_name, "Auto-reply disabled, staying silent");
            return Ok(());
        }

        let tables = self.knowledge.snapshot().await;
        let profile = self.profile.get().await;
        let Some(reply) = self.resolver.resolve(&msg.body, &tables, &profile).await else {
            return Ok(());
        };

        // The AI strategy may have been in flight across a teardown or a
        // toggle; re-check before dispatching so stale replies are
        // discarded rather than sent.
        let current = self.lifecycle.snapshot().await;
        if current.state != SessionState::Ready || current.epoch != epoch {
            warn!(to = %msg.from, "Discarding reply resolved under a stale session");
            return Ok(());
        }
        if let Some(now) = self.contacts.get(&msg.from).await
            && !now.auto_reply
        {
            debug!(to = %msg.from, "Auto-reply toggled off mid-flight, discarding reply");
            return Ok(());
        }

        self.transport.send(&msg.from, &reply).await?;
        info!(to = %contact.display_name, "Reply sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use balas_core::completion::{Completion, CompletionRequest};
    use balas_core::error::{CompletionError, TransportError};
    use balas_core::transport::ChatAddress;
    use chrono::Utc;
    use std::future::Future;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::{Mutex, Notify, mpsc};

    struct TestTransport {
        events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
        outbox: Mutex<Vec<(String, String)>>,
    }

    impl TestTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(None),
                outbox: Mutex::new(Vec::new()),
            })
        }

        async fn emit(&self, event: TransportEvent) {
            let guard = self.events.lock().await;
            guard
                .as_ref()
                .expect("transport not started")
                .send(event)
                .await
                .unwrap();
        }

        async fn sent(&self) -> Vec<(String, String)> {
            self.outbox.lock().await.clone()
        }
    }

    #[async_trait]
    impl ChatTransport for TestTransport {
        fn name(&self) -> &str {
            "test"
        }

        async fn start(&self) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
            let (tx, rx) = mpsc::channel(16);
            *self.events.lock().await = Some(tx);
            Ok(rx)
        }

        async fn send(
            &self,
            chat_id: &ChatAddress,
            content: &str,
        ) -> Result<(), TransportError> {
            self.outbox
                .lock()
                .await
                .push((chat_id.to_string(), content.to_string()));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    /// Completion that waits for a release signal, to model an AI call
    /// still in flight while the session changes underneath it.
    struct GatedCompletion {
        gate: Notify,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Completion for GatedCompletion {
        fn name(&self) -> &str {
            "gated"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<String, CompletionError> {
            *self.calls.lock().await += 1;
            self.gate.notified().await;
            Ok("jawaban AI".into())
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl Completion for FailingCompletion {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Network("down".into()))
        }
    }

    struct Harness {
        runtime: Arc<SessionRuntime>,
        transport: Arc<TestTransport>,
        contacts: Arc<ContactRegistry>,
        _dir: TempDir,
    }

    async fn harness_with(completion: Arc<dyn Completion>) -> Harness {
        let dir = TempDir::new().unwrap();
        let transport = TestTransport::new();
        let contacts = Arc::new(ContactRegistry::open(dir.path().join("contacts.json")));
        let knowledge = Arc::new(KnowledgeStore::open(dir.path()));
        knowledge.upsert_keyword("halo", "Halo dari {companyName}").await.unwrap();
        let profile = Arc::new(OrgProfileStore::open(dir.path().join("bot-config.json")));

        let runtime = SessionRuntime::new(
            SessionLifecycle::new(Duration::from_millis(40)),
            transport.clone(),
            Resolver::new(completion),
            contacts.clone(),
            knowledge,
            profile,
        );
        runtime.start().await.unwrap();
        transport.emit(TransportEvent::Ready).await;
        wait_until(|| {
            let runtime = runtime.clone();
            async move { runtime.lifecycle().snapshot().await.state == SessionState::Ready }
        })
        .await;

        Harness {
            runtime,
            transport,
            contacts,
            _dir: dir,
        }
    }

    async fn wait_until<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..100 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    fn fresh_message(from: &str, body: &str) -> InboundMessage {
        InboundMessage {
            from: ChatAddress::from(from),
            body: body.into(),
            timestamp_secs: Utc::now().timestamp() + 1,
            sender_display_name: Some("Budi".into()),
            is_status: false,
            is_group_or_broadcast: false,
        }
    }

    #[tokio::test]
    async fn message_flows_to_reply() {
        let h = harness_with(Arc::new(FailingCompletion)).await;

        h.transport
            .emit(TransportEvent::Message(fresh_message("628123@c.us", "halo")))
            .await;

        let transport = h.transport.clone();
        wait_until(|| {
            let transport = transport.clone();
            async move { !transport.sent().await.is_empty() }
        })
        .await;

        let sent = h.transport.sent().await;
        assert_eq!(sent[0].0, "628123@c.us");
        assert_eq!(sent[0].1, "Halo dari [NAMA PERUSAHAAN]");
    }

    #[tokio::test]
    async fn stale_queued_message_never_reaches_resolver() {
        let h = harness_with(Arc::new(FailingCompletion)).await;

        let mut old = fresh_message("628123@c.us", "halo");
        old.timestamp_secs = Utc::now().timestamp() - 3600;
        h.transport.emit(TransportEvent::Message(old)).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.transport.sent().await.is_empty());
        // It never even reached the registry.
        assert!(h.contacts.list().await.is_empty());
    }

    #[tokio::test]
    async fn auto_reply_off_updates_registry_but_stays_silent() {
        let h = harness_with(Arc::new(FailingCompletion)).await;
        let id = ChatAddress::from("628123@c.us");

        // Wait for the first reply so the toggle cannot race the
        // in-flight dispatch check.
        h.transport
            .emit(TransportEvent::Message(fresh_message("628123@c.us", "halo")))
            .await;
        let transport = h.transport.clone();
        wait_until(|| {
            let transport = transport.clone();
            async move { !transport.sent().await.is_empty() }
        })
        .await;

        h.contacts.set_auto_reply(&id, false).await.unwrap();
        h.transport
            .emit(TransportEvent::Message(fresh_message("628123@c.us", "kedua")))
            .await;

        let contacts = h.contacts.clone();
        wait_until(|| {
            let contacts = contacts.clone();
            async move {
                contacts
                    .get(&ChatAddress::from("628123@c.us"))
                    .await
                    .is_some_and(|c| c.last_message_text == "kedua")
            }
        })
        .await;

        // Only the first message was answered.
        assert_eq!(h.transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn reply_from_stale_session_is_discarded() {
        let gated = Arc::new(GatedCompletion {
            gate: Notify::new(),
            calls: Mutex::new(0),
        });
        let h = harness_with(gated.clone()).await;

        // No keyword/QA hit — goes to the AI strategy and blocks there.
        h.transport
            .emit(TransportEvent::Message(fresh_message(
                "628123@c.us",
                "pertanyaan bebas tanpa kata kunci",
            )))
            .await;
        wait_until(|| {
            let gated = gated.clone();
            async move { *gated.calls.lock().await > 0 }
        })
        .await;

        // Session tears down while the call is in flight, then both the
        // classification and generation calls are released.
        assert!(h.runtime.stop().await);
        gated.gate.notify_waiters();
        tokio::time::sleep(Duration::from_millis(50)).await;
        gated.gate.notify_waiters();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let h = harness_with(Arc::new(FailingCompletion)).await;
        assert!(h.runtime.start().await.is_err());
    }
}
