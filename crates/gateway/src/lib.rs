//! HTTP control surface for balas.
//!
//! Thin pass-throughs to the session runtime and the stores:
//!
//! - `GET  /health`                        — liveness
//! - `GET  /api/session/status`            — status label + QR presence
//! - `GET  /api/session/qr`                — current pairing challenge
//! - `POST /api/session/start`             — rejected while cleaning
//! - `POST /api/session/stop`              — accept-then-teardown
//! - `GET|POST /api/knowledge`             — keyword table
//! - `DELETE /api/knowledge/{keyword}`
//! - `POST /api/knowledge/import`          — CSV bulk import
//! - `GET|POST /api/qa`                    — QA table
//! - `DELETE /api/qa/{id}`
//! - `POST /api/qa/import`                 — CSV bulk import
//! - `GET|POST /api/profile`               — org profile
//! - `GET  /api/contacts`
//! - `POST /api/contacts/{id}/auto-reply`
//!
//! Every mutation answers `{ success, message }`. Built on Axum.

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use balas_core::contact::Contact;
use balas_core::error::{Error, SessionError, StoreError};
use balas_core::knowledge::{KeywordEntry, QaEntry};
use balas_core::profile::OrgProfile;
use balas_core::transport::ChatAddress;
use balas_session::SessionRuntime;
use balas_store::{ContactRegistry, ImportReport, KnowledgeStore, NewQaEntry, OrgProfileStore};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the control surface.
pub struct GatewayState {
    pub runtime: Arc<SessionRuntime>,
    pub contacts: Arc<ContactRegistry>,
    pub knowledge: Arc<KnowledgeStore>,
    pub profile: Arc<OrgProfileStore>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all control-surface routes.
///
/// CORS is permissive: the admin UI is an external collaborator that may
/// be served from anywhere on the operator's machine.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/session/status", get(session_status_handler))
        .route("/api/session/qr", get(session_qr_handler))
        .route("/api/session/start", post(session_start_handler))
        .route("/api/session/stop", post(session_stop_handler))
        .route(
            "/api/knowledge",
            get(list_keywords_handler).post(upsert_keyword_handler),
        )
        .route("/api/knowledge/import", post(import_keywords_handler))
        .route("/api/knowledge/{keyword}", delete(delete_keyword_handler))
        .route("/api/qa", get(list_qa_handler).post(upsert_qa_handler))
        .route("/api/qa/import", post(import_qa_handler))
        .route("/api/qa/{id}", delete(delete_qa_handler))
        .route(
            "/api/profile",
            get(get_profile_handler).post(set_profile_handler),
        )
        .route("/api/contacts", get(list_contacts_handler))
        .route(
            "/api/contacts/{id}/auto-reply",
            post(toggle_auto_reply_handler),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the control surface until the process exits.
pub async fn serve(host: &str, port: u16, state: SharedState) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Control surface listening");
    axum::serve(listener, build_router(state)).await
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct MutationResponse {
    success: bool,
    message: String,
}

impl MutationResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: String,
    has_qr: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ready_since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Serialize, Deserialize)]
struct QrResponse {
    qr: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct KeywordListResponse {
    keywords: Vec<KeywordEntry>,
}

#[derive(Deserialize)]
struct UpsertKeywordRequest {
    keyword: String,
    response: String,
}

#[derive(Serialize, Deserialize)]
struct QaListResponse {
    data: Vec<QaEntry>,
}

#[derive(Serialize, Deserialize)]
struct ContactListResponse {
    contacts: Vec<Contact>,
}

#[derive(Deserialize)]
struct ToggleAutoReplyRequest {
    enabled: bool,
}

#[derive(Serialize)]
struct ImportResponse {
    success: bool,
    message: String,
    stats: ImportReport,
}

type MutationResult = Result<Json<MutationResponse>, (StatusCode, Json<MutationResponse>)>;

fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<MutationResponse>) {
    (
        status,
        Json(MutationResponse {
            success: false,
            message: message.into(),
        }),
    )
}

fn store_error(e: StoreError) -> (StatusCode, Json<MutationResponse>) {
    let status = match &e {
        StoreError::Validation(_) | StoreError::Import(_) => StatusCode::BAD_REQUEST,
        StoreError::ContactNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    reject(status, e.to_string())
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn session_status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let snapshot = state.runtime.lifecycle().snapshot().await;
    Json(StatusResponse {
        status: snapshot.state.status_label().to_string(),
        has_qr: snapshot.qr.is_some(),
        ready_since: snapshot.ready_since,
    })
}

async fn session_qr_handler(State(state): State<SharedState>) -> Json<QrResponse> {
    let snapshot = state.runtime.lifecycle().snapshot().await;
    Json(QrResponse { qr: snapshot.qr })
}

async fn session_start_handler(State(state): State<SharedState>) -> MutationResult {
    match state.runtime.start().await {
        Ok(()) => Ok(MutationResponse::ok(
            "Session initializing — watch /api/session/qr for the pairing challenge",
        )),
        Err(Error::Session(e @ SessionError::StartRejected(_))) => {
            Err(reject(StatusCode::CONFLICT, e.to_string()))
        }
        Err(Error::Session(e @ SessionError::AlreadyRunning)) => {
            Err(reject(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn session_stop_handler(State(state): State<SharedState>) -> Json<MutationResponse> {
    if state.runtime.stop().await {
        MutationResponse::ok("Session stopping — teardown continues in the background")
    } else {
        MutationResponse::ok("Session already inactive")
    }
}

async fn list_keywords_handler(State(state): State<SharedState>) -> Json<KeywordListResponse> {
    Json(KeywordListResponse {
        keywords: state.knowledge.list_keywords().await,
    })
}

async fn upsert_keyword_handler(
    State(state): State<SharedState>,
    Json(payload): Json<UpsertKeywordRequest>,
) -> MutationResult {
    let updated = state
        .knowledge
        .upsert_keyword(&payload.keyword, &payload.response)
        .await
        .map_err(store_error)?;
    Ok(MutationResponse::ok(if updated {
        "Keyword updated"
    } else {
        "Keyword added"
    }))
}

async fn delete_keyword_handler(
    State(state): State<SharedState>,
    Path(keyword): Path<String>,
) -> MutationResult {
    state
        .knowledge
        .remove_keyword(&keyword)
        .await
        .map_err(store_error)?;
    Ok(MutationResponse::ok("Keyword removed"))
}

async fn import_keywords_handler(
    State(state): State<SharedState>,
    body: axum::body::Bytes,
) -> Result<Json<ImportResponse>, (StatusCode, Json<MutationResponse>)> {
    let stats = state
        .knowledge
        .import_keywords_csv(&body)
        .await
        .map_err(store_error)?;
    Ok(Json(ImportResponse {
        success: true,
        message: format!(
            "Import finished: {} added, {} updated",
            stats.imported, stats.updated
        ),
        stats,
    }))
}

async fn list_qa_handler(State(state): State<SharedState>) -> Json<QaListResponse> {
    Json(QaListResponse {
        data: state.knowledge.list_qa().await,
    })
}

async fn upsert_qa_handler(
    State(state): State<SharedState>,
    Json(payload): Json<NewQaEntry>,
) -> MutationResult {
    let (entry, updated) = state
        .knowledge
        .upsert_qa(payload)
        .await
        .map_err(store_error)?;
    Ok(MutationResponse::ok(if updated {
        format!("QA entry {} updated", entry.id)
    } else {
        format!("QA entry {} added", entry.id)
    }))
}

async fn delete_qa_handler(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> MutationResult {
    state.knowledge.remove_qa(id).await.map_err(store_error)?;
    Ok(MutationResponse::ok("QA entry removed"))
}

async fn import_qa_handler(
    State(state): State<SharedState>,
    body: axum::body::Bytes,
) -> Result<Json<ImportResponse>, (StatusCode, Json<MutationResponse>)> {
    let stats = state
        .knowledge
        .import_qa_csv(&body)
        .await
        .map_err(store_error)?;
    Ok(Json(ImportResponse {
        success: true,
        message: format!(
            "Import finished: {} added, {} updated",
            stats.imported, stats.updated
        ),
        stats,
    }))
}

async fn get_profile_handler(State(state): State<SharedState>) -> Json<OrgProfile> {
    Json(state.profile.get().await)
}

async fn set_profile_handler(
    State(state): State<SharedState>,
    Json(profile): Json<OrgProfile>,
) -> MutationResult {
    state.profile.set(profile).await.map_err(store_error)?;
    Ok(MutationResponse::ok("Profile saved"))
}

async fn list_contacts_handler(State(state): State<SharedState>) -> Json<ContactListResponse> {
    Json(ContactListResponse {
        contacts: state.contacts.list().await,
    })
}

async fn toggle_auto_reply_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ToggleAutoReplyRequest>,
) -> MutationResult {
    let contact = state
        .contacts
        .set_auto_reply(&ChatAddress(id), payload.enabled)
        .await
        .map_err(store_error)?;
    Ok(MutationResponse::ok(format!(
        "Auto-reply for {} set to {}",
        contact.display_name,
        if payload.enabled { "on" } else { "off" }
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use balas_core::completion::{Completion, CompletionRequest};
    use balas_core::error::CompletionError;
    use balas_core::transport::TransportEvent;
    use balas_resolver::Resolver;
    use balas_session::SessionLifecycle;
    use balas_transport::{WhatsAppConfig, WhatsAppTransport};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct NoopCompletion;

    #[async_trait::async_trait]
    impl Completion for NoopCompletion {
        fn name(&self) -> &str {
            "noop"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Network("not wired in tests".into()))
        }
    }

    struct Fixture {
        router: Router,
        state: SharedState,
        transport: Arc<WhatsAppTransport>,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(WhatsAppTransport::new(WhatsAppConfig {
            auth_dir: dir.path().join(".wa-auth"),
        }));
        let contacts = Arc::new(ContactRegistry::open(dir.path().join("contacts.json")));
        let knowledge = Arc::new(KnowledgeStore::open(dir.path()));
        let profile = Arc::new(OrgProfileStore::open(dir.path().join("bot-config.json")));

        let runtime = SessionRuntime::new(
            SessionLifecycle::new(Duration::from_millis(500)),
            transport.clone(),
            Resolver::new(Arc::new(NoopCompletion)),
            contacts.clone(),
            knowledge.clone(),
            profile.clone(),
        );

        let state = Arc::new(GatewayState {
            runtime,
            contacts,
            knowledge,
            profile,
        });

        Fixture {
            router: build_router(state.clone()),
            state,
            transport,
            _dir: dir,
        }
    }

    async fn request(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let f = fixture();
        let (status, body) = request(&f.router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn session_status_progression() {
        let f = fixture();

        let (_, body) = request(&f.router, "GET", "/api/session/status", None).await;
        assert_eq!(body["status"], "offline");
        assert_eq!(body["hasQr"], false);

        let (status, _) = request(&f.router, "POST", "/api/session/start", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = request(&f.router, "GET", "/api/session/status", None).await;
        assert_eq!(body["status"], "initializing");

        f.transport
            .inject(TransportEvent::QrChallenge("qr-payload".into()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (_, body) = request(&f.router, "GET", "/api/session/status", None).await;
        assert_eq!(body["status"], "awaitingScan");
        assert_eq!(body["hasQr"], true);

        let (_, body) = request(&f.router, "GET", "/api/session/qr", None).await;
        assert_eq!(body["qr"], "qr-payload");

        // Second start while running is a conflict.
        let (status, body) = request(&f.router, "POST", "/api/session/start", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn session_stop_reports_acceptance() {
        let f = fixture();
        let (_, body) = request(&f.router, "POST", "/api/session/stop", None).await;
        assert_eq!(body["success"], true);
        assert!(body["message"].as_str().unwrap().contains("inactive"));

        request(&f.router, "POST", "/api/session/start", None).await;
        f.transport.inject(TransportEvent::Ready).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (_, body) = request(&f.router, "POST", "/api/session/stop", None).await;
        assert_eq!(body["success"], true);
        assert!(body["message"].as_str().unwrap().contains("stopping"));

        let (_, body) = request(&f.router, "GET", "/api/session/status", None).await;
        assert_eq!(body["status"], "cleaning");
    }

    #[tokio::test]
    async fn keyword_crud_round_trip() {
        let f = fixture();

        let (status, body) = request(
            &f.router,
            "POST",
            "/api/knowledge",
            Some(serde_json::json!({"keyword": "Halo", "response": "Hai {companyName}"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, body) = request(&f.router, "GET", "/api/knowledge", None).await;
        assert_eq!(body["keywords"][0]["keyword"], "halo");

        let (status, _) = request(&f.router, "DELETE", "/api/knowledge/halo", None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = request(&f.router, "GET", "/api/knowledge", None).await;
        assert!(body["keywords"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn keyword_validation_rejected_with_message() {
        let f = fixture();
        let (status, body) = request(
            &f.router,
            "POST",
            "/api/knowledge",
            Some(serde_json::json!({"keyword": "", "response": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("must not be empty"));
    }

    #[tokio::test]
    async fn qa_upsert_assigns_ids() {
        let f = fixture();

        let (_, body) = request(
            &f.router,
            "POST",
            "/api/qa",
            Some(serde_json::json!({"question": "q1", "answer": "a1"})),
        )
        .await;
        assert!(body["message"].as_str().unwrap().contains("1 added"));

        let (_, body) = request(
            &f.router,
            "POST",
            "/api/qa",
            Some(serde_json::json!({"question": "q2", "answer": "a2", "ustadz": "Ust. A"})),
        )
        .await;
        assert!(body["message"].as_str().unwrap().contains("2 added"));

        let (_, body) = request(&f.router, "GET", "/api/qa", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][1]["attributedTo"], "Ust. A");

        let (status, _) = request(&f.router, "DELETE", "/api/qa/1", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = request(&f.router, "GET", "/api/qa", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_round_trip() {
        let f = fixture();

        let (_, body) = request(&f.router, "GET", "/api/profile", None).await;
        assert_eq!(body["companyName"], "[NAMA PERUSAHAAN]");

        let mut profile = OrgProfile::default();
        profile.company_name = "Masjid Al-Ikhlas".into();
        let (status, _) = request(
            &f.router,
            "POST",
            "/api/profile",
            Some(serde_json::to_value(&profile).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = request(&f.router, "GET", "/api/profile", None).await;
        assert_eq!(body["companyName"], "Masjid Al-Ikhlas");
    }

    #[tokio::test]
    async fn toggle_auto_reply_for_missing_contact_is_404() {
        let f = fixture();
        let (status, body) = request(
            &f.router,
            "POST",
            "/api/contacts/ghost@c.us/auto-reply",
            Some(serde_json::json!({"enabled": false})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn toggle_auto_reply_for_known_contact() {
        let f = fixture();
        f.state
            .contacts
            .upsert(&ChatAddress::from("628123@c.us"), "halo", Some("Budi"))
            .await
            .unwrap();

        let (status, body) = request(
            &f.router,
            "POST",
            "/api/contacts/628123@c.us/auto-reply",
            Some(serde_json::json!({"enabled": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("Budi"));

        let (_, body) = request(&f.router, "GET", "/api/contacts", None).await;
        assert_eq!(body["contacts"][0]["autoReply"], false);
    }

    #[tokio::test]
    async fn csv_import_endpoint_reports_stats() {
        let f = fixture();
        let csv = "keyword,response\nhalo,Hai\ninfo,Hubungi {phone}\n";
        let response = f
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/knowledge/import")
                    .header("content-type", "text/csv")
                    .body(Body::from(csv))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["stats"]["imported"], 2);
        assert_eq!(body["stats"]["updated"], 0);
    }

    #[tokio::test]
    async fn csv_import_without_required_columns_is_rejected() {
        let f = fixture();
        let response = f
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/qa/import")
                    .header("content-type", "text/csv")
                    .body(Body::from("foo,bar\n1,2\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
