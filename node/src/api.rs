//! # REST API
//!
//! Builds the axum router that exposes the ledger node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                              | Description                        |
//! |--------|-----------------------------------|------------------------------------|
//! | GET    | `/health`                         | Liveness probe                     |
//! | GET    | `/status`                         | Node status summary                |
//! | POST   | `/certificates`                   | Register a certificate record      |
//! | GET    | `/certificates/verify/:hash`      | Verify a content hash              |
//! | GET    | `/certificates/:id/history`       | Full history of a certificate id   |
//! | GET    | `/certificates/recent?limit=N`    | Recent registrations, newest first |
//! | GET    | `/chain/info`                     | Statistics + boundary blocks       |
//! | GET    | `/chain/validate`                 | Full-chain integrity verification  |
//!
//! Lookups that find nothing return 200 with an explicit not-found body
//! (`exists: false`) rather than 404 — absence of a registration is an
//! answer, not an error. Policy rejections come back as 422 with the
//! full verdict so the submitter knows which rules to fix.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use attest_ledger::config::DEFAULT_RECENT_LIMIT;
use attest_ledger::policy::PolicyVerdict;
use attest_ledger::service::RegisterOutcome;
use attest_ledger::{CertificateRecord, LedgerService};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The one ledger instance this node hosts.
    pub ledger: Arc<LedgerService>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/certificates", post(register_handler))
        .route("/certificates/recent", get(recent_handler))
        .route("/certificates/verify/:content_hash", get(verify_handler))
        .route("/certificates/:certificate_id/history", get(history_handler))
        .route("/chain/info", get(info_handler))
        .route("/chain/validate", get(validate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Total blocks in the chain, genesis included.
    pub total_blocks: u64,
    /// Certificate registrations in the chain.
    pub total_certificates: u64,
    /// Registrations carrying the literal status "verified".
    pub verified_certificates: u64,
    /// Result of a full integrity verification.
    pub chain_valid: bool,
    /// The chain's sealing difficulty.
    pub difficulty: u32,
    /// Hash of the latest block.
    pub latest_block_hash: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Body of a successful `POST /certificates`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterAccepted {
    /// Always `true` in this shape.
    pub success: bool,
    /// Hash of the newly sealed block.
    pub block_hash: String,
    /// Index of the newly sealed block.
    pub block_index: u64,
    /// Content hash — the caller's key for later verification.
    pub content_hash: String,
    /// The admission verdict.
    pub verdict: PolicyVerdict,
    /// Registration time, RFC 3339.
    pub timestamp: String,
    /// Present when the append succeeded but the snapshot save failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

/// Body of a policy-rejected `POST /certificates` (HTTP 422).
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRejected {
    /// Always `false` in this shape.
    pub success: bool,
    /// Short human-readable reason.
    pub error: String,
    /// The full admission verdict, including the failed rules.
    pub verdict: PolicyVerdict,
}

/// Query parameters for `GET /certificates/recent`.
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not inspect the chain — that belongs in
/// `/status` and `/chain/validate`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns a node status summary built from the chain
/// statistics.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.info() {
        Ok(info) => {
            let resp = StatusResponse {
                version: state.version.clone(),
                total_blocks: info.stats.total_blocks,
                total_certificates: info.stats.total_certificates,
                verified_certificates: info.stats.verified_certificates,
                chain_valid: info.stats.chain_valid,
                difficulty: info.stats.difficulty,
                latest_block_hash: info.stats.latest_block_hash,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            Json(resp).into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

/// `POST /certificates` — run the record through the admission policy
/// and, on pass, seal it into the chain.
///
/// Sealing is CPU-bound and synchronous by contract, so it runs on the
/// blocking pool rather than stalling the async runtime.
async fn register_handler(
    State(state): State<AppState>,
    Json(record): Json<CertificateRecord>,
) -> impl IntoResponse {
    let ledger = Arc::clone(&state.ledger);
    let started = std::time::Instant::now();

    let joined = tokio::task::spawn_blocking(move || ledger.register(&record)).await;
    let outcome = match joined {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("registration task panicked: {}", e);
            return internal_error(e).into_response();
        }
    };

    match outcome {
        Ok(RegisterOutcome::Registered(reg)) => {
            state.metrics.registrations_total.inc();
            state.metrics.blocks_sealed_total.inc();
            state.metrics.chain_length.set((reg.block_index + 1) as i64);
            state.metrics.seal_attempts.observe(reg.seal_attempts as f64);
            state
                .metrics
                .seal_duration_seconds
                .observe(started.elapsed().as_secs_f64());
            if reg.persistence_error.is_some() {
                state.metrics.persistence_failures_total.inc();
            }

            let resp = RegisterAccepted {
                success: true,
                block_hash: reg.block_hash,
                block_index: reg.block_index,
                content_hash: reg.content_hash,
                verdict: reg.verdict,
                timestamp: reg.timestamp,
                persistence_error: reg.persistence_error,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Ok(RegisterOutcome::Rejected { verdict }) => {
            state.metrics.policy_rejections_total.inc();
            let resp = RegisterRejected {
                success: false,
                error: "certificate failed admission policy".to_string(),
                verdict,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(resp)).into_response()
        }
        Err(e) => internal_error(e).into_response(),
    }
}

/// `GET /certificates/verify/:content_hash` — look up a registration by
/// its content hash. Always 200; absence is reported in the body.
async fn verify_handler(
    Path(content_hash): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    Json(state.ledger.verify(&content_hash))
}

/// `GET /certificates/:certificate_id/history` — every registration for
/// the certificate id, earliest first. Always 200; an unknown id yields
/// an empty history with `exists: false`.
async fn history_handler(
    Path(certificate_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    Json(state.ledger.history(&certificate_id))
}

/// `GET /certificates/recent` — recent registrations, newest first.
async fn recent_handler(
    Query(params): Query<RecentParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.ledger.recent(limit))
}

/// `GET /chain/info` — chain statistics plus genesis and latest blocks.
async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.info() {
        Ok(info) => Json(info).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}

/// `GET /chain/validate` — run a full integrity verification.
async fn validate_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger.validate())
}

/// 500 with a JSON error body. The ledger's own invariants make these
/// unreachable in practice; the handler exists so a bug reports itself
/// instead of panicking the worker.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use attest_ledger::policy::RulePolicy;
    use attest_ledger::service::{HistoryReport, ValidationReport, VerificationReport};
    use attest_ledger::{JsonSnapshotStore, RecentEntry};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::metrics::NodeMetrics;

    /// Creates a test AppState backed by a temporary snapshot directory.
    /// The TempDir must outlive the state, so it rides along.
    fn test_app_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonSnapshotStore::new(dir.path().join("ledger.snapshot.json"));
        let ledger = LedgerService::open(1, Box::new(store), Box::<RulePolicy>::default())
            .expect("open ledger");

        let state = AppState {
            version: "0.1.0-test".into(),
            ledger: Arc::new(ledger),
            metrics: Arc::new(NodeMetrics::new()),
        };
        (state, dir)
    }

    fn passing_record() -> serde_json::Value {
        serde_json::json!({
            "certificate_id": "cert-100",
            "certificate_number": "C-100",
            "certificate_type": "diploma",
            "owner_id": "U1",
            "owner_name": "Ada Lovelace",
            "verification_status": "verified",
            "verified_by": "registrar",
            "confidence_score": 80,
            "file_hash": "abc123",
        })
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Registers the passing record and returns its accepted body.
    async fn register(router: &Router) -> RegisterAccepted {
        let (status, body) = post_json(router, "/certificates", passing_record()).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    // -- 1. Health endpoint ---------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    // -- 2. Status reflects the fresh chain ----------------------------------

    #[tokio::test]
    async fn status_endpoint_reports_genesis_only() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);
        let (status, body) = get(&router, "/status").await;

        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.total_blocks, 1);
        assert_eq!(resp.total_certificates, 0);
        assert!(resp.chain_valid);
        assert_eq!(resp.difficulty, 1);
        assert_eq!(resp.version, "0.1.0-test");
    }

    // -- 3. Registration succeeds and updates metrics -------------------------

    #[tokio::test]
    async fn register_returns_sealed_block_details() {
        let (state, _dir) = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let accepted = register(&router).await;
        assert!(accepted.success);
        assert_eq!(accepted.block_index, 1);
        assert!(accepted.block_hash.starts_with('0'));
        assert!(accepted.verdict.valid);
        assert!(accepted.persistence_error.is_none());

        assert_eq!(metrics.registrations_total.get(), 1);
        assert_eq!(metrics.blocks_sealed_total.get(), 1);
        assert_eq!(metrics.chain_length.get(), 2);
    }

    // -- 4. Register then verify through the API ------------------------------

    #[tokio::test]
    async fn registered_certificate_verifies() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);

        let accepted = register(&router).await;
        let (status, body) = get(
            &router,
            &format!("/certificates/verify/{}", accepted.content_hash),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let report: VerificationReport = serde_json::from_slice(&body).unwrap();
        assert!(report.exists);
        assert!(report.verified);
        assert_eq!(report.block_index, Some(1));
        assert_eq!(report.block_hash.as_deref(), Some(accepted.block_hash.as_str()));
    }

    // -- 5. Verify of an unknown hash is a 200 not-found ----------------------

    #[tokio::test]
    async fn verify_unknown_hash_is_not_an_error() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);

        let (status, body) = get(&router, &format!("/certificates/verify/{}", "f".repeat(64))).await;
        assert_eq!(status, StatusCode::OK);
        let report: VerificationReport = serde_json::from_slice(&body).unwrap();
        assert!(!report.exists);
        assert_eq!(report.verification_status, "NOT_FOUND");
    }

    // -- 6. Policy rejection returns 422 with the verdict ----------------------

    #[tokio::test]
    async fn rejected_registration_carries_the_verdict() {
        let (state, _dir) = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let (status, body) = post_json(
            &router,
            "/certificates",
            serde_json::json!({ "certificate_number": "C-1" }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let resp: RegisterRejected = serde_json::from_slice(&body).unwrap();
        assert!(!resp.success);
        assert!(!resp.verdict.valid);
        assert!(resp
            .verdict
            .rules_failed
            .contains(&"owner_id_missing".to_string()));
        assert_eq!(metrics.policy_rejections_total.get(), 1);
        assert_eq!(metrics.registrations_total.get(), 0);
    }

    // -- 7. History lists both registrations in order --------------------------

    #[tokio::test]
    async fn history_returns_entries_in_registration_order() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);

        register(&router).await;
        register(&router).await;

        let (status, body) = get(&router, "/certificates/cert-100/history").await;
        assert_eq!(status, StatusCode::OK);
        let report: HistoryReport = serde_json::from_slice(&body).unwrap();
        assert!(report.exists);
        assert_eq!(report.total_transactions, 2);
        assert_eq!(report.entries[0].block_index, 1);
        assert_eq!(report.entries[1].block_index, 2);
    }

    // -- 8. Recent honors the limit parameter ----------------------------------

    #[tokio::test]
    async fn recent_respects_the_limit() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);

        register(&router).await;
        register(&router).await;

        let (status, body) = get(&router, "/certificates/recent?limit=1").await;
        assert_eq!(status, StatusCode::OK);
        let entries: Vec<RecentEntry> = serde_json::from_slice(&body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].block_index, 2);
    }

    // -- 9. Chain validation reports a healthy chain ----------------------------

    #[tokio::test]
    async fn validate_endpoint_reports_chain_health() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);
        register(&router).await;

        let (status, body) = get(&router, "/chain/validate").await;
        assert_eq!(status, StatusCode::OK);
        let report: ValidationReport = serde_json::from_slice(&body).unwrap();
        assert!(report.chain_valid);
        assert_eq!(report.total_blocks, 2);
        assert!(report.failed_index.is_none());
    }

    // -- 10. Chain info exposes boundary blocks ---------------------------------

    #[tokio::test]
    async fn info_endpoint_returns_genesis_and_latest() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);
        register(&router).await;

        let (status, body) = get(&router, "/chain/info").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["genesis_block"]["index"], 0);
        assert_eq!(json["latest_block"]["index"], 1);
        assert_eq!(json["stats"]["total_certificates"], 1);
    }

    // -- 11. Malformed JSON body is rejected by the extractor --------------------

    #[tokio::test]
    async fn malformed_body_is_a_client_error() {
        let (state, _dir) = test_app_state();
        let router = create_router(state);

        let req = Request::builder()
            .method("POST")
            .uri("/certificates")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }
}
