pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::claim::handlers as claim;
use crate::evaluation::handlers as evaluation;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route("/api/job", post(jobs::handle_create_job))
        .route("/api/jobs", get(jobs::handle_list_jobs))
        .route("/api/job/:job_id/summary", get(jobs::handle_job_summary))
        // Submissions
        .route(
            "/api/evaluations",
            post(evaluation::handle_submit_evaluation),
        )
        .route("/api/status", get(evaluation::handle_status))
        .route("/api/accept", post(evaluation::handle_accept))
        .route("/api/reject", post(evaluation::handle_reject))
        .route(
            "/api/submissions",
            get(evaluation::handle_list_submissions),
        )
        .route(
            "/api/submissions/:submission_id",
            get(evaluation::handle_get_submission),
        )
        // Claims
        .route("/api/claim", post(claim::handle_claim))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use ethers::signers::{LocalWallet, Signer};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::decision::DecisionPolicy;
    use crate::hashing::{address_hex, Hash32};
    use crate::ledger::{Latency, SimulatedLedger};
    use crate::store::{CommitmentStore, MemoryStore};

    const APPLICANT_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn app() -> Router {
        let store: Arc<dyn CommitmentStore> = Arc::new(MemoryStore::new());
        let ledger = Arc::new(SimulatedLedger::new(store.clone(), Latency::None));
        build_router(AppState {
            store,
            ledger,
            policy: DecisionPolicy::default(),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_job(app: &Router) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/job",
            Some(json!({
                "title": "Rust Engineer",
                "description": "Build verifiable hiring infrastructure",
                "requirements": "Rust, async"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["ledger_mode"], "simulated");
        body["job_id"].as_str().unwrap().to_string()
    }

    async fn submit(app: &Router, job_id: &str, wallet: &str, score: f64) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            "/api/evaluations",
            Some(json!({
                "job_id": job_id,
                "wallet_address": wallet,
                "resume_text": "[CANDIDATE] shipped distributed systems",
                "similarity_score": score,
                "model_identifier": "all-MiniLM-L6-v2",
                "encrypted_contact": "b64:ciphertext"
            })),
        )
        .await
    }

    #[tokio::test]
    async fn test_health_reports_mode() {
        let app = app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger_mode"], "simulated");
    }

    #[tokio::test]
    async fn test_full_submission_lifecycle() {
        let app = app();
        let applicant: LocalWallet = APPLICANT_KEY.parse().unwrap();
        let wallet = address_hex(&applicant.address());
        let job_id = create_job(&app).await;

        let (status, receipt) = submit(&app, &job_id, &wallet, 0.8567).await;
        assert_eq!(status, StatusCode::OK, "{receipt}");
        assert_eq!(receipt["decision"], "auto_pass");
        assert_eq!(receipt["anchor"], "simulated");
        let submission_id = receipt["submission_id"].as_str().unwrap().to_string();
        assert_eq!(submission_id.len(), 66);

        let (status, status_body) = send(
            &app,
            "GET",
            &format!("/api/status?submission_id={submission_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(status_body["verified"], true);
        assert_eq!(status_body["disposition"], "pending");
        assert_eq!(status_body["claimed"], false);

        let id: Hash32 = submission_id.parse().unwrap();
        let signature = applicant
            .sign_message(crate::claim::claim_message(&id))
            .await
            .unwrap();
        let (status, body) = send(
            &app,
            "POST",
            "/api/claim",
            Some(json!({
                "submission_id": submission_id,
                "signature": format!("0x{}", hex::encode(signature.to_vec())),
                "wallet_address": applicant.address(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, body) = send(
            &app,
            "POST",
            "/api/accept",
            Some(json!({ "submission_id": submission_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["submission"]["disposition"], "accepted");
        assert_eq!(body["submission"]["claimed"], true);

        let (_, listed) = send(
            &app,
            "GET",
            &format!("/api/submissions?wallet_address={wallet}"),
            None,
        )
        .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["job_id"], job_id.as_str());
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let app = app();
        let job_id = create_job(&app).await;
        let wallet = format!("0x{}", "12".repeat(20));

        let (_, first) = submit(&app, &job_id, &wallet, 0.5).await;
        let (_, second) = submit(&app, &job_id, &wallet, 0.5).await;
        assert_eq!(first["submission_id"], second["submission_id"]);
        assert_eq!(first["tx_hash"], second["tx_hash"]);

        let (_, listed) = send(&app, "GET", &format!("/api/submissions?job_id={job_id}"), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_with_new_score_returns_committed_result() {
        let app = app();
        let job_id = create_job(&app).await;
        let wallet = format!("0x{}", "78".repeat(20));

        let (_, first) = submit(&app, &job_id, &wallet, 0.9).await;
        let (status, second) = submit(&app, &job_id, &wallet, 0.1).await;
        assert_eq!(status, StatusCode::OK, "{second}");
        assert_eq!(second["submission_id"], first["submission_id"]);
        assert_eq!(second["tx_hash"], first["tx_hash"]);
        assert_eq!(second["decision"], "auto_pass");
        assert_eq!(second["score"], 0.9);

        let submission_id = first["submission_id"].as_str().unwrap();
        let (_, stored) = send(&app, "GET", &format!("/api/submissions/{submission_id}"), None).await;
        assert_eq!(stored["decision"], second["decision"]);
        assert_eq!(stored["similarity_score"], second["score"]);
    }

    #[tokio::test]
    async fn test_wrong_signer_is_forbidden() {
        let app = app();
        let job_id = create_job(&app).await;
        let wallet = format!("0x{}", "34".repeat(20));
        let (_, receipt) = submit(&app, &job_id, &wallet, 0.2).await;
        assert_eq!(receipt["decision"], "auto_fail");

        let (status, body) = send(
            &app,
            "POST",
            "/api/claim",
            Some(json!({
                "submission_id": receipt["submission_id"],
                "signature": format!("0x{}", "11".repeat(65)),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_unknown_job_and_submission_are_not_found() {
        let app = app();
        let (status, body) = submit(&app, "JOB-doesnotexist00", &format!("0x{}", "56".repeat(20)), 0.6).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "UNKNOWN_JOB");

        let missing = format!("0x{}", "00".repeat(32));
        let (status, _) = send(&app, "GET", &format!("/api/status?submission_id={missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/api/job/JOB-nope/summary", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_requests() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/job",
            Some(json!({ "title": "", "description": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(&app, "GET", "/api/status?submission_id=0x1234", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
