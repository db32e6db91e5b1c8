//! HTTP API tests driving the router in-process

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use interview_insights::analysis::Analyzer;
use interview_insights::{
    AnalyzerError, Config, ExperienceRecord, IngestionService, RecordStore, ServerState, Submission,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Analyzer that always fails, forcing the heuristic fallback
struct UnavailableAnalyzer;

#[async_trait::async_trait]
impl Analyzer for UnavailableAnalyzer {
    async fn analyze(&self, _submission: &Submission) -> Result<ExperienceRecord, AnalyzerError> {
        Err(AnalyzerError::OutputMissing)
    }
}

/// Analyzer that accepts everything and tags the record
struct EchoAnalyzer;

#[async_trait::async_trait]
impl Analyzer for EchoAnalyzer {
    async fn analyze(&self, submission: &Submission) -> Result<ExperienceRecord, AnalyzerError> {
        let mut record = ExperienceRecord::from_submission(submission.clone());
        record.nlp_processed = true;
        record
            .extra
            .insert("nlp_tools_used".to_string(), json!(["VADER", "NLTK"]));
        Ok(record)
    }
}

fn app(dir: &TempDir, analyzer: Arc<dyn Analyzer>) -> Router {
    let mut config = Config::default();
    config.storage.store_path = dir.path().join("processed_experiences.json");
    config.storage.artifact_dir = dir.path().join("artifacts");

    let store = Arc::new(RecordStore::new(config.storage.store_path.clone()));
    let state = ServerState {
        config: Arc::new(config),
        service: Arc::new(IngestionService::new(store, analyzer)),
    };
    interview_insights::router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_submit_then_get_by_id() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));

    let (status, body) = post(
        &app,
        "/submit-experience",
        json!({"company": "Acme", "role": "Engineer", "experience": "Two rounds."}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Experience submitted successfully");
    assert_eq!(body["nlp_processed"], true);

    let id = body["experience_id"].as_str().unwrap().to_string();
    let (status, record) = get(&app, &format!("/experiences/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["id"], id.as_str());
    assert_eq!(record["company"], "Acme");
    assert_eq!(record["source"], "User Submission");
}

#[tokio::test]
async fn test_unknown_id_is_404() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));

    let (status, body) = get(&app, "/experiences/exp_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Experience not found");
}

#[tokio::test]
async fn test_missing_fields_leave_store_untouched() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));
    post(&app, "/submit-experience", json!({"company": "Acme", "role": "Engineer"})).await;

    for body in [
        json!({"company": "Acme"}),
        json!({"role": "Engineer"}),
        json!({"company": "", "role": "Engineer"}),
    ] {
        let (status, response) = post(&app, "/submit-experience", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Company and role are required fields");
    }

    let (_, records) = get(&app, "/experiences").await;
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));

    let request = Request::post("/submit-experience")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_duplicate_client_id_is_409() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));
    let body = json!({"id": "exp_fixed", "company": "Acme", "role": "Engineer"});

    let (status, _) = post(&app, "/submit-experience", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "/submit-experience", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(UnavailableAnalyzer));
    for company in ["Acme", "Globex", "Initech"] {
        post(&app, "/submit-experience", json!({"company": company, "role": "Engineer"})).await;
    }

    let (_, first) = get(&app, "/experiences").await;
    let (_, second) = get(&app, "/experiences").await;
    assert_eq!(first, second);

    let companies: Vec<_> = first
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["company"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(companies, ["Acme", "Globex", "Initech"]);
}

#[tokio::test]
async fn test_fallback_scenario() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(UnavailableAnalyzer));

    let (status, body) = post(
        &app,
        "/submit-experience",
        json!({
            "company": "Acme",
            "role": "Engineer",
            "experience": "It was a great and smooth process. What languages do you know?"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nlp_processed"], false);
    assert_eq!(body["sentiment"], "positive");

    let id = body["experience_id"].as_str().unwrap();
    let (_, record) = get(&app, &format!("/experiences/{}", id)).await;
    assert_eq!(record["feedback_sentiment"], "positive");
    assert_eq!(record["nlp_processed"], false);
    assert_eq!(
        record["categorized_questions"]["other"],
        json!(["What languages do you know?"])
    );
}

#[tokio::test]
async fn test_search_length_boundary() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(UnavailableAnalyzer));

    let (status, body) = get(&app, "/experiences/search?q=a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search query must be at least 2 characters");

    let (status, _) = get(&app, "/experiences/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/experiences/search?q=ab").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_sentiment_distribution() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(UnavailableAnalyzer));
    for text in [
        "A great experience overall.",
        "Smooth and friendly.",
        "Stressful, and I was rejected.",
    ] {
        post(
            &app,
            "/submit-experience",
            json!({"company": "Acme", "role": "Engineer", "experience": text}),
        )
        .await;
    }

    let (status, stats) = get(&app, "/experiences/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 3);
    assert_eq!(
        stats["sentiment_distribution"],
        json!({"positive": 2, "negative": 1})
    );
}

#[tokio::test]
async fn test_filter_company_substring() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));
    post(&app, "/submit-experience", json!({"company": "Acme Corp", "role": "Engineer"})).await;
    post(&app, "/submit-experience", json!({"company": "Globex", "role": "Engineer"})).await;

    let (status, body) = get(&app, "/experiences/filter?company=acme").await;
    assert_eq!(status, StatusCode::OK);
    let matched = body.as_array().unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0]["company"], "Acme Corp");

    let (_, all) = get(&app, "/experiences/filter?company=all").await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_routes_also_served_under_api_prefix() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));

    let (status, _) = post(
        &app,
        "/api/submit-experience",
        json!({"company": "Acme", "role": "Engineer"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, records) = get(&app, "/api/user-experiences").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_health_counts_processing_paths() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, Arc::new(UnavailableAnalyzer));
    post(&app, "/submit-experience", json!({"company": "Acme", "role": "Engineer"})).await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
    assert_eq!(
        body["stats"],
        json!({"total_experiences": 1, "nlp_processed": 0, "fallback_processed": 1})
    );
}

#[tokio::test]
async fn test_corrupt_store_reports_unhealthy() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("processed_experiences.json"), "{broken").unwrap();
    let app = app(&dir, Arc::new(EchoAnalyzer));

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "unhealthy");

    let (status, body) = get(&app, "/experiences").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to load experiences");
}

#[tokio::test]
async fn test_nlp_self_test() {
    let dir = TempDir::new().unwrap();

    let ok = app(&dir, Arc::new(EchoAnalyzer));
    let (status, body) = post(&ok, "/test-nlp", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "NLP processing test successful");
    assert_eq!(body["processed"]["company"], "Test Company");
    assert_eq!(body["nlp_tools_used"], json!(["VADER", "NLTK"]));

    let broken = app(&dir, Arc::new(UnavailableAnalyzer));
    let (status, body) = post(&broken, "/test-nlp", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "NLP processing test failed");
    assert_eq!(body["error"], "Output file not created");
    assert_eq!(body["fallback_available"], true);

    // The self-test never persists anything
    let (_, records) = get(&broken, "/experiences").await;
    assert!(records.as_array().unwrap().is_empty());
}
