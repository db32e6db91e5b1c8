//! HTTP handlers for the experience API
//!
//! Error bodies always carry a human-readable `message`; server-side failures
//! add an `error` detail.

use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;
use crate::server::ServerState;
use crate::store::RecordFilter;

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// Submit response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub experience_id: String,
    pub nlp_processed: bool,
    pub sentiment: String,
}

/// Map a pipeline error to a status code and JSON body.
///
/// `action` completes "Failed to ..." for server-side failures.
fn error_response(err: Error, action: &str) -> Response {
    match err {
        Error::Validation(message) | Error::InvalidQuery(message) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
        }
        Error::NotFound(message) => {
            (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
        }
        Error::DuplicateId(_) => {
            (StatusCode::CONFLICT, Json(json!({ "message": err.to_string() }))).into_response()
        }
        other => {
            tracing::error!(error = %other, "Failed to {}", action);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": format!("Failed to {}", action),
                    "error": other.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// GET /experiences
pub async fn list_handler(State(state): State<ServerState>) -> Response {
    match state.service.store().load().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(e, "load experiences"),
    }
}

/// GET /experiences/{id}
pub async fn get_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Response {
    match state.service.store().find_by_id(&id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => error_response(
            Error::NotFound("Experience not found".to_string()),
            "load experience",
        ),
        Err(e) => error_response(e, "load experience"),
    }
}

/// GET /experiences/filter
pub async fn filter_handler(
    State(state): State<ServerState>,
    Query(filter): Query<RecordFilter>,
) -> Response {
    match state.service.store().filter(&filter).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(e, "filter experiences"),
    }
}

/// GET /experiences/search
pub async fn search_handler(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let term = query.q.unwrap_or_default();
    match state.service.store().search(&term).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(e, "search experiences"),
    }
}

/// GET /experiences/stats
pub async fn stats_handler(State(state): State<ServerState>) -> Response {
    match state.service.store().stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e, "get experience statistics"),
    }
}

/// POST /submit-experience
pub async fn submit_handler(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(
                Error::Validation(format!("Invalid request body: {}", rejection.body_text())),
                "submit experience",
            )
        }
    };

    match state.service.submit(body).await {
        Ok(record) => {
            let response = SubmitResponse {
                message: "Experience submitted successfully".to_string(),
                experience_id: record.id,
                nlp_processed: record.nlp_processed,
                sentiment: record.sentiment_analysis.sentiment.to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e, "submit experience"),
    }
}

/// GET /health
pub async fn health_handler(State(state): State<ServerState>) -> Response {
    match state.service.store().health().await {
        Ok(counts) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "stats": counts
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "unhealthy",
                "error": e.to_string()
            })),
        )
            .into_response(),
    }
}

/// POST /test-nlp
pub async fn test_nlp_handler(State(state): State<ServerState>) -> Response {
    match state.service.probe().await {
        Ok(processed) => {
            let tools = processed
                .extra
                .get("nlp_tools_used")
                .cloned()
                .unwrap_or(Value::Null);
            (
                StatusCode::OK,
                Json(json!({
                    "message": "NLP processing test successful",
                    "processed": processed,
                    "nlp_tools_used": tools
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "NLP self-test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "NLP processing test failed",
                    "error": e.to_string(),
                    "fallback_available": true
                })),
            )
                .into_response()
        }
    }
}
