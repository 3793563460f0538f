//! Route definitions for the verification API stub.
//!
//! Responses deserialize cleanly into `idv-client`'s status report and
//! submission receipt (snake_case JSON, `error` on failures).

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::store::{AppState, Decision};

/// Build the router with all stub routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/verification/verification-status",
            get(verification_status),
        )
        .route("/api/verification/verify-identity", post(verify_identity))
        .fallback(not_implemented)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// The bearer token, which doubles as the user key.
fn bearer(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Authorization token required"))
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> StatusCode {
    StatusCode::OK
}

// ── Verification ────────────────────────────────────────────────────

async fn verification_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match bearer(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.record(&user) {
        Some(record) => Json(json!({
            "verified": true,
            "status": "approved",
            "message": "User verified",
            "verification_date": record.verified_at.to_rfc3339(),
        }))
        .into_response(),
        None => Json(json!({
            "verified": false,
            "status": "not_started",
            "message": "Verification not started",
        }))
        .into_response(),
    }
}

/// A required or optional base64 image field. `Err` names the problem.
fn image_field<'a>(body: &'a Value, key: &str) -> Result<Option<&'a str>, String> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => {
            BASE64
                .decode(s)
                .map_err(|_| format!("{key} is not valid base64"))?;
            Ok(Some(s.as_str()))
        }
        Some(_) => Err(format!("{key} must be a base64 string")),
    }
}

async fn verify_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let user = match bearer(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let body: Value = match serde_json::from_slice(&body) {
        Ok(value @ Value::Object(_)) => value,
        _ => return error(StatusCode::BAD_REQUEST, "Request body is required"),
    };

    let images = (
        image_field(&body, "selfie_image"),
        image_field(&body, "rg_front_image"),
        image_field(&body, "rg_back_image"),
    );
    let back_provided = match images {
        (Ok(Some(_)), Ok(Some(_)), Ok(back)) => back.is_some(),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            return error(StatusCode::BAD_REQUEST, &e);
        }
        _ => {
            return error(
                StatusCode::BAD_REQUEST,
                "Selfie and document front are required",
            );
        }
    };

    if state.record(&user).is_some() {
        return error(StatusCode::BAD_REQUEST, "User already verified");
    }

    if state.decision() == Decision::Reject {
        tracing::info!(back_provided, "rejecting verification");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Verification rejected",
                "details": { "decision": "reject" },
            })),
        )
            .into_response();
    }

    let Some(record) = state.approve(&user, back_provided) else {
        return error(StatusCode::BAD_REQUEST, "User already verified");
    };
    tracing::info!(verification_id = %record.verification_id, back_provided, "verification approved");

    Json(json!({
        "success": true,
        "message": "Verification completed successfully",
        "verification_id": record.verification_id.to_string(),
        "user_verified": true,
    }))
    .into_response()
}

// ── Fallback ────────────────────────────────────────────────────────

async fn not_implemented() -> Response {
    error(StatusCode::NOT_IMPLEMENTED, "Not implemented in verification stub")
}
