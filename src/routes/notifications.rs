//! HTTP route for the reflection reminder check
//!
//! - GET /api/v1/notifications/status - Is the user due for a reminder?

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::schemas::to_iso;
use crate::routes::helpers::{
    cors_preflight, error_response, get_auth_header, json_response, require_user, BoxBody,
};
use crate::server::AppState;
use crate::services::{evaluate_reminder, window_start};
use crate::types::{PastureError, Result};

/// Dispatch /api/v1/notifications/* requests. Returns None for other prefixes.
pub async fn handle_notifications_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().trim_end_matches('/').to_string();

    if !path.starts_with("/api/v1/notifications") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let result = match (req.method(), path.as_str()) {
        (&Method::GET, "/api/v1/notifications/status") => handle_status(req, state).await,
        _ => Err(PastureError::NotFound(
            "Notification endpoint not found".into(),
        )),
    };

    Some(result.unwrap_or_else(|err| error_response(&err)))
}

async fn handle_status(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let cadence = user.settings.notification_cadence;

    // Paused needs no store query; the window is None
    let count = match window_start(cadence, chrono::Utc::now()) {
        Some(start) => {
            state
                .reflections
                .count_documents(doc! {
                    "user_id": user.id_hex(),
                    "timestamp": { "$gte": to_iso(start) },
                })
                .await?
        }
        None => 0,
    };

    let status = evaluate_reminder(cadence, count);
    Ok(json_response(StatusCode::OK, &status))
}
