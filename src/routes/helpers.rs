//! Shared helpers for the HTTP route modules
//!
//! Response construction, CORS headers, body parsing, and the
//! Authorization-header-to-user resolution every protected endpoint uses.

use bson::doc;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::extract_token_from_header;
use crate::db::schemas::UserDoc;
use crate::server::AppState;
use crate::types::{PastureError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

const MAX_BODY_BYTES: usize = 65536;

/// Error body shape shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Render a PastureError as the JSON error shape with its mapped status.
///
/// Server-class failures are logged in full here; clients only ever see the
/// generic detail. Unauthenticated responses carry the challenge header.
pub fn error_response(err: &PastureError) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    let body = ErrorResponse {
        detail: err.detail().to_string(),
    };
    let json = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());

    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization");

    if status == StatusCode::UNAUTHORIZED {
        builder = builder.header("WWW-Authenticate", "Bearer");
    }

    builder.body(full_body(json)).unwrap()
}

pub fn no_content_response() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(empty_body())
        .unwrap()
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

async fn collect_body(req: Request<hyper::body::Incoming>) -> Result<Bytes> {
    let body = req
        .collect()
        .await
        .map_err(|e| PastureError::Malformed(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(PastureError::Malformed("Request body too large".into()));
    }

    Ok(bytes)
}

pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T> {
    let bytes = collect_body(req).await?;
    serde_json::from_slice(&bytes).map_err(PastureError::from)
}

/// Like [`parse_json_body`], but an absent body parses as the default.
/// The react endpoint accepts an empty POST and falls back to its
/// default reaction type.
pub async fn parse_json_body_or_default<T>(req: Request<hyper::body::Incoming>) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let bytes = collect_body(req).await?;
    if bytes.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(PastureError::from)
}

/// Parse an application/x-www-form-urlencoded body (the login form)
pub async fn parse_form_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T> {
    let bytes = collect_body(req).await?;
    serde_urlencoded::from_bytes(&bytes)
        .map_err(|e| PastureError::Malformed(format!("Invalid form body: {}", e)))
}

pub fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Resolve the Authorization header to an active user document.
///
/// Missing header, bad token, and unknown subject each map to the 401
/// message clients expect; an inactive account is a 400.
pub async fn require_user(auth_header: Option<&str>, state: &AppState) -> Result<UserDoc> {
    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| PastureError::Unauthenticated("Not authenticated".into()))?;

    let result = state.jwt.verify_token(token);
    let claims = match result.claims {
        Some(claims) if result.valid => claims,
        _ => {
            return Err(PastureError::Unauthenticated(
                "Could not validate credentials".into(),
            ))
        }
    };

    let user = state
        .users
        .find_one(doc! { "email": &claims.sub })
        .await?
        .ok_or_else(|| PastureError::Unauthenticated("Could not validate credentials".into()))?;

    if !user.is_active {
        return Err(PastureError::InvalidOperation("Inactive user".into()));
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(response: Response<BoxBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_detail_body() {
        let err = PastureError::NotFound("Herd not found".into());
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_string(response).await;
        assert_eq!(body, r#"{"detail":"Herd not found"}"#);
    }

    #[tokio::test]
    async fn test_error_response_masks_server_failures() {
        let err = PastureError::Database("pool exhausted".into());
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_string(response).await;
        assert!(body.contains("Internal server error"));
        assert!(!body.contains("pool exhausted"));
    }

    #[test]
    fn test_unauthorized_carries_challenge_header() {
        let err = PastureError::Unauthenticated("Not authenticated".into());
        let response = error_response(&err);
        let challenge = response
            .headers()
            .get("WWW-Authenticate")
            .and_then(|v| v.to_str().ok());
        assert_eq!(challenge, Some("Bearer"));

        let err = PastureError::NotFound("x".into());
        let response = error_response(&err);
        assert!(response.headers().get("WWW-Authenticate").is_none());
    }

    #[test]
    fn test_json_response_sets_cors_headers() {
        let response = json_response(StatusCode::OK, &serde_json::json!({ "ok": true }));
        assert_eq!(response.status(), StatusCode::OK);

        let origin = response
            .headers()
            .get("Access-Control-Allow-Origin")
            .and_then(|v| v.to_str().ok());
        assert_eq!(origin, Some("*"));

        let methods = response
            .headers()
            .get("Access-Control-Allow-Methods")
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_no_content_response_is_empty() {
        let response = no_content_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_string(response).await.is_empty());
    }

    #[test]
    fn test_cors_preflight_shape() {
        let response = cors_preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get("Access-Control-Max-Age").is_some());
    }
}
