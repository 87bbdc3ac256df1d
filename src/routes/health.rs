//! Health and utility endpoints
//!
//! - GET /          - Root banner clients probe for
//! - GET /health    - Liveness probe (also /healthz)
//! - GET /version   - Build stamp for deployment verification

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::db::schemas::now_iso;
use crate::routes::helpers::{json_response, BoxBody};

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct VersionResponse {
    version: &'static str,
    commit: &'static str,
    commit_full: &'static str,
    build_time: &'static str,
    service: &'static str,
}

/// Root banner; the frontend uses this as a backend-is-up probe
pub fn root_banner() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &RootResponse {
            message: "Backend is running",
        },
    )
}

/// Liveness probe - 200 whenever the process is serving
pub fn health_check() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: now_iso(),
        },
    )
}

/// Version info captured at build time
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            service: "pasture",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_root_banner_message() {
        let response = root_banner();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "Backend is running");
    }

    #[test]
    fn test_health_check_is_ok() {
        let response = health_check();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_version_info_is_ok() {
        let response = version_info();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
