//! HTTP routes for authentication
//!
//! - POST /api/v1/auth/signup - Create an account
//! - POST /api/v1/auth/token  - Log in and get a JWT (OAuth2 password form)

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{UserDoc, UserResponse, UserSettings};
use crate::routes::helpers::{
    cors_preflight, error_response, json_response, parse_form_body, parse_json_body, BoxBody,
};
use crate::server::AppState;
use crate::types::{PastureError, Result};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub settings: Option<UserSettings>,
}

/// OAuth2 password-grant form fields, as login clients send them
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Dispatch /api/v1/auth/* requests. Returns None for other prefixes.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().trim_end_matches('/').to_string();

    if !path.starts_with("/api/v1/auth") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let result = match (req.method(), path.as_str()) {
        (&Method::POST, "/api/v1/auth/signup") => handle_signup(req, state).await,
        (&Method::POST, "/api/v1/auth/token") => handle_login(req, state).await,
        _ => Err(PastureError::NotFound("Auth endpoint not found".into())),
    };

    Some(result.unwrap_or_else(|err| error_response(&err)))
}

async fn handle_signup(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: SignupRequest = parse_json_body(req).await?;
    let email = body.email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') {
        return Err(PastureError::Malformed("Invalid email address".into()));
    }
    if body.password.is_empty() {
        return Err(PastureError::Malformed("Password must not be empty".into()));
    }

    if state.users.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(PastureError::InvalidOperation(
            "Email already registered".into(),
        ));
    }

    let password_hash = hash_password(&body.password)?;
    let mut user = UserDoc::new(email.clone(), password_hash, body.full_name);
    if let Some(settings) = body.settings {
        user.settings = settings;
    }

    // The unique email index closes the check-then-insert race: a concurrent
    // duplicate signup surfaces here as a duplicate-key error.
    let id = match state.users.insert_one(user).await {
        Ok(id) => id,
        Err(PastureError::Database(msg)) if msg.contains("E11000") => {
            return Err(PastureError::InvalidOperation(
                "Email already registered".into(),
            ));
        }
        Err(err) => return Err(err),
    };

    let created = state
        .users
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| PastureError::Internal("Created user not found".into()))?;

    info!("New user registered: {}", email);
    Ok(json_response(StatusCode::OK, &UserResponse::from(&created)))
}

async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let form: LoginForm = parse_form_body(req).await?;
    let email = form.username.trim().to_lowercase();

    let user = state
        .users
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| PastureError::Unauthenticated("Incorrect email or password".into()))?;

    if !verify_password(&form.password, &user.password_hash)? {
        return Err(PastureError::Unauthenticated(
            "Incorrect email or password".into(),
        ));
    }

    let token = state.jwt.generate_token(&user.email)?;

    info!("User logged in: {}", email);
    Ok(json_response(
        StatusCode::OK,
        &TokenResponse {
            access_token: token,
            token_type: "bearer",
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_form_parses_urlencoded() {
        let form: LoginForm =
            serde_urlencoded::from_str("username=Ann%40Example.com&password=hunter2").unwrap();
        assert_eq!(form.username, "Ann@Example.com");
        assert_eq!(form.password, "hunter2");
    }

    #[test]
    fn test_signup_request_optional_fields() {
        let body: SignupRequest = serde_json::from_value(serde_json::json!({
            "email": "ann@example.com",
            "password": "hunter2"
        }))
        .unwrap();
        assert!(body.full_name.is_none());
        assert!(body.settings.is_none());
    }

    #[test]
    fn test_token_response_shape() {
        let response = TokenResponse {
            access_token: "abc".into(),
            token_type: "bearer",
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["access_token"], "abc");
    }
}
