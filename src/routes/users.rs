//! HTTP routes for the current user and their friend list
//!
//! - GET    /api/v1/users/me              - Current user
//! - PUT    /api/v1/users/me/settings     - Update settings
//! - POST   /api/v1/users/friends         - Add a friend by email
//! - GET    /api/v1/users/friends         - List friends
//! - DELETE /api/v1/users/friends/{id}    - Remove a friend

use bson::{doc, oid::ObjectId, Document};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::schemas::{NotificationCadence, PublicUser, UserResponse};
use crate::routes::helpers::{
    cors_preflight, error_response, get_auth_header, json_response, no_content_response,
    parse_json_body, require_user, BoxBody,
};
use crate::server::AppState;
use crate::types::{PastureError, Result};

/// Settings update body. Only provided fields change; the friend list is
/// normally managed through the friend endpoints but may be overwritten
/// explicitly.
#[derive(Debug, Deserialize, Default)]
pub struct SettingsUpdate {
    #[serde(rename = "notificationCadence")]
    pub notification_cadence: Option<NotificationCadence>,
    pub herds: Option<Vec<String>>,
    pub friends: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct FriendAddRequest {
    pub email: String,
}

/// Parsed /api/v1/users route
#[derive(Debug, PartialEq)]
enum UserRoute<'a> {
    Me,
    MeSettings,
    Friends,
    Friend(&'a str),
}

impl<'a> UserRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api/v1/users")?;
        match rest {
            "/me" => Some(Self::Me),
            "/me/settings" => Some(Self::MeSettings),
            "/friends" => Some(Self::Friends),
            _ => {
                let id = rest.strip_prefix("/friends/")?;
                if id.is_empty() || id.contains('/') {
                    None
                } else {
                    Some(Self::Friend(id))
                }
            }
        }
    }
}

/// Dispatch /api/v1/users/* requests. Returns None for other prefixes.
pub async fn handle_users_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().trim_end_matches('/').to_string();

    if !path.starts_with("/api/v1/users") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let route = UserRoute::parse(&path);
    let result = match (req.method(), route) {
        (&Method::GET, Some(UserRoute::Me)) => handle_me(req, state).await,
        (&Method::PUT, Some(UserRoute::MeSettings)) => handle_update_settings(req, state).await,
        (&Method::POST, Some(UserRoute::Friends)) => handle_add_friend(req, state).await,
        (&Method::GET, Some(UserRoute::Friends)) => handle_list_friends(req, state).await,
        (&Method::DELETE, Some(UserRoute::Friend(id))) => {
            let id = id.to_string();
            handle_remove_friend(req, state, &id).await
        }
        _ => Err(PastureError::NotFound("User endpoint not found".into())),
    };

    Some(result.unwrap_or_else(|err| error_response(&err)))
}

async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    Ok(json_response(StatusCode::OK, &UserResponse::from(&user)))
}

async fn handle_update_settings(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let update: SettingsUpdate = parse_json_body(req).await?;

    let mut set = Document::new();
    if let Some(cadence) = update.notification_cadence {
        set.insert("settings.notificationCadence", bson::to_bson(&cadence)?);
    }
    if let Some(herds) = update.herds {
        set.insert("settings.herds", herds);
    }
    if let Some(friends) = update.friends {
        set.insert("settings.friends", friends);
    }

    if set.is_empty() {
        return Ok(json_response(StatusCode::OK, &UserResponse::from(&user)));
    }

    let updated = state
        .users
        .find_one_and_update(doc! { "_id": user._id }, doc! { "$set": set })
        .await?
        .ok_or_else(|| PastureError::NotFound("User not found".into()))?;

    Ok(json_response(StatusCode::OK, &UserResponse::from(&updated)))
}

async fn handle_add_friend(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let body: FriendAddRequest = parse_json_body(req).await?;
    let email = body.email.trim().to_lowercase();

    let friend = state
        .users
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| PastureError::NotFound("User with this email not found".into()))?;

    let friend_id = friend.id_hex();
    if friend_id == user.id_hex() {
        return Err(PastureError::InvalidOperation(
            "You cannot add yourself as a friend".into(),
        ));
    }

    // $addToSet keeps the friend list a set: duplicate requests are no-ops
    state
        .users
        .update_one(
            doc! { "_id": user._id },
            doc! { "$addToSet": { "settings.friends": &friend_id } },
        )
        .await?;

    info!("{} added friend {}", user.email, friend.email);
    Ok(json_response(StatusCode::OK, &PublicUser::from(&friend)))
}

async fn handle_list_friends(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;

    // IDs that fail to parse or resolve are skipped rather than failing the
    // list. This is the one tolerated drift in the system.
    let friend_ids: Vec<ObjectId> = user
        .settings
        .friends
        .iter()
        .filter_map(|id| ObjectId::parse_str(id).ok())
        .collect();

    if friend_ids.len() < user.settings.friends.len() {
        debug!(
            "Skipping {} unparseable friend ID(s) for {}",
            user.settings.friends.len() - friend_ids.len(),
            user.email
        );
    }

    let friends = if friend_ids.is_empty() {
        Vec::new()
    } else {
        state
            .users
            .find_many(doc! { "_id": { "$in": friend_ids } })
            .await?
    };

    let list: Vec<PublicUser> = friends.iter().map(PublicUser::from).collect();
    Ok(json_response(StatusCode::OK, &list))
}

async fn handle_remove_friend(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    friend_id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;

    // Matching on the friend entry in the filter makes the pull conditional:
    // a missing entry reports as matched_count 0 instead of a silent no-op.
    let result = state
        .users
        .update_one(
            doc! { "_id": user._id, "settings.friends": friend_id },
            doc! { "$pull": { "settings.friends": friend_id } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(PastureError::NotFound("Friend not found".into()));
    }

    info!("{} removed friend {}", user.email, friend_id);
    Ok(no_content_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        assert_eq!(UserRoute::parse("/api/v1/users/me"), Some(UserRoute::Me));
        assert_eq!(
            UserRoute::parse("/api/v1/users/me/settings"),
            Some(UserRoute::MeSettings)
        );
        assert_eq!(
            UserRoute::parse("/api/v1/users/friends"),
            Some(UserRoute::Friends)
        );
        assert_eq!(
            UserRoute::parse("/api/v1/users/friends/abc123"),
            Some(UserRoute::Friend("abc123"))
        );

        assert_eq!(UserRoute::parse("/api/v1/users"), None);
        assert_eq!(UserRoute::parse("/api/v1/users/friends/a/b"), None);
        assert_eq!(UserRoute::parse("/api/v1/herds"), None);
    }

    #[test]
    fn test_settings_update_partial_body() {
        let update: SettingsUpdate = serde_json::from_value(serde_json::json!({
            "notificationCadence": "weekly"
        }))
        .unwrap();
        assert_eq!(
            update.notification_cadence,
            Some(NotificationCadence::Weekly)
        );
        assert!(update.herds.is_none());
        assert!(update.friends.is_none());
    }
}
