//! HTTP routes for reflections
//!
//! - POST   /api/v1/reflections            - Record a new entry
//! - GET    /api/v1/reflections            - List the user's own entries
//! - GET    /api/v1/reflections/feed       - Entries shared with the user
//! - POST   /api/v1/reflections/{id}/react - Toggle a reaction
//! - POST   /api/v1/reflections/{id}/flag  - Toggle the follow-up flag (owner)
//! - PUT    /api/v1/reflections/{id}       - Update an entry (owner)
//! - DELETE /api/v1/reflections/{id}       - Delete an entry (owner)

use std::collections::HashMap;
use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use tracing::info;

use crate::auth::{check_reflection_owner, check_view_reflection};
use crate::db::schemas::{
    flag_toggle_pipeline, now_iso, reaction_toggle_pipeline, validate_reaction_type,
    ReflectionDoc, ReflectionResponse, DEFAULT_REACTION_TYPE,
};
use crate::routes::helpers::{
    cors_preflight, error_response, get_auth_header, json_response, no_content_response,
    parse_json_body, parse_json_body_or_default, require_user, BoxBody,
};
use crate::server::AppState;
use crate::types::{PastureError, Result};

/// Own-history responses carry at most this many entries
const OWN_LIST_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct ReflectionCreate {
    pub high: String,
    pub low: String,
    pub buffalo: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "sharedWith")]
    pub shared_with: Vec<String>,
    #[serde(default, rename = "sharedHerds")]
    pub shared_herds: Vec<String>,
    #[serde(default, rename = "curiosityReactions")]
    pub curiosity_reactions: HashMap<String, Vec<String>>,
    #[serde(default, rename = "isFlaggedForFollowUp")]
    pub is_flagged_for_follow_up: bool,
}

/// Update body; only provided fields are written
#[derive(Debug, Deserialize, Default)]
pub struct ReflectionUpdate {
    pub high: Option<String>,
    pub low: Option<String>,
    pub buffalo: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "sharedWith")]
    pub shared_with: Option<Vec<String>>,
    #[serde(rename = "sharedHerds")]
    pub shared_herds: Option<Vec<String>>,
    #[serde(rename = "curiosityReactions")]
    pub curiosity_reactions: Option<HashMap<String, Vec<String>>>,
    #[serde(rename = "isFlaggedForFollowUp")]
    pub is_flagged_for_follow_up: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "type", default = "default_reaction_type")]
    pub reaction_type: String,
}

impl Default for ReactionRequest {
    fn default() -> Self {
        Self {
            reaction_type: default_reaction_type(),
        }
    }
}

fn default_reaction_type() -> String {
    DEFAULT_REACTION_TYPE.to_string()
}

/// Parsed /api/v1/reflections route
#[derive(Debug, PartialEq)]
enum ReflectionRoute<'a> {
    Collection,
    Feed,
    Reflection(&'a str),
    React(&'a str),
    Flag(&'a str),
}

impl<'a> ReflectionRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api/v1/reflections")?;
        if rest.is_empty() {
            return Some(Self::Collection);
        }

        let rest = rest.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            ["feed"] => Some(Self::Feed),
            [id] if !id.is_empty() => Some(Self::Reflection(id)),
            [id, "react"] if !id.is_empty() => Some(Self::React(id)),
            [id, "flag"] if !id.is_empty() => Some(Self::Flag(id)),
            _ => None,
        }
    }
}

/// Dispatch /api/v1/reflections/* requests. Returns None for other prefixes.
pub async fn handle_reflections_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().trim_end_matches('/').to_string();

    if !path.starts_with("/api/v1/reflections") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let result = match (req.method(), ReflectionRoute::parse(&path)) {
        (&Method::POST, Some(ReflectionRoute::Collection)) => handle_create(req, state).await,
        (&Method::GET, Some(ReflectionRoute::Collection)) => handle_list_own(req, state).await,
        (&Method::GET, Some(ReflectionRoute::Feed)) => handle_feed(req, state).await,
        (&Method::POST, Some(ReflectionRoute::React(id))) => {
            let id = id.to_string();
            handle_react(req, state, &id).await
        }
        (&Method::POST, Some(ReflectionRoute::Flag(id))) => {
            let id = id.to_string();
            handle_flag(req, state, &id).await
        }
        (&Method::PUT, Some(ReflectionRoute::Reflection(id))) => {
            let id = id.to_string();
            handle_update(req, state, &id).await
        }
        (&Method::DELETE, Some(ReflectionRoute::Reflection(id))) => {
            let id = id.to_string();
            handle_delete(req, state, &id).await
        }
        _ => Err(PastureError::NotFound(
            "Reflection endpoint not found".into(),
        )),
    };

    Some(result.unwrap_or_else(|err| error_response(&err)))
}

async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let body: ReflectionCreate = parse_json_body(req).await?;

    for reaction_type in body.curiosity_reactions.keys() {
        validate_reaction_type(reaction_type)?;
    }

    let reflection = ReflectionDoc {
        _id: None,
        user_id: user.id_hex(),
        high: body.high,
        low: body.low,
        buffalo: body.buffalo,
        image: body.image,
        shared_with: body.shared_with,
        shared_herds: body.shared_herds,
        curiosity_reactions: body.curiosity_reactions,
        is_flagged_for_follow_up: body.is_flagged_for_follow_up,
        timestamp: now_iso(),
    };

    let id = state.reflections.insert_one(reflection).await?;
    let created = state
        .reflections
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| PastureError::Internal("Created reflection not found".into()))?;

    info!("{} recorded reflection {}", user.email, id);
    Ok(json_response(
        StatusCode::CREATED,
        &ReflectionResponse::from(&created),
    ))
}

async fn handle_list_own(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;

    let reflections = state
        .reflections
        .find_many_with_limit(doc! { "user_id": user.id_hex() }, OWN_LIST_LIMIT)
        .await?;

    let list: Vec<ReflectionResponse> = reflections.iter().map(ReflectionResponse::from).collect();
    Ok(json_response(StatusCode::OK, &list))
}

async fn handle_feed(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let feed = state.feed.feed_for(&user.id_hex()).await?;
    Ok(json_response(StatusCode::OK, &feed))
}

async fn handle_react(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let body: ReactionRequest = parse_json_body_or_default(req).await?;
    validate_reaction_type(&body.reaction_type)?;

    let oid = ObjectId::parse_str(id)?;
    let reflection = state
        .reflections
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| PastureError::NotFound("Reflection not found".into()))?;

    let user_id = user.id_hex();
    let herd_ids = state.feed.member_herd_ids(&user_id).await?;
    check_view_reflection(&reflection, &user_id, &herd_ids)?;

    // The pipeline decides add-vs-remove inside the store, so the toggle is
    // atomic regardless of concurrent requests.
    let updated = state
        .reflections
        .find_one_and_update(
            doc! { "_id": oid },
            reaction_toggle_pipeline(&body.reaction_type, &user_id),
        )
        .await?
        .ok_or_else(|| PastureError::NotFound("Reflection not found".into()))?;

    Ok(json_response(
        StatusCode::OK,
        &ReflectionResponse::from(&updated),
    ))
}

async fn handle_flag(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;

    let oid = ObjectId::parse_str(id)?;
    let reflection = state
        .reflections
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| PastureError::NotFound("Reflection not found".into()))?;

    check_reflection_owner(&reflection, &user.id_hex())?;

    let updated = state
        .reflections
        .find_one_and_update(doc! { "_id": oid }, flag_toggle_pipeline())
        .await?
        .ok_or_else(|| PastureError::NotFound("Reflection not found".into()))?;

    Ok(json_response(
        StatusCode::OK,
        &ReflectionResponse::from(&updated),
    ))
}

async fn handle_update(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let body: ReflectionUpdate = parse_json_body(req).await?;

    let oid = ObjectId::parse_str(id)?;

    // Owner-scoped lookup: a non-owner gets the same 404 as a missing entry
    let current = state
        .reflections
        .find_one(doc! { "_id": oid, "user_id": user.id_hex() })
        .await?
        .ok_or_else(|| PastureError::NotFound("Reflection not found".into()))?;

    let mut set = Document::new();
    if let Some(high) = body.high {
        set.insert("high", high);
    }
    if let Some(low) = body.low {
        set.insert("low", low);
    }
    if let Some(buffalo) = body.buffalo {
        set.insert("buffalo", buffalo);
    }
    if let Some(image) = body.image {
        set.insert("image", image);
    }
    if let Some(shared_with) = body.shared_with {
        set.insert("sharedWith", shared_with);
    }
    if let Some(shared_herds) = body.shared_herds {
        set.insert("sharedHerds", shared_herds);
    }
    if let Some(reactions) = body.curiosity_reactions {
        for reaction_type in reactions.keys() {
            validate_reaction_type(reaction_type)?;
        }
        set.insert("curiosityReactions", bson::to_bson(&reactions)?);
    }
    if let Some(flagged) = body.is_flagged_for_follow_up {
        set.insert("isFlaggedForFollowUp", flagged);
    }

    if set.is_empty() {
        return Ok(json_response(
            StatusCode::OK,
            &ReflectionResponse::from(&current),
        ));
    }

    let updated = state
        .reflections
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .await?
        .ok_or_else(|| PastureError::NotFound("Reflection not found".into()))?;

    Ok(json_response(
        StatusCode::OK,
        &ReflectionResponse::from(&updated),
    ))
}

async fn handle_delete(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;

    let oid = ObjectId::parse_str(id)?;
    state
        .reflections
        .find_one(doc! { "_id": oid, "user_id": user.id_hex() })
        .await?
        .ok_or_else(|| PastureError::NotFound("Reflection not found".into()))?;

    state.reflections.delete_one(doc! { "_id": oid }).await?;

    info!("{} deleted reflection {}", user.email, id);
    Ok(no_content_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        assert_eq!(
            ReflectionRoute::parse("/api/v1/reflections"),
            Some(ReflectionRoute::Collection)
        );
        assert_eq!(
            ReflectionRoute::parse("/api/v1/reflections/feed"),
            Some(ReflectionRoute::Feed)
        );
        assert_eq!(
            ReflectionRoute::parse("/api/v1/reflections/abc123"),
            Some(ReflectionRoute::Reflection("abc123"))
        );
        assert_eq!(
            ReflectionRoute::parse("/api/v1/reflections/abc123/react"),
            Some(ReflectionRoute::React("abc123"))
        );
        assert_eq!(
            ReflectionRoute::parse("/api/v1/reflections/abc123/flag"),
            Some(ReflectionRoute::Flag("abc123"))
        );

        assert_eq!(ReflectionRoute::parse("/api/v1/reflections/a/b"), None);
        assert_eq!(ReflectionRoute::parse("/api/v1/herds"), None);
    }

    #[test]
    fn test_reaction_request_defaults_to_curious() {
        let body = ReactionRequest::default();
        assert_eq!(body.reaction_type, "curious");

        let parsed: ReactionRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(parsed.reaction_type, "curious");

        let parsed: ReactionRequest =
            serde_json::from_value(serde_json::json!({ "type": "mind_blown" })).unwrap();
        assert_eq!(parsed.reaction_type, "mind_blown");
    }

    #[test]
    fn test_create_body_defaults() {
        let body: ReflectionCreate = serde_json::from_value(serde_json::json!({
            "high": "h", "low": "l", "buffalo": "b"
        }))
        .unwrap();
        assert!(body.shared_with.is_empty());
        assert!(body.shared_herds.is_empty());
        assert!(body.curiosity_reactions.is_empty());
        assert!(!body.is_flagged_for_follow_up);
        assert!(body.image.is_none());
    }

    #[test]
    fn test_update_body_partial_fields() {
        let update: ReflectionUpdate = serde_json::from_value(serde_json::json!({
            "sharedHerds": ["h1"]
        }))
        .unwrap();
        assert_eq!(update.shared_herds, Some(vec!["h1".to_string()]));
        assert!(update.high.is_none());
        assert!(update.is_flagged_for_follow_up.is_none());
    }
}
