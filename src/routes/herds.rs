//! HTTP routes for herds and their membership rosters
//!
//! - POST   /api/v1/herds                        - Create a herd
//! - GET    /api/v1/herds                        - List herds the user belongs to
//! - GET    /api/v1/herds/{id}                   - Get one herd (members only)
//! - PUT    /api/v1/herds/{id}                   - Update name/description (owner)
//! - DELETE /api/v1/herds/{id}                   - Delete the herd (owner)
//! - POST   /api/v1/herds/{id}/members           - Add a member by email (owner)
//! - DELETE /api/v1/herds/{id}/members/{user_id} - Remove a member (owner or self)

use bson::{doc, oid::ObjectId, Document};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::{check_herd_member, check_herd_owner, check_member_removal, OwnerAction};
use crate::db::schemas::{now_iso, HerdDoc, HerdMember, HerdResponse, HerdRole};
use crate::routes::helpers::{
    cors_preflight, error_response, get_auth_header, json_response, no_content_response,
    parse_json_body, require_user, BoxBody,
};
use crate::server::AppState;
use crate::types::{PastureError, Result};

/// Herd list responses carry at most this many herds
const HERD_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HerdCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HerdUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberAddRequest {
    pub email: String,
}

/// Parsed /api/v1/herds route
#[derive(Debug, PartialEq)]
enum HerdRoute<'a> {
    Collection,
    Herd(&'a str),
    Members(&'a str),
    Member { herd_id: &'a str, user_id: &'a str },
}

impl<'a> HerdRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix("/api/v1/herds")?;
        if rest.is_empty() {
            return Some(Self::Collection);
        }

        let rest = rest.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [id] if !id.is_empty() => Some(Self::Herd(id)),
            [id, "members"] if !id.is_empty() => Some(Self::Members(id)),
            [id, "members", user_id] if !id.is_empty() && !user_id.is_empty() => {
                Some(Self::Member {
                    herd_id: id,
                    user_id,
                })
            }
            _ => None,
        }
    }
}

/// Dispatch /api/v1/herds/* requests. Returns None for other prefixes.
pub async fn handle_herds_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().trim_end_matches('/').to_string();

    if !path.starts_with("/api/v1/herds") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let result = match (req.method(), HerdRoute::parse(&path)) {
        (&Method::POST, Some(HerdRoute::Collection)) => handle_create(req, state).await,
        (&Method::GET, Some(HerdRoute::Collection)) => handle_list(req, state).await,
        (&Method::GET, Some(HerdRoute::Herd(id))) => {
            let id = id.to_string();
            handle_get(req, state, &id).await
        }
        (&Method::PUT, Some(HerdRoute::Herd(id))) => {
            let id = id.to_string();
            handle_update(req, state, &id).await
        }
        (&Method::DELETE, Some(HerdRoute::Herd(id))) => {
            let id = id.to_string();
            handle_delete(req, state, &id).await
        }
        (&Method::POST, Some(HerdRoute::Members(id))) => {
            let id = id.to_string();
            handle_add_member(req, state, &id).await
        }
        (&Method::DELETE, Some(HerdRoute::Member { herd_id, user_id })) => {
            let herd_id = herd_id.to_string();
            let user_id = user_id.to_string();
            handle_remove_member(req, state, &herd_id, &user_id).await
        }
        _ => Err(PastureError::NotFound("Herd endpoint not found".into())),
    };

    Some(result.unwrap_or_else(|err| error_response(&err)))
}

/// Parse a herd ID and load its document, or fail with the mandated statuses
async fn load_herd(state: &AppState, id: &str) -> Result<(ObjectId, HerdDoc)> {
    let oid = ObjectId::parse_str(id)?;
    let herd = state
        .herds
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| PastureError::NotFound("Herd not found".into()))?;
    Ok((oid, herd))
}

async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let body: HerdCreate = parse_json_body(req).await?;

    if body.name.trim().is_empty() {
        return Err(PastureError::Malformed("Herd name must not be empty".into()));
    }

    let herd = HerdDoc::new(
        body.name,
        body.description,
        user.id_hex(),
        user.email.clone(),
    );

    let id = state.herds.insert_one(herd).await?;
    let created = state
        .herds
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| PastureError::Internal("Created herd not found".into()))?;

    info!("{} created herd '{}' ({})", user.email, created.name, id);
    Ok(json_response(
        StatusCode::CREATED,
        &HerdResponse::from(&created),
    ))
}

async fn handle_list(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;

    let herds = state
        .herds
        .find_many_with_limit(doc! { "members.user_id": user.id_hex() }, HERD_LIST_LIMIT)
        .await?;

    let list: Vec<HerdResponse> = herds.iter().map(HerdResponse::from).collect();
    Ok(json_response(StatusCode::OK, &list))
}

async fn handle_get(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let (_, herd) = load_herd(&state, id).await?;

    check_herd_member(&herd, &user.id_hex())?;

    Ok(json_response(StatusCode::OK, &HerdResponse::from(&herd)))
}

async fn handle_update(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let body: HerdUpdate = parse_json_body(req).await?;
    let (oid, herd) = load_herd(&state, id).await?;

    check_herd_owner(&herd, &user.id_hex(), OwnerAction::Update)?;

    let mut set = Document::new();
    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(PastureError::Malformed("Herd name must not be empty".into()));
        }
        set.insert("name", name);
    }
    if let Some(description) = body.description {
        set.insert("description", description);
    }

    if set.is_empty() {
        return Ok(json_response(StatusCode::OK, &HerdResponse::from(&herd)));
    }
    set.insert("updated_at", now_iso());

    let updated = state
        .herds
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .await?
        .ok_or_else(|| PastureError::NotFound("Herd not found".into()))?;

    Ok(json_response(StatusCode::OK, &HerdResponse::from(&updated)))
}

async fn handle_delete(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let (oid, herd) = load_herd(&state, id).await?;

    check_herd_owner(&herd, &user.id_hex(), OwnerAction::Delete)?;

    // No cascade: reflections sharing this herd ID just lose the channel
    state.herds.delete_one(doc! { "_id": oid }).await?;

    info!("{} deleted herd '{}' ({})", user.email, herd.name, id);
    Ok(no_content_response())
}

async fn handle_add_member(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let body: MemberAddRequest = parse_json_body(req).await?;
    let (oid, herd) = load_herd(&state, id).await?;

    check_herd_owner(&herd, &user.id_hex(), OwnerAction::AddMember)?;

    let email = body.email.trim().to_lowercase();
    let target = state
        .users
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| PastureError::NotFound("User with this email not found".into()))?;

    let target_id = target.id_hex();
    if herd.has_member(&target_id) {
        return Err(PastureError::InvalidOperation(
            "User is already a member of this herd".into(),
        ));
    }

    let member = HerdMember::joining_now(target_id.clone(), target.email.clone(), HerdRole::Member);

    // The $ne guard makes the append conditional on the member still being
    // absent, so a racing duplicate request cannot double-append.
    let result = state
        .herds
        .update_one(
            doc! { "_id": oid, "members.user_id": { "$ne": &target_id } },
            doc! {
                "$push": { "members": bson::to_bson(&member)? },
                "$set": { "updated_at": now_iso() },
            },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(PastureError::InvalidOperation(
            "User is already a member of this herd".into(),
        ));
    }

    let updated = state
        .herds
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| PastureError::NotFound("Herd not found".into()))?;

    info!("{} added {} to herd '{}'", user.email, email, updated.name);
    Ok(json_response(StatusCode::OK, &HerdResponse::from(&updated)))
}

async fn handle_remove_member(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    herd_id: &str,
    target_id: &str,
) -> Result<Response<BoxBody>> {
    let user = require_user(get_auth_header(&req), &state).await?;
    let (oid, herd) = load_herd(&state, herd_id).await?;

    check_member_removal(&herd, &user.id_hex(), target_id)?;

    state
        .herds
        .update_one(
            doc! { "_id": oid },
            doc! {
                "$pull": { "members": { "user_id": target_id } },
                "$set": { "updated_at": now_iso() },
            },
        )
        .await?;

    let updated = state
        .herds
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| PastureError::NotFound("Herd not found".into()))?;

    info!(
        "{} removed {} from herd '{}'",
        user.email, target_id, updated.name
    );
    Ok(json_response(StatusCode::OK, &HerdResponse::from(&updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        assert_eq!(
            HerdRoute::parse("/api/v1/herds"),
            Some(HerdRoute::Collection)
        );
        assert_eq!(
            HerdRoute::parse("/api/v1/herds/abc123"),
            Some(HerdRoute::Herd("abc123"))
        );
        assert_eq!(
            HerdRoute::parse("/api/v1/herds/abc123/members"),
            Some(HerdRoute::Members("abc123"))
        );
        assert_eq!(
            HerdRoute::parse("/api/v1/herds/abc123/members/u1"),
            Some(HerdRoute::Member {
                herd_id: "abc123",
                user_id: "u1"
            })
        );

        assert_eq!(HerdRoute::parse("/api/v1/herds/abc123/other"), None);
        assert_eq!(HerdRoute::parse("/api/v1/herds/a/members/u1/x"), None);
        assert_eq!(HerdRoute::parse("/api/v1/users/me"), None);
    }

    #[test]
    fn test_update_body_allows_partial_fields() {
        let update: HerdUpdate =
            serde_json::from_value(serde_json::json!({ "name": "Evening Crew" })).unwrap();
        assert_eq!(update.name.as_deref(), Some("Evening Crew"));
        assert!(update.description.is_none());
    }
}
