//! Herd document schema
//!
//! A herd is a sharing group: an owner plus a list of member snapshots.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MongoCollection};
use crate::db::schemas::now_iso;
use crate::types::PastureError;

/// Collection name for herds
pub const HERD_COLLECTION: &str = "herds";

/// Role of a member within a herd
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HerdRole {
    Owner,
    #[default]
    Member,
}

/// Membership snapshot embedded in a herd document
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HerdMember {
    pub user_id: String,

    /// Email at join time; not refreshed if the user later changes it
    pub email: String,

    pub joined_at: String,

    #[serde(default)]
    pub role: HerdRole,
}

impl HerdMember {
    /// Snapshot a user joining now with the given role
    pub fn joining_now(user_id: String, email: String, role: HerdRole) -> Self {
        Self {
            user_id,
            email,
            joined_at: now_iso(),
            role,
        }
    }
}

/// Herd document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HerdDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Immutable after creation
    pub owner_id: String,

    #[serde(default)]
    pub members: Vec<HerdMember>,

    pub created_at: String,
    pub updated_at: String,
}

impl HerdDoc {
    /// Create a herd with the owner as its first member
    pub fn new(
        name: String,
        description: Option<String>,
        owner_id: String,
        owner_email: String,
    ) -> Self {
        let now = now_iso();
        let owner = HerdMember {
            user_id: owner_id.clone(),
            email: owner_email,
            joined_at: now.clone(),
            role: HerdRole::Owner,
        };

        Self {
            _id: None,
            name,
            description,
            owner_id,
            members: vec![owner],
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Hex string of the document ID. Empty until inserted.
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Whether the user appears in the member list
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// Whether the user owns this herd
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

impl IntoIndexes for HerdDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Multikey index for membership lookups
            (
                doc! { "members.user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("members_user_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

/// IDs of every herd the user currently belongs to.
///
/// This is the live membership query. The settings.herds cache on the user
/// document is never consulted here.
pub async fn herd_ids_for_member(
    herds: &MongoCollection<HerdDoc>,
    user_id: &str,
) -> Result<Vec<String>, PastureError> {
    let member_of = herds.find_many(doc! { "members.user_id": user_id }).await?;
    Ok(member_of.iter().map(|h| h.id_hex()).collect())
}

/// Herd shape returned to clients
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HerdResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub members: Vec<HerdMember>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&HerdDoc> for HerdResponse {
    fn from(herd: &HerdDoc) -> Self {
        Self {
            id: herd.id_hex(),
            name: herd.name.clone(),
            description: herd.description.clone(),
            owner_id: herd.owner_id.clone(),
            members: herd.members.clone(),
            created_at: herd.created_at.clone(),
            updated_at: herd.updated_at.clone(),
        }
    }
}
