//! Reflection document schema
//!
//! One High/Low/Buffalo entry, with its share targets and reaction state.

use std::collections::HashMap;

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::types::{PastureError, Result};

/// Collection name for reflections
pub const REFLECTION_COLLECTION: &str = "reflections";

/// Reaction type used when a request does not name one
pub const DEFAULT_REACTION_TYPE: &str = "curious";

const MAX_REACTION_TYPE_LEN: usize = 64;

/// Reflection document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ReflectionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Author; immutable after creation
    pub user_id: String,

    pub high: String,
    pub low: String,
    pub buffalo: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// User IDs this entry is shared with directly
    #[serde(default, rename = "sharedWith")]
    pub shared_with: Vec<String>,

    /// Herd IDs this entry is shared with
    #[serde(default, rename = "sharedHerds")]
    pub shared_herds: Vec<String>,

    /// Reaction type -> IDs of users who currently have it toggled on
    #[serde(default, rename = "curiosityReactions")]
    pub curiosity_reactions: HashMap<String, Vec<String>>,

    #[serde(default, rename = "isFlaggedForFollowUp")]
    pub is_flagged_for_follow_up: bool,

    /// Creation time; immutable
    pub timestamp: String,
}

impl ReflectionDoc {
    /// Hex string of the document ID. Empty until inserted.
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Whether the user authored this entry
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

impl IntoIndexes for ReflectionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Author lookups (own history, reminder counts)
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
            // Feed match arms
            (
                doc! { "sharedWith": 1 },
                Some(
                    IndexOptions::builder()
                        .name("shared_with_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "sharedHerds": 1 },
                Some(
                    IndexOptions::builder()
                        .name("shared_herds_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

/// Validate a client-supplied reaction type.
///
/// Reaction types become BSON field names under curiosityReactions, so they
/// must be non-empty, bounded, and free of field-path characters.
pub fn validate_reaction_type(reaction_type: &str) -> Result<()> {
    if reaction_type.is_empty() {
        return Err(PastureError::Malformed(
            "Reaction type must not be empty".into(),
        ));
    }
    if reaction_type.len() > MAX_REACTION_TYPE_LEN {
        return Err(PastureError::Malformed("Reaction type too long".into()));
    }
    if reaction_type.contains('.') || reaction_type.contains('$') {
        return Err(PastureError::Malformed(
            "Reaction type contains invalid characters".into(),
        ));
    }
    Ok(())
}

/// Update pipeline that toggles `user_id` within one reaction array.
///
/// The membership test and the flip happen inside a single document update,
/// so concurrent toggles for the same user land as strict alternation: never
/// a duplicate entry, never a lost removal.
pub fn reaction_toggle_pipeline(reaction_type: &str, user_id: &str) -> Vec<Document> {
    let field = format!("curiosityReactions.{}", reaction_type);
    let current = doc! { "$ifNull": [format!("${}", field), []] };

    vec![doc! {
        "$set": {
            field: {
                "$cond": {
                    "if": { "$in": [user_id, current.clone()] },
                    "then": { "$setDifference": [current.clone(), [user_id]] },
                    "else": { "$concatArrays": [current, [user_id]] },
                }
            }
        }
    }]
}

/// Update pipeline that flips the follow-up flag
pub fn flag_toggle_pipeline() -> Vec<Document> {
    vec![doc! {
        "$set": {
            "isFlaggedForFollowUp": {
                "$not": [{ "$ifNull": ["$isFlaggedForFollowUp", false] }]
            }
        }
    }]
}

/// Reflection shape returned to clients
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReflectionResponse {
    pub id: String,
    pub user_id: String,
    pub high: String,
    pub low: String,
    pub buffalo: String,
    pub image: Option<String>,
    #[serde(rename = "sharedWith")]
    pub shared_with: Vec<String>,
    #[serde(rename = "sharedHerds")]
    pub shared_herds: Vec<String>,
    #[serde(rename = "curiosityReactions")]
    pub curiosity_reactions: HashMap<String, Vec<String>>,
    #[serde(rename = "isFlaggedForFollowUp")]
    pub is_flagged_for_follow_up: bool,
    pub timestamp: String,
}

impl From<&ReflectionDoc> for ReflectionResponse {
    fn from(reflection: &ReflectionDoc) -> Self {
        Self {
            id: reflection.id_hex(),
            user_id: reflection.user_id.clone(),
            high: reflection.high.clone(),
            low: reflection.low.clone(),
            buffalo: reflection.buffalo.clone(),
            image: reflection.image.clone(),
            shared_with: reflection.shared_with.clone(),
            shared_herds: reflection.shared_herds.clone(),
            curiosity_reactions: reflection.curiosity_reactions.clone(),
            is_flagged_for_follow_up: reflection.is_flagged_for_follow_up,
            timestamp: reflection.timestamp.clone(),
        }
    }
}
