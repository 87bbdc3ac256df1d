//! Feed aggregation
//!
//! Builds the shared-with-me view: reflections shared directly with the
//! user plus reflections shared with any herd the user currently belongs
//! to. Herd membership is resolved live for every request.

use std::collections::{HashMap, HashSet};

use bson::{doc, oid::ObjectId, Document};
use serde::Serialize;
use tracing::debug;

use crate::db::mongo::MongoCollection;
use crate::db::schemas::{
    herd_ids_for_member, HerdDoc, ReflectionDoc, ReflectionResponse, UserDoc,
};
use crate::types::{PastureError, Result};

/// Most reflections a single feed response will carry
pub const FEED_LIMIT: i64 = 100;

/// One feed entry: a reflection plus its author's display name
#[derive(Serialize, Clone, Debug)]
pub struct FeedItem {
    #[serde(flatten)]
    pub reflection: ReflectionResponse,
    pub author_name: String,
}

/// Aggregation pipeline for the feed query.
///
/// A single $match carrying both share arms yields each reflection at most
/// once; the sort is newest first with the ID as tiebreak so equal
/// timestamps order deterministically.
pub fn feed_pipeline(user_id: &str, herd_ids: &[String]) -> Vec<Document> {
    vec![
        doc! {
            "$match": {
                "$or": [
                    { "sharedWith": user_id },
                    { "sharedHerds": { "$in": herd_ids.to_vec() } },
                ]
            }
        },
        doc! { "$sort": { "timestamp": -1, "_id": -1 } },
        doc! { "$limit": FEED_LIMIT },
    ]
}

/// Aggregates the shared-reflection feed
#[derive(Clone)]
pub struct FeedService {
    users: MongoCollection<UserDoc>,
    herds: MongoCollection<HerdDoc>,
    reflections: MongoCollection<ReflectionDoc>,
}

impl FeedService {
    pub fn new(
        users: MongoCollection<UserDoc>,
        herds: MongoCollection<HerdDoc>,
        reflections: MongoCollection<ReflectionDoc>,
    ) -> Self {
        Self {
            users,
            herds,
            reflections,
        }
    }

    /// Herd IDs the user belongs to right now
    pub async fn member_herd_ids(&self, user_id: &str) -> Result<Vec<String>> {
        herd_ids_for_member(&self.herds, user_id).await
    }

    /// Build the feed for a user
    pub async fn feed_for(&self, user_id: &str) -> Result<Vec<FeedItem>> {
        let herd_ids = self.member_herd_ids(user_id).await?;
        debug!(
            "Building feed for {} across {} herd(s)",
            user_id,
            herd_ids.len()
        );

        let raw = self
            .reflections
            .aggregate(feed_pipeline(user_id, &herd_ids))
            .await?;

        let mut reflections = Vec::with_capacity(raw.len());
        for document in raw {
            let reflection: ReflectionDoc = bson::from_document(document)?;
            reflections.push(reflection);
        }

        let authors = self.load_authors(&reflections).await?;
        attach_authors(&reflections, &authors)
    }

    /// Batch-load the author documents for a set of reflections
    async fn load_authors(
        &self,
        reflections: &[ReflectionDoc],
    ) -> Result<HashMap<String, UserDoc>> {
        let mut author_ids: HashSet<ObjectId> = HashSet::new();
        for reflection in reflections {
            let id = ObjectId::parse_str(&reflection.user_id).map_err(|_| {
                PastureError::Internal(format!(
                    "Reflection {} has a malformed author reference",
                    reflection.id_hex()
                ))
            })?;
            author_ids.insert(id);
        }

        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<ObjectId> = author_ids.into_iter().collect();
        let users = self.users.find_many(doc! { "_id": { "$in": ids } }).await?;

        Ok(users.into_iter().map(|user| (user.id_hex(), user)).collect())
    }
}

/// Pair each reflection with its author's display name.
///
/// A reflection whose author cannot be resolved fails the whole feed;
/// entries are never silently dropped here.
fn attach_authors(
    reflections: &[ReflectionDoc],
    authors: &HashMap<String, UserDoc>,
) -> Result<Vec<FeedItem>> {
    reflections
        .iter()
        .map(|reflection| {
            let author = authors.get(&reflection.user_id).ok_or_else(|| {
                PastureError::Internal(format!(
                    "Author {} missing for reflection {}",
                    reflection.user_id,
                    reflection.id_hex()
                ))
            })?;

            Ok(FeedItem {
                reflection: ReflectionResponse::from(reflection),
                author_name: author.display_name().to_string(),
            })
        })
        .collect()
}
