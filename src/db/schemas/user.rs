//! User document schema
//!
//! Stores user credentials, profile, and social settings.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// How often the user wants reflection reminders
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCadence {
    #[default]
    Daily,
    Weekly,
    Paused,
}

/// Per-user settings, shaped the way clients send and store them
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserSettings {
    #[serde(default, rename = "notificationCadence")]
    pub notification_cadence: NotificationCadence,

    /// Herd IDs the client last saw itself in. Advisory cache only;
    /// membership truth lives in the herds collection.
    #[serde(default)]
    pub herds: Vec<String>,

    /// Friend user IDs (hex strings)
    #[serde(default)]
    pub friends: Vec<String>,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Login identifier, stored lowercase
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// Whether the user account is active
    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub settings: UserSettings,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user document with default settings
    pub fn new(email: String, password_hash: String, full_name: Option<String>) -> Self {
        Self {
            _id: None,
            email,
            password_hash,
            full_name,
            is_active: true,
            settings: UserSettings::default(),
        }
    }

    /// Hex string of the document ID. Empty until inserted.
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Name shown on shared content: full name when set and non-empty,
    /// email otherwise.
    pub fn display_name(&self) -> &str {
        match &self.full_name {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

/// User shape returned to clients. Never carries the password hash.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub settings: UserSettings,
}

impl From<&UserDoc> for UserResponse {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id_hex(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_active: user.is_active,
            settings: user.settings.clone(),
        }
    }
}

/// Minimal projection shown to other users (friend lists, lookups)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<&UserDoc> for PublicUser {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id_hex(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_full_name() {
        let mut user = UserDoc::new("ann@example.com".into(), "hash".into(), Some("Ann".into()));
        assert_eq!(user.display_name(), "Ann");

        user.full_name = None;
        assert_eq!(user.display_name(), "ann@example.com");
    }

    #[test]
    fn test_display_name_empty_full_name_falls_back_to_email() {
        let user = UserDoc::new("ann@example.com".into(), "hash".into(), Some(String::new()));
        assert_eq!(user.display_name(), "ann@example.com");
    }

    #[test]
    fn test_settings_defaults() {
        let settings: UserSettings = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(settings.notification_cadence, NotificationCadence::Daily);
        assert!(settings.herds.is_empty());
        assert!(settings.friends.is_empty());
    }

    #[test]
    fn test_cadence_serializes_lowercase() {
        let json = serde_json::to_value(NotificationCadence::Paused).unwrap();
        assert_eq!(json, serde_json::json!("paused"));

        let parsed: NotificationCadence = serde_json::from_value(serde_json::json!("weekly")).unwrap();
        assert_eq!(parsed, NotificationCadence::Weekly);
    }

    #[test]
    fn test_settings_wire_field_names() {
        let settings = UserSettings::default();
        let json = serde_json::to_value(&settings).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("notificationCadence"));
        assert!(obj.contains_key("herds"));
        assert!(obj.contains_key("friends"));
    }

    #[test]
    fn test_response_never_carries_password_hash() {
        let mut user = UserDoc::new("ann@example.com".into(), "secret-hash".into(), None);
        user._id = Some(ObjectId::new());

        let response = UserResponse::from(&user);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
