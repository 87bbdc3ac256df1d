//! Database schemas for Pasture
//!
//! Defines MongoDB document structures for users, herds, and reflections.

mod herd;
mod reflection;
mod user;

pub use herd::{
    herd_ids_for_member, HerdDoc, HerdMember, HerdResponse, HerdRole, HERD_COLLECTION,
};
pub use reflection::{
    flag_toggle_pipeline, reaction_toggle_pipeline, validate_reaction_type, ReflectionDoc,
    ReflectionResponse, DEFAULT_REACTION_TYPE, REFLECTION_COLLECTION,
};
pub use user::{
    NotificationCadence, PublicUser, UserDoc, UserResponse, UserSettings, USER_COLLECTION,
};

/// Current UTC time in the ISO-8601 form stored on documents.
///
/// Microsecond precision with a numeric offset, so lexicographic order on
/// stored timestamps matches time order.
pub fn now_iso() -> String {
    to_iso(chrono::Utc::now())
}

/// Format a UTC time the way documents store timestamps
pub fn to_iso(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
}
