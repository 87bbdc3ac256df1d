//! Visibility and mutation rules for reflections and herds
//!
//! Every rule here is a pure decision over already-loaded documents. The
//! caller supplies the actor's herd memberships from a live query; the
//! settings.herds cache on the user document is never an input.

use crate::db::schemas::{HerdDoc, ReflectionDoc};
use crate::types::{PastureError, Result};

/// Herd operations restricted to the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    Update,
    Delete,
    AddMember,
}

impl OwnerAction {
    fn denied_message(&self) -> &'static str {
        match self {
            Self::Update => "Only the owner can update the herd",
            Self::Delete => "Only the owner can delete the herd",
            Self::AddMember => "Only the owner can add members",
        }
    }
}

/// Whether the actor may read or react to a reflection.
///
/// Granted to the author, anyone it is shared with directly, and anyone who
/// currently belongs to a herd it is shared with.
pub fn can_view_reflection(
    reflection: &ReflectionDoc,
    user_id: &str,
    member_herd_ids: &[String],
) -> bool {
    if reflection.is_owner(user_id) {
        return true;
    }

    if reflection.shared_with.iter().any(|id| id == user_id) {
        return true;
    }

    reflection
        .shared_herds
        .iter()
        .any(|herd_id| member_herd_ids.iter().any(|id| id == herd_id))
}

/// Error-returning form of [`can_view_reflection`]
pub fn check_view_reflection(
    reflection: &ReflectionDoc,
    user_id: &str,
    member_herd_ids: &[String],
) -> Result<()> {
    if can_view_reflection(reflection, user_id, member_herd_ids) {
        Ok(())
    } else {
        Err(PastureError::Forbidden(
            "Not authorized to access this reflection".into(),
        ))
    }
}

/// Only the author may mutate a reflection's own state (flag toggle)
pub fn check_reflection_owner(reflection: &ReflectionDoc, user_id: &str) -> Result<()> {
    if reflection.is_owner(user_id) {
        Ok(())
    } else {
        Err(PastureError::Forbidden(
            "Only the owner can modify this reflection".into(),
        ))
    }
}

/// Reading a herd requires membership
pub fn check_herd_member(herd: &HerdDoc, user_id: &str) -> Result<()> {
    if herd.has_member(user_id) {
        Ok(())
    } else {
        Err(PastureError::Forbidden(
            "Not authorized to access this herd".into(),
        ))
    }
}

/// Update, delete, and member addition are owner-only
pub fn check_herd_owner(herd: &HerdDoc, user_id: &str, action: OwnerAction) -> Result<()> {
    if herd.is_owner(user_id) {
        Ok(())
    } else {
        Err(PastureError::Forbidden(action.denied_message().into()))
    }
}

/// Member removal: the owner may remove anyone, a member may remove
/// themselves (leave). The owner can never be removed, only the herd
/// deleted; that holds even when the owner is the requester.
pub fn check_member_removal(herd: &HerdDoc, actor_id: &str, target_id: &str) -> Result<()> {
    let is_owner = herd.is_owner(actor_id);
    let is_self = actor_id == target_id;

    if !(is_owner || is_self) {
        return Err(PastureError::Forbidden(
            "Not authorized to remove this member".into(),
        ));
    }

    if herd.is_owner(target_id) {
        return Err(PastureError::InvalidOperation(
            "Owner cannot be removed. Delete the herd instead.".into(),
        ));
    }

    if !herd.has_member(target_id) {
        return Err(PastureError::NotFound("Member not found in herd".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{HerdMember, HerdRole};

    fn reflection(owner: &str, shared_with: &[&str], shared_herds: &[&str]) -> ReflectionDoc {
        ReflectionDoc {
            user_id: owner.into(),
            high: "h".into(),
            low: "l".into(),
            buffalo: "b".into(),
            shared_with: shared_with.iter().map(|s| s.to_string()).collect(),
            shared_herds: shared_herds.iter().map(|s| s.to_string()).collect(),
            timestamp: "2024-01-15T10:30:00.000000+00:00".into(),
            ..Default::default()
        }
    }

    fn herd(owner: &str, members: &[&str]) -> HerdDoc {
        let mut doc = HerdDoc::new("H".into(), None, owner.into(), format!("{owner}@example.com"));
        for member in members {
            doc.members.push(HerdMember {
                user_id: member.to_string(),
                email: format!("{member}@example.com"),
                joined_at: "2024-01-15T10:30:00.000000+00:00".into(),
                role: HerdRole::Member,
            });
        }
        doc
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_owner_can_view() {
        let r = reflection("alice", &[], &[]);
        assert!(can_view_reflection(&r, "alice", &[]));
    }

    #[test]
    fn test_direct_share_grants_view() {
        let r = reflection("alice", &["bob"], &[]);
        assert!(can_view_reflection(&r, "bob", &[]));
        assert!(!can_view_reflection(&r, "carol", &[]));
    }

    #[test]
    fn test_herd_share_requires_current_membership() {
        let r = reflection("alice", &[], &["herd-1"]);

        assert!(can_view_reflection(&r, "bob", &ids(&["herd-1"])));
        assert!(can_view_reflection(&r, "bob", &ids(&["herd-0", "herd-1"])));

        // No overlap with the reflection's herds
        assert!(!can_view_reflection(&r, "bob", &ids(&["herd-2"])));
        assert!(!can_view_reflection(&r, "bob", &[]));
    }

    #[test]
    fn test_private_reflection_visible_to_owner_only() {
        let r = reflection("alice", &[], &[]);
        assert!(can_view_reflection(&r, "alice", &ids(&["herd-1"])));
        assert!(!can_view_reflection(&r, "bob", &ids(&["herd-1"])));
    }

    #[test]
    fn test_check_view_reflection_forbids() {
        let r = reflection("alice", &[], &[]);
        let err = check_view_reflection(&r, "bob", &[]).unwrap_err();
        assert!(matches!(err, PastureError::Forbidden(_)));
    }

    #[test]
    fn test_check_reflection_owner() {
        let r = reflection("alice", &["bob"], &[]);
        assert!(check_reflection_owner(&r, "alice").is_ok());

        // Visible is not enough
        let err = check_reflection_owner(&r, "bob").unwrap_err();
        assert!(matches!(err, PastureError::Forbidden(_)));
    }

    #[test]
    fn test_check_herd_member() {
        let h = herd("alice", &["bob"]);
        assert!(check_herd_member(&h, "alice").is_ok());
        assert!(check_herd_member(&h, "bob").is_ok());
        assert!(matches!(
            check_herd_member(&h, "carol").unwrap_err(),
            PastureError::Forbidden(_)
        ));
    }

    #[test]
    fn test_check_herd_owner() {
        let h = herd("alice", &["bob"]);
        assert!(check_herd_owner(&h, "alice", OwnerAction::Update).is_ok());
        assert!(check_herd_owner(&h, "alice", OwnerAction::Delete).is_ok());
        assert!(check_herd_owner(&h, "alice", OwnerAction::AddMember).is_ok());

        // Membership does not grant owner actions
        let err = check_herd_owner(&h, "bob", OwnerAction::Update).unwrap_err();
        assert!(matches!(err, PastureError::Forbidden(_)));
    }

    #[test]
    fn test_owner_can_remove_member() {
        let h = herd("alice", &["bob"]);
        assert!(check_member_removal(&h, "alice", "bob").is_ok());
    }

    #[test]
    fn test_member_can_leave() {
        let h = herd("alice", &["bob"]);
        assert!(check_member_removal(&h, "bob", "bob").is_ok());
    }

    #[test]
    fn test_member_cannot_remove_other_member() {
        let h = herd("alice", &["bob", "carol"]);
        let err = check_member_removal(&h, "bob", "carol").unwrap_err();
        assert!(matches!(err, PastureError::Forbidden(_)));
    }

    #[test]
    fn test_owner_removal_always_refused() {
        let h = herd("alice", &["bob"]);

        // Even the owner cannot remove themselves
        let err = check_member_removal(&h, "alice", "alice").unwrap_err();
        assert!(matches!(err, PastureError::InvalidOperation(_)));

        // A non-owner attempting it fails authorization first
        let err = check_member_removal(&h, "bob", "alice").unwrap_err();
        assert!(matches!(err, PastureError::Forbidden(_)));
    }

    #[test]
    fn test_removing_absent_member_is_not_found() {
        let h = herd("alice", &["bob"]);
        let err = check_member_removal(&h, "alice", "carol").unwrap_err();
        assert!(matches!(err, PastureError::NotFound(_)));
    }
}
