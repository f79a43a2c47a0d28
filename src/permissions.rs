//! Ownership and sharing decisions, evaluated client-side before any
//! request is issued. The server enforces the same rules independently;
//! a server-side rejection is authoritative over these checks.

use crate::models::{AccessTier, Note, NotePermissions};
use std::collections::BTreeSet;

/// A note that does not exist yet is always owned by its creator-to-be.
pub fn is_owner(note: Option<&Note>, username: &str) -> bool {
    match note {
        Some(note) => note.author == username,
        None => true,
    }
}

/// Only the owner may change the access tier or the reader/writer sets.
/// Callers must discard a non-owner's permission block, not merely hide
/// the controls.
pub fn can_edit_permissions(note: Option<&Note>, username: &str) -> bool {
    is_owner(note, username)
}

/// Recomputes the audience sets for a tier switch. Tiers are mutually
/// exclusive: only the set matching the new tier survives.
pub fn apply_tier_change(
    new_tier: AccessTier,
    readers: &BTreeSet<String>,
    writers: &BTreeSet<String>,
) -> NotePermissions {
    match new_tier {
        AccessTier::Private => NotePermissions {
            access_tier: new_tier,
            readers: BTreeSet::new(),
            writers: BTreeSet::new(),
        },
        AccessTier::SharedRead => NotePermissions {
            access_tier: new_tier,
            readers: readers.clone(),
            writers: BTreeSet::new(),
        },
        AccessTier::SharedWrite => NotePermissions {
            access_tier: new_tier,
            readers: BTreeSet::new(),
            writers: writers.clone(),
        },
    }
}

/// Adds or removes `username` from the set matching the active tier.
/// Under `Private` there is no audience to toggle.
pub fn toggle_user(permissions: &mut NotePermissions, username: &str) {
    let set = match permissions.access_tier {
        AccessTier::Private => return,
        AccessTier::SharedRead => &mut permissions.readers,
        AccessTier::SharedWrite => &mut permissions.writers,
    };

    if !set.remove(username) {
        set.insert(username.to_string());
    }
}

/// Order-independent comparison of tier plus both audience sets. Drives
/// the decision to issue a separate permissions request on submit.
pub fn permissions_changed(current: &NotePermissions, proposed: &NotePermissions) -> bool {
    current.access_tier != proposed.access_tier
        || current.readers != proposed.readers
        || current.writers != proposed.writers
}

#[cfg(test)]
mod tests {
    use super::{apply_tier_change, is_owner, permissions_changed, toggle_user};
    use crate::models::{AccessTier, Note, NotePermissions};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn note_by(author: &str) -> Note {
        Note {
            id: 1,
            title: "t".to_string(),
            body: "b".to_string(),
            author: author.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            tags: BTreeSet::new(),
            collections: BTreeSet::new(),
            permissions: NotePermissions::private(),
            version_number: 1,
            can_edit: true,
            can_delete: true,
            is_locked_for_editing: false,
            locked_by_user: None,
            lock_expires_at: None,
        }
    }

    fn set(users: &[&str]) -> BTreeSet<String> {
        users.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn missing_note_is_owned_by_its_creator() {
        assert!(is_owner(None, "alice"));
        assert!(is_owner(Some(&note_by("alice")), "alice"));
        assert!(!is_owner(Some(&note_by("alice")), "bob"));
    }

    #[test]
    fn switching_to_private_clears_both_sets() {
        let permissions =
            apply_tier_change(AccessTier::Private, &set(&["bob"]), &set(&["carol"]));
        assert!(permissions.readers.is_empty());
        assert!(permissions.writers.is_empty());
    }

    #[test]
    fn shared_read_keeps_readers_and_drops_writers() {
        let permissions =
            apply_tier_change(AccessTier::SharedRead, &set(&["bob"]), &set(&["carol"]));
        assert_eq!(permissions.readers, set(&["bob"]));
        assert!(permissions.writers.is_empty());
    }

    #[test]
    fn shared_write_keeps_writers_and_drops_readers() {
        let permissions =
            apply_tier_change(AccessTier::SharedWrite, &set(&["bob"]), &set(&["carol"]));
        assert!(permissions.readers.is_empty());
        assert_eq!(permissions.writers, set(&["carol"]));
    }

    #[test]
    fn toggle_targets_the_active_tier_set_only() {
        let mut permissions = NotePermissions {
            access_tier: AccessTier::SharedWrite,
            readers: BTreeSet::new(),
            writers: BTreeSet::new(),
        };

        toggle_user(&mut permissions, "bob");
        assert_eq!(permissions.writers, set(&["bob"]));
        assert!(permissions.readers.is_empty());

        toggle_user(&mut permissions, "bob");
        assert!(permissions.writers.is_empty());
    }

    #[test]
    fn toggle_is_a_no_op_under_private() {
        let mut permissions = NotePermissions::private();
        toggle_user(&mut permissions, "bob");
        assert!(permissions.readers.is_empty());
        assert!(permissions.writers.is_empty());
    }

    #[test]
    fn change_detection_ignores_insertion_order() {
        let current = NotePermissions {
            access_tier: AccessTier::SharedRead,
            readers: set(&["bob", "carol"]),
            writers: BTreeSet::new(),
        };
        let same = NotePermissions {
            access_tier: AccessTier::SharedRead,
            readers: set(&["carol", "bob"]),
            writers: BTreeSet::new(),
        };
        assert!(!permissions_changed(&current, &same));

        let mut different = same.clone();
        different.readers.insert("dave".to_string());
        assert!(permissions_changed(&current, &different));
    }
}
