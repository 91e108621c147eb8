//! Authorization predicates.
//!
//! Every ownership and role check in the services goes through these
//! functions so each rule is stated once.

use lookbook_common::{AppError, AppResult};
use lookbook_db::entities::{friendship, page, user};

/// Staff and superusers.
#[must_use]
pub const fn is_moderator(actor: &user::Model) -> bool {
    actor.is_moderator()
}

/// The owner of a resource, or a moderator.
#[must_use]
pub fn can_modify(actor: &user::Model, owner_id: &str) -> bool {
    actor.id == owner_id || is_moderator(actor)
}

/// One of the two parties of a friendship.
#[must_use]
pub fn is_party(actor_id: &str, friendship: &friendship::Model) -> bool {
    friendship.involves(actor_id)
}

/// The page owner, or a user listed as one of its admins.
#[must_use]
pub fn can_manage_page(actor_id: &str, page: &page::Model, is_page_admin: bool) -> bool {
    page.owner_id == actor_id || is_page_admin
}

/// Fail with [`AppError::Forbidden`] unless [`can_modify`] holds.
pub fn require_can_modify(actor: &user::Model, owner_id: &str, resource: &str) -> AppResult<()> {
    if can_modify(actor, owner_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "You do not have permission to modify this {resource}"
        )))
    }
}

/// Fail with [`AppError::Forbidden`] unless the actor is a moderator.
pub fn require_moderator(actor: &user::Model) -> AppResult<()> {
    if is_moderator(actor) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Staff access required".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use lookbook_db::entities::user;

    /// A plain active account whose ID equals its username.
    pub fn user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            bio: None,
            profile_picture: None,
            cover_photo: None,
            date_of_birth: None,
            location: None,
            website: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            can_use_rich_editor: false,
            rich_editor_requested: false,
            rich_editor_request_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    pub fn staff(id: &str) -> user::Model {
        user::Model {
            is_staff: true,
            ..user(id)
        }
    }

    pub fn inactive(id: &str) -> user::Model {
        user::Model {
            is_active: false,
            ..user(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{staff, user};
    use super::*;

    #[test]
    fn test_owner_can_modify() {
        assert!(can_modify(&user("alice"), "alice"));
        assert!(!can_modify(&user("bob"), "alice"));
    }

    #[test]
    fn test_moderators_can_modify_anything() {
        assert!(can_modify(&staff("mod"), "alice"));

        let root = user::Model {
            is_superuser: true,
            ..user("root")
        };
        assert!(can_modify(&root, "alice"));
    }

    #[test]
    fn test_require_can_modify_message() {
        let err = require_can_modify(&user("bob"), "alice", "post").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg.contains("post")));
    }

    #[test]
    fn test_require_moderator() {
        assert!(require_moderator(&staff("mod")).is_ok());
        assert!(require_moderator(&user("alice")).is_err());
    }
}
