//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub email: String,

    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    #[sea_orm(nullable)]
    pub bio: Option<String>,

    /// URL of the profile picture.
    #[sea_orm(nullable)]
    pub profile_picture: Option<String>,

    /// URL of the cover photo.
    #[sea_orm(nullable)]
    pub cover_photo: Option<String>,

    #[sea_orm(nullable)]
    pub date_of_birth: Option<Date>,

    #[sea_orm(nullable)]
    pub location: Option<String>,

    #[sea_orm(nullable)]
    pub website: Option<String>,

    /// Deactivated accounts can sign in but cannot form new relationships.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(default_value = false)]
    pub is_staff: bool,

    #[sea_orm(default_value = false)]
    pub is_superuser: bool,

    #[sea_orm(default_value = false)]
    pub can_use_rich_editor: bool,

    #[sea_orm(default_value = false)]
    pub rich_editor_requested: bool,

    #[sea_orm(nullable)]
    pub rich_editor_request_date: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Staff and superusers may moderate any content.
    #[must_use]
    pub const fn is_moderator(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    /// Whether the user may use the rich text editor.
    #[must_use]
    pub const fn has_rich_editor_access(&self) -> bool {
        self.is_moderator() || self.can_use_rich_editor
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
