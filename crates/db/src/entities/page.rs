//! Page entity.
//!
//! A public profile for a business, brand or community, owned by one user and
//! optionally managed by additional page admins.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Page category.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum PageCategory {
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "brand")]
    Brand,
    #[sea_orm(string_value = "community")]
    Community,
    #[sea_orm(string_value = "entertainment")]
    Entertainment,
    #[sea_orm(string_value = "education")]
    Education,
    #[sea_orm(string_value = "nonprofit")]
    Nonprofit,
    #[default]
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "page")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub owner_id: String,

    pub name: String,

    /// Unique handle used in page URLs.
    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub category: PageCategory,

    #[sea_orm(nullable)]
    pub profile_picture: Option<String>,

    #[sea_orm(nullable)]
    pub cover_photo: Option<String>,

    #[sea_orm(nullable)]
    pub website: Option<String>,

    #[sea_orm(nullable)]
    pub email: Option<String>,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    #[sea_orm(nullable)]
    pub location: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,

    #[sea_orm(has_many = "super::page_follower::Entity")]
    Followers,

    #[sea_orm(has_many = "super::page_admin::Entity")]
    Admins,
}

impl Related<super::page_follower::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Followers.def()
    }
}

impl Related<super::page_admin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admins.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
