//! Group entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Topic a group is filed under.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum GroupCategory {
    #[default]
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "education")]
    Education,
    #[sea_orm(string_value = "technology")]
    Technology,
    #[sea_orm(string_value = "sports")]
    Sports,
    #[sea_orm(string_value = "entertainment")]
    Entertainment,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "health")]
    Health,
    #[sea_orm(string_value = "travel")]
    Travel,
    #[sea_orm(string_value = "food")]
    Food,
    #[sea_orm(string_value = "gaming")]
    Gaming,
    #[sea_orm(string_value = "music")]
    Music,
    #[sea_orm(string_value = "art")]
    Art,
    #[sea_orm(string_value = "other")]
    Other,
}

/// Group privacy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum GroupPrivacy {
    #[default]
    #[sea_orm(string_value = "public")]
    Public,
    #[sea_orm(string_value = "private")]
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub category: GroupCategory,

    #[sea_orm(nullable)]
    pub profile_picture: Option<String>,

    #[sea_orm(nullable)]
    pub cover_photo: Option<String>,

    pub privacy: GroupPrivacy,

    #[sea_orm(indexed)]
    pub created_by_id: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedById",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,

    #[sea_orm(has_many = "super::group_member::Entity")]
    Members,
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
