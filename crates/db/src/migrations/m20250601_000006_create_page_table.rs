//! Create page, page follower and page admin tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Page::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Page::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Page::OwnerId).string_len(32).not_null())
                    .col(ColumnDef::new(Page::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Page::Username).string_len(100).not_null())
                    .col(ColumnDef::new(Page::Description).text())
                    .col(
                        ColumnDef::new(Page::Category)
                            .string_len(20)
                            .not_null()
                            .default("other"),
                    )
                    .col(ColumnDef::new(Page::ProfilePicture).string_len(1024))
                    .col(ColumnDef::new(Page::CoverPhoto).string_len(1024))
                    .col(ColumnDef::new(Page::Website).string_len(200))
                    .col(ColumnDef::new(Page::Email).string_len(254))
                    .col(ColumnDef::new(Page::Phone).string_len(20))
                    .col(ColumnDef::new(Page::Location).string_len(100))
                    .col(ColumnDef::new(Page::IsVerified).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Page::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Page::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_owner")
                            .from(Page::Table, Page::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_username")
                    .table(Page::Table)
                    .col(Page::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_owner_id")
                    .table(Page::Table)
                    .col(Page::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageFollower::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageFollower::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PageFollower::PageId).string_len(32).not_null())
                    .col(ColumnDef::new(PageFollower::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PageFollower::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_follower_page")
                            .from(PageFollower::Table, PageFollower::PageId)
                            .to(Page::Table, Page::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_follower_user")
                            .from(PageFollower::Table, PageFollower::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (page_id, user_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_page_follower_page_user")
                    .table(PageFollower::Table)
                    .col(PageFollower::PageId)
                    .col(PageFollower::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageAdmin::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageAdmin::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PageAdmin::PageId).string_len(32).not_null())
                    .col(ColumnDef::new(PageAdmin::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PageAdmin::Role)
                            .string_len(20)
                            .not_null()
                            .default("editor"),
                    )
                    .col(
                        ColumnDef::new(PageAdmin::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_admin_page")
                            .from(PageAdmin::Table, PageAdmin::PageId)
                            .to(Page::Table, Page::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_admin_user")
                            .from(PageAdmin::Table, PageAdmin::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (page_id, user_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_page_admin_page_user")
                    .table(PageAdmin::Table)
                    .col(PageAdmin::PageId)
                    .col(PageAdmin::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PageAdmin::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PageFollower::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Page::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Page {
    Table,
    Id,
    OwnerId,
    Name,
    Username,
    Description,
    Category,
    ProfilePicture,
    CoverPhoto,
    Website,
    Email,
    Phone,
    Location,
    IsVerified,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PageFollower {
    Table,
    Id,
    PageId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum PageAdmin {
    Table,
    Id,
    PageId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
