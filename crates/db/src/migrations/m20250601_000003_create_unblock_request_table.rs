//! Create unblock request table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UnblockRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UnblockRequest::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UnblockRequest::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(UnblockRequest::Message).text().not_null())
                    .col(
                        ColumnDef::new(UnblockRequest::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(UnblockRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(UnblockRequest::ReviewedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(UnblockRequest::ReviewedById).string_len(32))
                    .col(ColumnDef::new(UnblockRequest::AdminNotes).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unblock_request_user")
                            .from(UnblockRequest::Table, UnblockRequest::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unblock_request_reviewed_by")
                            .from(UnblockRequest::Table, UnblockRequest::ReviewedById)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, status) for the one-pending-request check
        manager
            .create_index(
                Index::create()
                    .name("idx_unblock_request_user_status")
                    .table(UnblockRequest::Table)
                    .col(UnblockRequest::UserId)
                    .col(UnblockRequest::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UnblockRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UnblockRequest {
    Table,
    Id,
    UserId,
    Message,
    Status,
    CreatedAt,
    ReviewedAt,
    ReviewedById,
    AdminNotes,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
