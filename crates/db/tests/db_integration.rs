//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `lookbook_test`)
//!   `TEST_DB_PASSWORD` (default: `lookbook_test`)
//!   `TEST_DB_ADMIN_NAME` (default: `postgres`)

#![allow(clippy::unwrap_used)]

use lookbook_common::AppError;
use lookbook_db::entities::friendship::FriendshipStatus;
use lookbook_db::entities::{Friendship, friendship};
use lookbook_db::repositories::FriendshipRepository;
use lookbook_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_unordered_pair_is_unique() {
    let db = TestDatabase::create().await.unwrap();
    db.seed_user("alice", true).await.unwrap();
    db.seed_user("bob", true).await.unwrap();

    db.seed_friendship("f1", "alice", "bob", FriendshipStatus::Pending)
        .await
        .unwrap();
    let reverse = db
        .seed_friendship("f2", "bob", "alice", FriendshipStatus::Pending)
        .await;

    assert!(reverse.is_err(), "reverse row must violate the pair index");
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_self_friendship_rejected_by_schema() {
    let db = TestDatabase::create().await.unwrap();
    db.seed_user("alice", true).await.unwrap();

    let result = db
        .seed_friendship("f1", "alice", "alice", FriendshipStatus::Pending)
        .await;

    assert!(result.is_err());
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_insert_maps_to_conflict() {
    let db = TestDatabase::create().await.unwrap();
    db.seed_user("alice", true).await.unwrap();
    db.seed_user("bob", true).await.unwrap();
    db.seed_friendship("f1", "alice", "bob", FriendshipStatus::Pending)
        .await
        .unwrap();

    let duplicate = friendship::ActiveModel {
        id: sea_orm::Set("f2".to_string()),
        from_user_id: sea_orm::Set("bob".to_string()),
        to_user_id: sea_orm::Set("alice".to_string()),
        status: sea_orm::Set(FriendshipStatus::Pending),
        created_at: sea_orm::Set(chrono::Utc::now().into()),
        updated_at: sea_orm::Set(None),
    };
    let result = FriendshipRepository::create_with(db.connection(), duplicate).await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_block_rejected() {
    let db = TestDatabase::create().await.unwrap();
    db.seed_user("alice", true).await.unwrap();
    db.seed_user("bob", true).await.unwrap();

    db.seed_block("b1", "alice", "bob").await.unwrap();
    assert!(db.seed_block("b2", "alice", "bob").await.is_err());
    // The opposite direction is a separate block.
    assert!(db.seed_block("b3", "bob", "alice").await.is_ok());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_user_cascades_friendships() {
    let db = TestDatabase::create().await.unwrap();
    db.seed_user("alice", true).await.unwrap();
    db.seed_user("bob", true).await.unwrap();
    db.seed_friendship("f1", "alice", "bob", FriendshipStatus::Accepted)
        .await
        .unwrap();

    lookbook_db::entities::User::delete_by_id("bob")
        .exec(db.connection())
        .await
        .unwrap();

    let remaining = Friendship::find()
        .filter(friendship::Column::FromUserId.eq("alice"))
        .count(db.connection())
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.admin_database.is_empty());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_repository_over_shared_connection_sees_seeded_rows() {
    let db = TestDatabase::create().await.unwrap();
    db.seed_user("alice", true).await.unwrap();
    db.seed_user("bob", true).await.unwrap();
    db.seed_friendship("f1", "alice", "bob", FriendshipStatus::Pending)
        .await
        .unwrap();

    let repo = FriendshipRepository::new(db.shared_connection());
    let found = repo.find_between("bob", "alice").await.unwrap();

    assert_eq!(found.map(|f| f.id), Some("f1".to_string()));
    drop(repo);
    db.drop_database().await.unwrap();
}
