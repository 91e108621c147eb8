//! Database entities.

#![allow(missing_docs)]

pub mod blocking;
pub mod comment;
pub mod friendship;
pub mod group;
pub mod group_member;
pub mod page;
pub mod page_admin;
pub mod page_follower;
pub mod post;
pub mod post_like;
pub mod refresh_token;
pub mod unblock_request;
pub mod user;

pub use blocking::Entity as Blocking;
pub use comment::Entity as Comment;
pub use friendship::Entity as Friendship;
pub use group::Entity as Group;
pub use group_member::Entity as GroupMember;
pub use page::Entity as Page;
pub use page_admin::Entity as PageAdmin;
pub use page_follower::Entity as PageFollower;
pub use post::Entity as Post;
pub use post_like::Entity as PostLike;
pub use refresh_token::Entity as RefreshToken;
pub use unblock_request::Entity as UnblockRequest;
pub use user::Entity as User;
