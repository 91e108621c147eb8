//! Database repositories.

mod blocking;
mod comment;
mod friendship;
mod group;
mod page;
mod post;
mod post_like;
mod refresh_token;
mod unblock_request;
mod user;

pub use blocking::BlockingRepository;
pub use comment::CommentRepository;
pub use friendship::FriendshipRepository;
pub use group::GroupRepository;
pub use page::PageRepository;
pub use post::PostRepository;
pub use post_like::PostLikeRepository;
pub use refresh_token::RefreshTokenRepository;
pub use unblock_request::UnblockRequestRepository;
pub use user::UserRepository;
