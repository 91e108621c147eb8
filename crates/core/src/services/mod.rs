//! Business logic services.

#![allow(missing_docs)]

pub mod blocking;
pub mod comment;
pub mod friendship;
pub mod group;
pub mod moderation;
pub mod page;
pub mod post;
pub mod setup;
pub mod toggle;
pub mod token;
pub mod user;

pub use blocking::{BlockOutcome, BlockingService};
pub use comment::{CommentResponse, CommentService, CreateCommentInput, UpdateCommentInput};
pub use friendship::{
    FriendCategories, FriendEntry, FriendshipError, FriendshipResponse, FriendshipService,
    RequestType, ResolveAction, ResolveOutcome, SUGGESTION_LIMIT, SendOutcome,
};
pub use group::{
    CreateGroupInput, GroupMemberResponse, GroupResponse, GroupService, JoinOutcome,
    UpdateGroupInput,
};
pub use moderation::{ModerationService, ReviewInput, UnblockRequestResponse};
pub use page::{AddPageAdminInput, CreatePageInput, PageResponse, PageService, UpdatePageInput};
pub use post::{CreatePostInput, PostResponse, PostService, UpdatePostInput};
pub use setup::{EnsureSuperuserInput, PromoteInput, SetupService};
pub use toggle::Toggle;
pub use token::{Claims, TokenPair, TokenService};
pub use user::{RegisterInput, RichEditorRequest, UpdateProfileInput, UserResponse, UserService};
