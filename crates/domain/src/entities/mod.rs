//! 领域实体
//!
//! 这些是文档存储中保存的文档形状，核心只关心其中与事件、匹配、评分相关的字段。

pub mod comment;
pub mod conversation;
pub mod message;
pub mod post;
pub mod profile;

pub use comment::{Comment, CommentQuery};
pub use conversation::{Conversation, ConversationKind};
pub use message::Message;
pub use post::{Post, PostQuery};
pub use profile::Profile;
