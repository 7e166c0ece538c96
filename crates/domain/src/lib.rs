//! 社交后端核心领域模型
//!
//! 包含 profile、会话、消息、帖子、评论等实体，匿名聊天的匹配规则、
//! 评分规则、推送事件，以及文档存储的抽象接口。

pub mod anon_chat;
pub mod entities;
pub mod errors;
pub mod events;
pub mod rating;
pub mod repository;
pub mod value_objects;

// 重新导出常用类型
pub use anon_chat::{Filter, Gender, WaitingEntry};
pub use entities::*;
pub use errors::*;
pub use events::Event;
pub use rating::{Rating, RatingContext, RatingRange, Vote};
pub use repository::*;
pub use value_objects::*;
