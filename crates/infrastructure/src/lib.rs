//! 基础设施层实现。
//!
//! 提供文档存储的内存实现，以及把存储、实时状态和时钟组装在一起的 [`Infrastructure`]。

pub mod builder;
pub mod repository;

pub use builder::Infrastructure;
pub use repository::{
    InMemoryCommentRepository, InMemoryConversationRepository, InMemoryMessageRepository,
    InMemoryPostRepository, InMemoryProfileRepository, MemoryStorage,
};
