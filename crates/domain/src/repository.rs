//! 文档存储协作者接口
//!
//! 内层定义接口，外层（infrastructure）实现。所有方法都是挂起点。
//! 涉及评分的更新必须是原子的"读-改-写"，夹值规则由实现方调用 [`crate::rating`] 完成。

use async_trait::async_trait;

use crate::entities::{
    Comment, CommentQuery, Conversation, ConversationKind, Message, Post, PostQuery, Profile,
};
use crate::errors::RepositoryError;
use crate::value_objects::{ChatId, CommentId, MessageId, PostId, ProfileId, Timestamp};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn insert(&self, profile: Profile) -> RepositoryResult<Profile>;
    async fn find_by_id(&self, id: ProfileId) -> RepositoryResult<Option<Profile>>;
    /// 评分加上 `delta` 后夹值
    async fn adjust_rating(&self, id: ProfileId, delta: f64) -> RepositoryResult<Option<Profile>>;
    /// 评分次数减一，下限 0
    async fn consume_rate(&self, id: ProfileId) -> RepositoryResult<Option<Profile>>;
    async fn block_partner(&self, id: ProfileId, partner: ProfileId) -> RepositoryResult<()>;
    /// 所有 profile 的评分次数加一，上限 `max`；返回被修改的数量
    async fn replenish_rates(&self, max: u32) -> RepositoryResult<u64>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn insert(&self, conversation: Conversation) -> RepositoryResult<ChatId>;
    /// 仅当 `participant` 参与了该会话时返回
    async fn find_for_participant(
        &self,
        id: ChatId,
        participant: ProfileId,
    ) -> RepositoryResult<Option<Conversation>>;
    /// 更新 `last_update` 与预览，返回更新后的会话
    async fn touch(
        &self,
        id: ChatId,
        participant: ProfileId,
        preview: String,
        now: Timestamp,
    ) -> RepositoryResult<Option<Conversation>>;
    /// 删除指定类型、且 `participant` 参与的会话，返回被删除的会话
    async fn delete_for_participant(
        &self,
        id: ChatId,
        participant: ProfileId,
        kind: ConversationKind,
    ) -> RepositoryResult<Option<Conversation>>;
    async fn count_for_participant(&self, participant: ProfileId) -> RepositoryResult<u64>;
    /// 按 `last_update` 倒序分页
    async fn list_for_participant(
        &self,
        participant: ProfileId,
        offset: u64,
        limit: u64,
    ) -> RepositoryResult<Vec<Conversation>>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> RepositoryResult<MessageId>;
    async fn count_in_chat(&self, chat_id: ChatId) -> RepositoryResult<u64>;
    /// 按创建时间倒序分页
    async fn list_in_chat(
        &self,
        chat_id: ChatId,
        offset: u64,
        limit: u64,
    ) -> RepositoryResult<Vec<Message>>;
    async fn delete_in_chat(&self, chat_id: ChatId) -> RepositoryResult<u64>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: Post) -> RepositoryResult<PostId>;
    async fn find_by_id(&self, id: PostId) -> RepositoryResult<Option<Post>>;
    async fn adjust_rating(&self, id: PostId, delta: f64) -> RepositoryResult<Option<Post>>;
    async fn count(&self, query: PostQuery) -> RepositoryResult<u64>;
    /// 按创建时间正序分页
    async fn list(&self, query: PostQuery, offset: u64, limit: u64) -> RepositoryResult<Vec<Post>>;
    /// 仅删除 `author` 自己的帖子，返回被删除的帖子
    async fn delete_by_author(&self, id: PostId, author: ProfileId)
        -> RepositoryResult<Option<Post>>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: Comment) -> RepositoryResult<CommentId>;
    async fn find_by_id(&self, id: CommentId) -> RepositoryResult<Option<Comment>>;
    async fn adjust_rating(&self, id: CommentId, delta: f64) -> RepositoryResult<Option<Comment>>;
    async fn count(&self, query: CommentQuery) -> RepositoryResult<u64>;
    /// 按创建时间正序分页
    async fn list(
        &self,
        query: CommentQuery,
        offset: u64,
        limit: u64,
    ) -> RepositoryResult<Vec<Comment>>;
    async fn delete_by_author(
        &self,
        id: CommentId,
        author: ProfileId,
    ) -> RepositoryResult<Option<Comment>>;
}
