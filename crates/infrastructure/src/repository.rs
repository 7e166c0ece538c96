//! 文档存储的内存实现。
//!
//! 每个集合一把 `RwLock`，评分与评分次数的更新在写锁内完成"读-改-写"，
//! 夹值规则复用 [`domain::rating`]。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    rating, ChatId, Comment, CommentId, CommentQuery, CommentRepository, Conversation,
    ConversationKind, ConversationRepository, Message, MessageId, MessageRepository, Post, PostId,
    PostQuery, PostRepository, Profile, ProfileId, ProfileRepository, RepositoryError,
    RepositoryResult, Timestamp,
};
use tokio::sync::RwLock;

fn page<T>(items: impl Iterator<Item = T>, offset: u64, limit: u64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    items.skip(offset).take(limit).collect()
}

#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<ProfileId, Profile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn insert(&self, profile: Profile) -> RepositoryResult<Profile> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict);
        }
        profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn find_by_id(&self, id: ProfileId) -> RepositoryResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn adjust_rating(&self, id: ProfileId, delta: f64) -> RepositoryResult<Option<Profile>> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&id).map(|profile| {
            profile.rating = profile.rating.adjusted(delta);
            profile.clone()
        }))
    }

    async fn consume_rate(&self, id: ProfileId) -> RepositoryResult<Option<Profile>> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&id).map(|profile| {
            profile.rates = rating::consume_rate(profile.rates);
            profile.clone()
        }))
    }

    async fn block_partner(&self, id: ProfileId, partner: ProfileId) -> RepositoryResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if !profile.has_blocked(partner) {
            profile.blocked_chats.push(partner);
        }
        Ok(())
    }

    async fn replenish_rates(&self, max: u32) -> RepositoryResult<u64> {
        let mut profiles = self.profiles.write().await;
        let mut updated = 0;
        for profile in profiles.values_mut() {
            let next = rating::replenish_rate(profile.rates, max);
            if next != profile.rates {
                profile.rates = next;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<ChatId, Conversation>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn insert(&self, conversation: Conversation) -> RepositoryResult<ChatId> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            return Err(RepositoryError::Conflict);
        }
        let id = conversation.id;
        conversations.insert(id, conversation);
        Ok(id)
    }

    async fn find_for_participant(
        &self,
        id: ChatId,
        participant: ProfileId,
    ) -> RepositoryResult<Option<Conversation>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(&id)
            .filter(|conversation| conversation.has_participant(participant))
            .cloned())
    }

    async fn touch(
        &self,
        id: ChatId,
        participant: ProfileId,
        preview: String,
        now: Timestamp,
    ) -> RepositoryResult<Option<Conversation>> {
        let mut conversations = self.conversations.write().await;
        Ok(conversations
            .get_mut(&id)
            .filter(|conversation| conversation.has_participant(participant))
            .map(|conversation| {
                conversation.last_update = now;
                conversation.preview = Some(preview);
                conversation.clone()
            }))
    }

    async fn delete_for_participant(
        &self,
        id: ChatId,
        participant: ProfileId,
        kind: ConversationKind,
    ) -> RepositoryResult<Option<Conversation>> {
        let mut conversations = self.conversations.write().await;
        let owned = conversations
            .get(&id)
            .is_some_and(|conversation| {
                conversation.kind == kind && conversation.has_participant(participant)
            });
        Ok(if owned { conversations.remove(&id) } else { None })
    }

    async fn count_for_participant(&self, participant: ProfileId) -> RepositoryResult<u64> {
        let conversations = self.conversations.read().await;
        let count = conversations
            .values()
            .filter(|conversation| conversation.has_participant(participant))
            .count();
        Ok(count as u64)
    }

    async fn list_for_participant(
        &self,
        participant: ProfileId,
        offset: u64,
        limit: u64,
    ) -> RepositoryResult<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut owned: Vec<&Conversation> = conversations
            .values()
            .filter(|conversation| conversation.has_participant(participant))
            .collect();
        owned.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        Ok(page(owned.into_iter().cloned(), offset, limit))
    }
}

/// 消息按插入顺序保存
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> RepositoryResult<MessageId> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|stored| stored.id == message.id) {
            return Err(RepositoryError::Conflict);
        }
        let id = message.id;
        messages.push(message);
        Ok(id)
    }

    async fn count_in_chat(&self, chat_id: ChatId) -> RepositoryResult<u64> {
        let messages = self.messages.read().await;
        Ok(messages.iter().filter(|message| message.chat_id == chat_id).count() as u64)
    }

    async fn list_in_chat(
        &self,
        chat_id: ChatId,
        offset: u64,
        limit: u64,
    ) -> RepositoryResult<Vec<Message>> {
        let messages = self.messages.read().await;
        // 倒序遍历后稳定排序，同一时刻的消息后插入的排在前面
        let mut in_chat: Vec<&Message> = messages
            .iter()
            .rev()
            .filter(|message| message.chat_id == chat_id)
            .collect();
        in_chat.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(in_chat.into_iter().cloned(), offset, limit))
    }

    async fn delete_in_chat(&self, chat_id: ChatId) -> RepositoryResult<u64> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|message| message.chat_id != chat_id);
        Ok((before - messages.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<HashMap<PostId, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: Post) -> RepositoryResult<PostId> {
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(RepositoryError::Conflict);
        }
        let id = post.id;
        posts.insert(id, post);
        Ok(id)
    }

    async fn find_by_id(&self, id: PostId) -> RepositoryResult<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn adjust_rating(&self, id: PostId, delta: f64) -> RepositoryResult<Option<Post>> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&id).map(|post| {
            post.rating = post.rating.adjusted(delta);
            post.clone()
        }))
    }

    async fn count(&self, query: PostQuery) -> RepositoryResult<u64> {
        let posts = self.posts.read().await;
        Ok(posts.values().filter(|post| query.matches(post)).count() as u64)
    }

    async fn list(&self, query: PostQuery, offset: u64, limit: u64) -> RepositoryResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut matched: Vec<&Post> = posts.values().filter(|post| query.matches(post)).collect();
        // HashMap 无序，同一时刻发布的帖子按 id 排，保证分页稳定
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page(matched.into_iter().cloned(), offset, limit))
    }

    async fn delete_by_author(
        &self,
        id: PostId,
        author: ProfileId,
    ) -> RepositoryResult<Option<Post>> {
        let mut posts = self.posts.write().await;
        if posts.get(&id).is_some_and(|post| post.author == author) {
            return Ok(posts.remove(&id));
        }
        Ok(None)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCommentRepository {
    comments: RwLock<HashMap<CommentId, Comment>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn insert(&self, comment: Comment) -> RepositoryResult<CommentId> {
        let mut comments = self.comments.write().await;
        if comments.contains_key(&comment.id) {
            return Err(RepositoryError::Conflict);
        }
        let id = comment.id;
        comments.insert(id, comment);
        Ok(id)
    }

    async fn find_by_id(&self, id: CommentId) -> RepositoryResult<Option<Comment>> {
        Ok(self.comments.read().await.get(&id).cloned())
    }

    async fn adjust_rating(&self, id: CommentId, delta: f64) -> RepositoryResult<Option<Comment>> {
        let mut comments = self.comments.write().await;
        Ok(comments.get_mut(&id).map(|comment| {
            comment.rating = comment.rating.adjusted(delta);
            comment.clone()
        }))
    }

    async fn count(&self, query: CommentQuery) -> RepositoryResult<u64> {
        let comments = self.comments.read().await;
        Ok(comments.values().filter(|comment| query.matches(comment)).count() as u64)
    }

    async fn list(
        &self,
        query: CommentQuery,
        offset: u64,
        limit: u64,
    ) -> RepositoryResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        let mut matched: Vec<&Comment> = comments
            .values()
            .filter(|comment| query.matches(comment))
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page(matched.into_iter().cloned(), offset, limit))
    }

    async fn delete_by_author(
        &self,
        id: CommentId,
        author: ProfileId,
    ) -> RepositoryResult<Option<Comment>> {
        let mut comments = self.comments.write().await;
        if comments.get(&id).is_some_and(|comment| comment.author == author) {
            return Ok(comments.remove(&id));
        }
        Ok(None)
    }
}

/// 所有集合的内存存储
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    pub profile_repository: Arc<InMemoryProfileRepository>,
    pub conversation_repository: Arc<InMemoryConversationRepository>,
    pub message_repository: Arc<InMemoryMessageRepository>,
    pub post_repository: Arc<InMemoryPostRepository>,
    pub comment_repository: Arc<InMemoryCommentRepository>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}
