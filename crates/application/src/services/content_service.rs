//! profile、帖子、评论的创建、读取与删除。评分与匿名聊天都以它们为前提。

use std::sync::Arc;

use domain::{
    Comment, CommentId, CommentQuery, CommentRepository, DomainError, MessageText, Post, PostId,
    PostQuery, PostRepository, Profile, ProfileId, ProfileRepository, Rating,
};
use tracing::info;

use super::{require_profile, validate_page};
use crate::{clock::Clock, error::ApplicationResult};

pub const PROFILE_NAME_MAX: usize = 64;
pub const POST_HEADER_MAX: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct PostPage {
    /// 满足筛选条件的帖子总数
    pub count: u64,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentPage {
    pub count: u64,
    pub comments: Vec<Comment>,
}

pub struct ContentServiceDependencies {
    pub profile_repository: Arc<dyn ProfileRepository>,
    pub post_repository: Arc<dyn PostRepository>,
    pub comment_repository: Arc<dyn CommentRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ContentService {
    deps: ContentServiceDependencies,
}

impl ContentService {
    pub fn new(deps: ContentServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_profile(&self, name: String) -> ApplicationResult<Profile> {
        let name = bounded_text("name", name, PROFILE_NAME_MAX)?;
        let profile = Profile::new(ProfileId::generate(), name, self.deps.clock.now());
        let profile = self.deps.profile_repository.insert(profile).await?;

        info!(profile_id = %profile.id, "profile created");
        Ok(profile)
    }

    pub async fn get_profile(&self, profile_id: ProfileId) -> ApplicationResult<Profile> {
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await
    }

    /// 发布帖子，帖子的初始评分继承作者当前的评分
    pub async fn publish_post(
        &self,
        profile_id: ProfileId,
        header: String,
    ) -> ApplicationResult<PostId> {
        let header = bounded_text("header", header, POST_HEADER_MAX)?;
        let author = require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;

        let post = Post {
            id: PostId::generate(),
            author: author.id,
            header,
            rating: author.rating,
            created_at: self.deps.clock.now(),
        };
        let post_id = self.deps.post_repository.insert(post).await?;

        info!(post_id = %post_id, profile_id = %profile_id, "post published");
        Ok(post_id)
    }

    pub async fn publish_comment(
        &self,
        profile_id: ProfileId,
        post_id: PostId,
        reply_to: Option<CommentId>,
        text: String,
    ) -> ApplicationResult<CommentId> {
        let text = MessageText::new(text)?;
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        self.deps
            .post_repository
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound)?;

        if let Some(reply_to) = reply_to {
            let parent = self
                .deps
                .comment_repository
                .find_by_id(reply_to)
                .await?
                .ok_or(DomainError::CommentNotFound)?;
            if parent.post_id != post_id {
                return Err(DomainError::CommentNotFound.into());
            }
        }

        let comment = Comment {
            id: CommentId::generate(),
            post_id,
            author: profile_id,
            reply_to,
            text: text.as_str().to_owned(),
            rating: Rating::default(),
            created_at: self.deps.clock.now(),
        };
        let comment_id = self.deps.comment_repository.insert(comment).await?;

        info!(comment_id = %comment_id, post_id = %post_id, profile_id = %profile_id, "comment published");
        Ok(comment_id)
    }

    pub async fn get_post(&self, profile_id: ProfileId, post_id: PostId) -> ApplicationResult<Post> {
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        Ok(self
            .deps
            .post_repository
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound)?)
    }

    /// 按发布时间正序分页列出帖子
    pub async fn load_posts(
        &self,
        profile_id: ProfileId,
        query: PostQuery,
        count: u64,
        offset: u64,
    ) -> ApplicationResult<PostPage> {
        validate_page(count)?;
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        let total = self.deps.post_repository.count(query).await?;
        let posts = self.deps.post_repository.list(query, offset, count).await?;
        Ok(PostPage {
            count: total,
            posts,
        })
    }

    /// 只有作者能删除帖子；别人的帖子与不存在的帖子同样报 [`DomainError::PostNotFound`]
    pub async fn delete_post(&self, profile_id: ProfileId, post_id: PostId) -> ApplicationResult<()> {
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        self.deps
            .post_repository
            .delete_by_author(post_id, profile_id)
            .await?
            .ok_or(DomainError::PostNotFound)?;

        info!(post_id = %post_id, profile_id = %profile_id, "post deleted");
        Ok(())
    }

    pub async fn load_comments(
        &self,
        profile_id: ProfileId,
        query: CommentQuery,
        count: u64,
        offset: u64,
    ) -> ApplicationResult<CommentPage> {
        validate_page(count)?;
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        let total = self.deps.comment_repository.count(query).await?;
        let comments = self.deps.comment_repository.list(query, offset, count).await?;
        Ok(CommentPage {
            count: total,
            comments,
        })
    }

    pub async fn delete_comment(
        &self,
        profile_id: ProfileId,
        comment_id: CommentId,
    ) -> ApplicationResult<()> {
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        self.deps
            .comment_repository
            .delete_by_author(comment_id, profile_id)
            .await?
            .ok_or(DomainError::CommentNotFound)?;

        info!(comment_id = %comment_id, profile_id = %profile_id, "comment deleted");
        Ok(())
    }
}

fn bounded_text(field: &str, value: String, max: usize) -> Result<String, DomainError> {
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(DomainError::invalid_argument(field, "cannot be empty"));
    }
    if value.chars().count() > max {
        return Err(DomainError::invalid_argument(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(value)
}
