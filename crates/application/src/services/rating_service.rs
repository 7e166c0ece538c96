//! 帖子与评论的评分。
//!
//! 被评价的内容按未加权的调整量变化，作者的 profile 评分按场景权重变化。

use std::sync::Arc;

use config::RatingConfig;
use domain::{
    rating::{profile_adjustment, vote_bias},
    CommentId, CommentRepository, DomainError, PostId, PostRepository, Profile, ProfileId,
    ProfileRepository, RatingContext, Vote,
};
use tracing::{info, warn};

use super::{rates_exhausted, require_profile, RateOutcome};
use crate::error::ApplicationResult;

pub struct RatingServiceDependencies {
    pub profile_repository: Arc<dyn ProfileRepository>,
    pub post_repository: Arc<dyn PostRepository>,
    pub comment_repository: Arc<dyn CommentRepository>,
    pub config: RatingConfig,
}

pub struct RatingService {
    deps: RatingServiceDependencies,
}

impl RatingService {
    pub fn new(deps: RatingServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn rate_post(
        &self,
        profile_id: ProfileId,
        post_id: PostId,
        vote: Vote,
    ) -> ApplicationResult<RateOutcome> {
        let post = self
            .deps
            .post_repository
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::PostNotFound)?;
        if post.author == profile_id {
            return Err(DomainError::OwnContent.into());
        }

        let Some(rater) = self.rater(profile_id).await? else {
            return rates_exhausted(&self.deps.config, profile_id);
        };

        self.deps
            .post_repository
            .adjust_rating(post_id, vote_bias(rater.rating, vote))
            .await?
            .ok_or(DomainError::PostNotFound)?;
        self.adjust_author(post.author, &rater, vote, RatingContext::PostAuthor)
            .await?;
        self.deps.profile_repository.consume_rate(profile_id).await?;

        info!(post_id = %post_id, profile_id = %profile_id, ?vote, "post rated");
        Ok(RateOutcome::Applied)
    }

    pub async fn rate_comment(
        &self,
        profile_id: ProfileId,
        comment_id: CommentId,
        vote: Vote,
    ) -> ApplicationResult<RateOutcome> {
        let comment = self
            .deps
            .comment_repository
            .find_by_id(comment_id)
            .await?
            .ok_or(DomainError::CommentNotFound)?;
        if comment.author == profile_id {
            return Err(DomainError::OwnContent.into());
        }

        let Some(rater) = self.rater(profile_id).await? else {
            return rates_exhausted(&self.deps.config, profile_id);
        };

        self.deps
            .comment_repository
            .adjust_rating(comment_id, vote_bias(rater.rating, vote))
            .await?
            .ok_or(DomainError::CommentNotFound)?;
        self.adjust_author(comment.author, &rater, vote, RatingContext::CommentAuthor)
            .await?;
        self.deps.profile_repository.consume_rate(profile_id).await?;

        info!(comment_id = %comment_id, profile_id = %profile_id, ?vote, "comment rated");
        Ok(RateOutcome::Applied)
    }

    /// 所有 profile 补充一次评分次数，返回被修改的数量
    pub async fn replenish_rates(&self) -> ApplicationResult<u64> {
        let updated = self
            .deps
            .profile_repository
            .replenish_rates(self.deps.config.max_rates)
            .await?;
        info!(updated, "rate credits replenished");
        Ok(updated)
    }

    /// 评分者还有次数时返回其 profile
    async fn rater(&self, profile_id: ProfileId) -> ApplicationResult<Option<Profile>> {
        let rater = require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        Ok(rater.can_rate().then_some(rater))
    }

    async fn adjust_author(
        &self,
        author: ProfileId,
        rater: &Profile,
        vote: Vote,
        context: RatingContext,
    ) -> ApplicationResult<()> {
        let delta = profile_adjustment(rater.rating, vote, context);
        let updated = self
            .deps
            .profile_repository
            .adjust_rating(author, delta)
            .await?;
        if updated.is_none() {
            // 作者已删除时内容仍然可以被评分
            warn!(author_id = %author, "author profile missing, skipping author rating");
        }
        Ok(())
    }
}
