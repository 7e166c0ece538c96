mod anon_chat_service;
mod chat_service;
mod content_service;
mod event_service;
mod rating_service;

pub use anon_chat_service::{
    AnonChatService, AnonChatServiceDependencies, EnterQueueRequest, QueueOutcome,
};
pub use chat_service::{ChatPage, ChatService, ChatServiceDependencies, MessagePage};
pub use content_service::{
    CommentPage, ContentService, ContentServiceDependencies, PostPage, POST_HEADER_MAX,
    PROFILE_NAME_MAX,
};
pub use event_service::{EventService, EventServiceDependencies};
pub use rating_service::{RatingService, RatingServiceDependencies};

use config::RatingConfig;
use domain::{DomainError, Profile, ProfileId, ProfileRepository};
use tracing::debug;

use crate::error::ApplicationResult;

/// 单页最多返回的会话、消息、帖子或评论数
pub const PAGE_MAX: u64 = 100;

/// 评分请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
    Applied,
    /// 评分次数已用完，什么也没有改变
    Skipped,
}

async fn require_profile(
    profiles: &dyn ProfileRepository,
    profile_id: ProfileId,
) -> ApplicationResult<Profile> {
    Ok(profiles
        .find_by_id(profile_id)
        .await?
        .ok_or(DomainError::ProfileNotFound)?)
}

fn rates_exhausted(config: &RatingConfig, profile_id: ProfileId) -> ApplicationResult<RateOutcome> {
    if config.reject_when_exhausted {
        return Err(DomainError::RatesExhausted.into());
    }
    debug!(profile_id = %profile_id, "no rate credits left, rating skipped");
    Ok(RateOutcome::Skipped)
}

fn validate_page(count: u64) -> Result<(), DomainError> {
    if !(1..=PAGE_MAX).contains(&count) {
        return Err(DomainError::invalid_argument(
            "count",
            format!("must be between 1 and {PAGE_MAX}"),
        ));
    }
    Ok(())
}
