use serde::{Deserialize, Serialize};

use crate::rating::{Rating, RatingRange};
use crate::value_objects::{CommentId, PostId, ProfileId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: ProfileId,
    pub reply_to: Option<CommentId>,
    pub text: String,
    pub rating: Rating,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

/// 某个帖子下评论列表的筛选条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommentQuery {
    pub post_id: PostId,
    pub rating: RatingRange,
}

impl CommentQuery {
    pub fn matches(&self, comment: &Comment) -> bool {
        comment.post_id == self.post_id && self.rating.contains(comment.rating)
    }
}
