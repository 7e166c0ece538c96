use serde::{Deserialize, Serialize};

use crate::rating::{Rating, RatingRange};
use crate::value_objects::{PostId, ProfileId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author: ProfileId,
    pub header: String,
    /// 发布时继承作者当时的评分
    pub rating: Rating,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

/// 帖子列表的筛选条件
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PostQuery {
    /// 只列出该作者的帖子；为空时列出所有作者
    pub author: Option<ProfileId>,
    pub rating: RatingRange,
}

impl PostQuery {
    pub fn matches(&self, post: &Post) -> bool {
        self.author.is_none_or(|author| post.author == author) && self.rating.contains(post.rating)
    }
}
