use serde::{Deserialize, Serialize};

use crate::rating::{Rating, RATES_MAX};
use crate::value_objects::{ProfileId, Timestamp};

/// 用户的一个 profile（与登录账号区分）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    /// 评分，始终在 [-10, 10]
    pub rating: Rating,
    /// 剩余的评分次数，始终在 [0, 10]
    pub rates: u32,
    /// 匿名聊天中屏蔽的对象
    pub blocked_chats: Vec<ProfileId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl Profile {
    pub fn new(id: ProfileId, name: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            rating: Rating::default(),
            rates: RATES_MAX,
            blocked_chats: Vec::new(),
            created_at: now,
        }
    }

    pub fn has_blocked(&self, other: ProfileId) -> bool {
        self.blocked_chats.contains(&other)
    }

    pub fn can_rate(&self) -> bool {
        self.rates > 0
    }
}
