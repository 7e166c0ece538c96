//! 匿名会话缓存
//!
//! 会话结束后文档会被删除，但双方仍可以在保留期内互相评分或屏蔽，
//! 所以这里记录每个匿名会话的参与者。只有已关闭且超过保留期的条目会被清理。

use std::collections::HashMap;
use std::time::Duration;

use domain::{ChatId, ProfileId, Timestamp};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::clock::elapsed_exceeds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatCacheEntry {
    pub chat_id: ChatId,
    participants: (ProfileId, ProfileId),
    pub closed_at: Option<Timestamp>,
}

impl ChatCacheEntry {
    pub fn participants(&self) -> (ProfileId, ProfileId) {
        self.participants
    }

    pub fn has_participant(&self, profile_id: ProfileId) -> bool {
        self.participants.0 == profile_id || self.participants.1 == profile_id
    }

    /// `profile_id` 的对方；`profile_id` 不是参与者时返回 `None`
    pub fn partner_of(&self, profile_id: ProfileId) -> Option<ProfileId> {
        match self.participants {
            (a, b) if a == profile_id => Some(b),
            (a, b) if b == profile_id => Some(a),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

#[derive(Debug)]
pub struct ChatSessionCache {
    entries: RwLock<HashMap<ChatId, ChatCacheEntry>>,
    retention: Duration,
}

impl ChatSessionCache {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// 登记新会话；已存在的同名条目保持原样
    pub async fn register_open(&self, chat_id: ChatId, participants: (ProfileId, ProfileId)) {
        self.entries
            .write()
            .await
            .entry(chat_id)
            .or_insert(ChatCacheEntry {
                chat_id,
                participants,
                closed_at: None,
            });
        debug!(chat_id = %chat_id, "anonymous chat registered in cache");
    }

    /// 标记会话结束，返回条目是否存在。重复关闭保留第一次的时间。
    pub async fn mark_closed(&self, chat_id: ChatId, now: Timestamp) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&chat_id) {
            Some(entry) => {
                entry.closed_at.get_or_insert(now);
                true
            }
            None => false,
        }
    }

    pub async fn lookup(&self, chat_id: ChatId) -> Option<ChatCacheEntry> {
        self.entries.read().await.get(&chat_id).copied()
    }

    /// 清理关闭时间早于 `now - retention` 的条目，返回清理数量
    pub async fn sweep(&self, now: Timestamp) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| match entry.closed_at {
            Some(closed_at) => !elapsed_exceeds(now, closed_at, self.retention),
            None => true,
        });
        let removed = before - entries.len();
        if removed > 0 {
            info!(removed, remaining = entries.len(), "closed anonymous chats swept");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
