//! 匿名聊天匹配队列
//!
//! 按进入顺序保存等待中的 profile。新条目进入时按顺序扫描，取第一个与之
//! 互相匹配的等待者（first-fit，而不是最合适的那个）。

use domain::{DomainError, ProfileId, WaitingEntry};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// [`MatchmakingQueue::enter`] 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    /// 没有合适的对象，条目已追加到队尾
    Waiting,
    /// 与队列中的这个条目配对，对方已经出队
    Matched(WaitingEntry),
}

#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    waiting: Mutex<Vec<WaitingEntry>>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入队列或立即配对。
    ///
    /// 同一 profile 已在队列中时返回 [`DomainError::AlreadyQueued`]，队列保持不变。
    pub async fn enter(&self, entry: WaitingEntry) -> Result<Enqueued, DomainError> {
        let mut waiting = self.waiting.lock().await;

        if waiting
            .iter()
            .any(|queued| queued.profile_id == entry.profile_id)
        {
            return Err(DomainError::AlreadyQueued);
        }

        match waiting.iter().position(|queued| queued.matches(&entry)) {
            Some(index) => {
                let partner = waiting.remove(index);
                info!(
                    profile_id = %entry.profile_id,
                    partner_id = %partner.profile_id,
                    waiting = waiting.len(),
                    "anonymous chat partners matched"
                );
                Ok(Enqueued::Matched(partner))
            }
            None => {
                info!(
                    profile_id = %entry.profile_id,
                    waiting = waiting.len() + 1,
                    "profile entered anonymous chat queue"
                );
                waiting.push(entry);
                Ok(Enqueued::Waiting)
            }
        }
    }

    /// 把刚出队的条目放回队首，保留它原来的等待顺位。
    ///
    /// 配对后续步骤失败时使用；该 profile 已经重新排队时不做任何事。
    pub async fn requeue_front(&self, entry: WaitingEntry) -> bool {
        let mut waiting = self.waiting.lock().await;
        if waiting
            .iter()
            .any(|queued| queued.profile_id == entry.profile_id)
        {
            debug!(profile_id = %entry.profile_id, "requeue skipped, profile already queued");
            return false;
        }
        info!(
            profile_id = %entry.profile_id,
            waiting = waiting.len() + 1,
            "profile returned to the head of anonymous chat queue"
        );
        waiting.insert(0, entry);
        true
    }

    /// 离开队列；不在队列中时什么也不做
    pub async fn leave(&self, profile_id: ProfileId) -> bool {
        let mut waiting = self.waiting.lock().await;
        let before = waiting.len();
        waiting.retain(|queued| queued.profile_id != profile_id);
        let removed = waiting.len() != before;
        if removed {
            info!(profile_id = %profile_id, "profile left anonymous chat queue");
        } else {
            debug!(profile_id = %profile_id, "leave requested for profile not in queue");
        }
        removed
    }

    pub async fn contains(&self, profile_id: ProfileId) -> bool {
        self.waiting
            .lock()
            .await
            .iter()
            .any(|queued| queued.profile_id == profile_id)
    }

    pub async fn len(&self) -> usize {
        self.waiting.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.waiting.lock().await.is_empty()
    }
}
