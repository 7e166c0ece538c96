//! 进程级的实时状态：事件订阅表、匿名聊天匹配队列、匿名会话缓存。
//!
//! 三者在启动时构造一次，通过 [`Hub`] 以 `Arc` 共享给各个服务。

pub mod chat_cache;
pub mod dispatcher;
pub mod matchmaking;
pub mod registry;

use std::sync::Arc;

use config::AppConfig;

use crate::clock::Clock;

pub use chat_cache::{ChatCacheEntry, ChatSessionCache};
pub use dispatcher::EventDispatcher;
pub use matchmaking::{Enqueued, MatchmakingQueue};
pub use registry::{EventStream, GcReport, SubscriptionRegistry};

#[derive(Clone)]
pub struct Hub {
    pub registry: Arc<SubscriptionRegistry>,
    pub queue: Arc<MatchmakingQueue>,
    pub chats: Arc<ChatSessionCache>,
}

impl Hub {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Arc::new(SubscriptionRegistry::new(config.events.clone(), clock)),
            queue: Arc::new(MatchmakingQueue::new()),
            chats: Arc::new(ChatSessionCache::new(config.anon_chat.retention())),
        }
    }

    pub fn dispatcher(&self) -> Arc<dyn EventDispatcher> {
        self.registry.clone()
    }
}
