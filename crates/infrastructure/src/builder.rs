use std::sync::Arc;

use application::{Clock, Hub, SystemClock};
use config::AppConfig;
use domain::{
    CommentRepository, ConversationRepository, MessageRepository, PostRepository,
    ProfileRepository,
};
use tracing::info;

use crate::repository::MemoryStorage;

/// 进程级依赖：存储、实时状态、时钟。启动时构造一次。
#[derive(Clone)]
pub struct Infrastructure {
    pub storage: Arc<MemoryStorage>,
    pub hub: Hub,
    pub clock: Arc<dyn Clock>,
}

impl Infrastructure {
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let hub = Hub::new(config, clock.clone());
        info!("in-memory storage initialised");

        Self {
            storage,
            hub,
            clock,
        }
    }

    pub fn profile_repository(&self) -> Arc<dyn ProfileRepository> {
        self.storage.profile_repository.clone()
    }

    pub fn conversation_repository(&self) -> Arc<dyn ConversationRepository> {
        self.storage.conversation_repository.clone()
    }

    pub fn message_repository(&self) -> Arc<dyn MessageRepository> {
        self.storage.message_repository.clone()
    }

    pub fn post_repository(&self) -> Arc<dyn PostRepository> {
        self.storage.post_repository.clone()
    }

    pub fn comment_repository(&self) -> Arc<dyn CommentRepository> {
        self.storage.comment_repository.clone()
    }
}
