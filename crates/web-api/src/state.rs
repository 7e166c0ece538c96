use std::sync::Arc;

use application::{
    AnonChatService, AnonChatServiceDependencies, ChatService, ChatServiceDependencies,
    ContentService, ContentServiceDependencies, EventService, EventServiceDependencies,
    RatingService, RatingServiceDependencies,
};
use config::AppConfig;
use infrastructure::Infrastructure;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub content_service: Arc<ContentService>,
    pub chat_service: Arc<ChatService>,
    pub anon_chat_service: Arc<AnonChatService>,
    pub event_service: Arc<EventService>,
    pub rating_service: Arc<RatingService>,
    pub config: Arc<AppConfig>,
    /// 关闭时取消，挂起的长轮询随之返回
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(infra: &Infrastructure, config: AppConfig, shutdown: CancellationToken) -> Self {
        let dispatcher = infra.hub.dispatcher();

        let content_service = ContentService::new(ContentServiceDependencies {
            profile_repository: infra.profile_repository(),
            post_repository: infra.post_repository(),
            comment_repository: infra.comment_repository(),
            clock: infra.clock.clone(),
        });

        let chat_service = ChatService::new(ChatServiceDependencies {
            profile_repository: infra.profile_repository(),
            conversation_repository: infra.conversation_repository(),
            message_repository: infra.message_repository(),
            dispatcher: dispatcher.clone(),
            clock: infra.clock.clone(),
        });

        let anon_chat_service = AnonChatService::new(AnonChatServiceDependencies {
            profile_repository: infra.profile_repository(),
            conversation_repository: infra.conversation_repository(),
            message_repository: infra.message_repository(),
            queue: infra.hub.queue.clone(),
            chats: infra.hub.chats.clone(),
            dispatcher,
            clock: infra.clock.clone(),
            rating: config.rating.clone(),
        });

        let event_service = EventService::new(EventServiceDependencies {
            profile_repository: infra.profile_repository(),
            registry: infra.hub.registry.clone(),
            config: config.events.clone(),
        });

        let rating_service = RatingService::new(RatingServiceDependencies {
            profile_repository: infra.profile_repository(),
            post_repository: infra.post_repository(),
            comment_repository: infra.comment_repository(),
            config: config.rating.clone(),
        });

        Self {
            content_service: Arc::new(content_service),
            chat_service: Arc::new(chat_service),
            anon_chat_service: Arc::new(anon_chat_service),
            event_service: Arc::new(event_service),
            rating_service: Arc::new(rating_service),
            config: Arc::new(config),
            shutdown,
        }
    }
}
