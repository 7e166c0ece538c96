//! 应用层实现。
//!
//! 进程级的实时状态（事件订阅表、匹配队列、匿名会话缓存）集中在 [`hub`]，
//! 围绕领域模型的用例服务在 [`services`]，周期性清理任务在 [`maintenance`]。

pub mod clock;
pub mod error;
pub mod hub;
pub mod maintenance;
pub mod services;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ApplicationError, ApplicationResult};
pub use hub::{
    ChatCacheEntry, ChatSessionCache, Enqueued, EventDispatcher, EventStream, GcReport, Hub,
    MatchmakingQueue, SubscriptionRegistry,
};
pub use services::{
    AnonChatService, AnonChatServiceDependencies, ChatPage, ChatService, ChatServiceDependencies,
    CommentPage, ContentService, ContentServiceDependencies, EnterQueueRequest, EventService,
    EventServiceDependencies, MessagePage, PostPage, QueueOutcome, RateOutcome, RatingService,
    RatingServiceDependencies, PAGE_MAX,
};
