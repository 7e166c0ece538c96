//! 匿名聊天用例：排队、结束会话、会话后的评分与屏蔽。

use std::sync::Arc;

use config::RatingConfig;
use domain::{
    anon_chat::AGE_MAX,
    rating::profile_adjustment,
    ChatId, Conversation, ConversationKind, ConversationRepository, DomainError, Event, Filter,
    Gender, MessageRepository, ProfileId, ProfileRepository, RatingContext, Vote, WaitingEntry,
};
use tracing::{info, warn};

use super::{rates_exhausted, require_profile, RateOutcome};
use crate::{
    clock::Clock,
    error::ApplicationResult,
    hub::{ChatCacheEntry, ChatSessionCache, Enqueued, EventDispatcher, MatchmakingQueue},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnterQueueRequest {
    pub gender: Gender,
    pub age: Option<u8>,
    pub filter: Filter,
}

/// 排队的结果，告诉调用者是否已经有了会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    Queued,
    Matched(ChatId),
}

pub struct AnonChatServiceDependencies {
    pub profile_repository: Arc<dyn ProfileRepository>,
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub queue: Arc<MatchmakingQueue>,
    pub chats: Arc<ChatSessionCache>,
    pub dispatcher: Arc<dyn EventDispatcher>,
    pub clock: Arc<dyn Clock>,
    pub rating: RatingConfig,
}

pub struct AnonChatService {
    deps: AnonChatServiceDependencies,
}

impl AnonChatService {
    pub fn new(deps: AnonChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 进入匹配队列。找到对象时立即创建会话，并向双方推送 `anon-chat-enter`。
    pub async fn enter_queue(
        &self,
        profile_id: ProfileId,
        request: EnterQueueRequest,
    ) -> ApplicationResult<QueueOutcome> {
        request.filter.validate()?;
        if request.age.is_some_and(|age| age > AGE_MAX) {
            return Err(DomainError::invalid_argument("age", "out of range").into());
        }

        let profile = require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        let entry = WaitingEntry {
            profile_id,
            gender: request.gender,
            age: request.age,
            rating: profile.rating,
            blocked_partners: profile.blocked_chats.iter().copied().collect(),
            filter: request.filter,
        };

        match self.deps.queue.enter(entry).await? {
            Enqueued::Waiting => Ok(QueueOutcome::Queued),
            Enqueued::Matched(partner) => {
                let chat_id = self.open_chat(partner, profile_id).await?;
                Ok(QueueOutcome::Matched(chat_id))
            }
        }
    }

    /// 为刚配对的双方创建会话。创建失败时把等待者放回队首，新来的一方不入队。
    async fn open_chat(&self, partner: WaitingEntry, newcomer: ProfileId) -> ApplicationResult<ChatId> {
        let waiting = partner.profile_id;
        let conversation =
            Conversation::anonymous(ChatId::generate(), waiting, newcomer, self.deps.clock.now());
        let chat_id = match self.deps.conversation_repository.insert(conversation).await {
            Ok(chat_id) => chat_id,
            Err(err) => {
                warn!(profile_id = %newcomer, partner_id = %waiting, error = %err, "failed to create anonymous chat");
                self.deps.queue.requeue_front(partner).await;
                return Err(err.into());
            }
        };

        self.deps.chats.register_open(chat_id, (waiting, newcomer)).await;
        self.deps
            .dispatcher
            .dispatch_to_all(&[waiting, newcomer], Event::AnonChatEnter { chat_id });

        info!(chat_id = %chat_id, "anonymous chat started");
        Ok(chat_id)
    }

    pub async fn leave_queue(&self, profile_id: ProfileId) -> ApplicationResult<()> {
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        self.deps.queue.leave(profile_id).await;
        Ok(())
    }

    /// 结束匿名会话：删除会话，通知对方，缓存条目进入保留期，最后清理消息
    pub async fn leave_chat(&self, profile_id: ProfileId, chat_id: ChatId) -> ApplicationResult<()> {
        let conversation = self
            .deps
            .conversation_repository
            .delete_for_participant(chat_id, profile_id, ConversationKind::Anonymous)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        // 会话一旦删除就已经结束，之后的失败不能影响通知和缓存
        let recipients: Vec<ProfileId> = conversation.others(profile_id).collect();
        self.deps
            .dispatcher
            .dispatch_to_all(&recipients, Event::AnonChatFinished { chat_id });
        self.deps.chats.mark_closed(chat_id, self.deps.clock.now()).await;

        let removed = match self.deps.message_repository.delete_in_chat(chat_id).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(chat_id = %chat_id, error = %err, "failed to delete messages of finished anonymous chat");
                return Err(err.into());
            }
        };

        info!(chat_id = %chat_id, profile_id = %profile_id, messages = removed, "anonymous chat finished");
        Ok(())
    }

    /// 给匿名会话的对方评分；会话结束后在保留期内仍然有效
    pub async fn rate_user(
        &self,
        profile_id: ProfileId,
        chat_id: ChatId,
        vote: Vote,
    ) -> ApplicationResult<RateOutcome> {
        let target = self.partner_in(profile_id, chat_id).await?;
        if target == profile_id {
            return Err(DomainError::SelfRating.into());
        }

        let rater = require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        if !rater.can_rate() {
            return rates_exhausted(&self.deps.rating, profile_id);
        }

        let delta = profile_adjustment(rater.rating, vote, RatingContext::ChatPartner);
        self.deps
            .profile_repository
            .adjust_rating(target, delta)
            .await?
            .ok_or(DomainError::ProfileNotFound)?;
        self.deps.profile_repository.consume_rate(profile_id).await?;

        info!(chat_id = %chat_id, profile_id = %profile_id, ?vote, delta, "chat partner rated");
        Ok(RateOutcome::Applied)
    }

    /// 屏蔽匿名会话的对方，之后的匹配不会再遇到对方
    pub async fn block_user(&self, profile_id: ProfileId, chat_id: ChatId) -> ApplicationResult<()> {
        let partner = self.partner_in(profile_id, chat_id).await?;
        self.deps
            .profile_repository
            .block_partner(profile_id, partner)
            .await?;

        info!(chat_id = %chat_id, profile_id = %profile_id, "chat partner blocked");
        Ok(())
    }

    async fn partner_in(&self, profile_id: ProfileId, chat_id: ChatId) -> ApplicationResult<ProfileId> {
        let entry: ChatCacheEntry = self
            .deps
            .chats
            .lookup(chat_id)
            .await
            .ok_or(DomainError::ChatNotFound)?;
        Ok(entry
            .partner_of(profile_id)
            .ok_or(DomainError::ChatNotFound)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ApplicationError;
    use domain::{
        MockConversationRepository, MockMessageRepository, MockProfileRepository, Profile, Rating,
        RepositoryError,
    };
    use mockall::predicate::{always, eq};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(ProfileId, Event)>>,
    }

    impl EventDispatcher for RecordingDispatcher {
        fn dispatch(&self, recipient: ProfileId, event: Event) {
            self.sent.lock().unwrap().push((recipient, event));
        }
    }

    struct Fixture {
        profiles: MockProfileRepository,
        conversations: MockConversationRepository,
        messages: MockMessageRepository,
        queue: Arc<MatchmakingQueue>,
        chats: Arc<ChatSessionCache>,
        dispatcher: Arc<RecordingDispatcher>,
        clock: Arc<ManualClock>,
        rating: RatingConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                profiles: MockProfileRepository::new(),
                conversations: MockConversationRepository::new(),
                messages: MockMessageRepository::new(),
                queue: Arc::new(MatchmakingQueue::new()),
                chats: Arc::new(ChatSessionCache::new(Duration::from_secs(600))),
                dispatcher: Arc::new(RecordingDispatcher::default()),
                clock: Arc::new(ManualClock::default()),
                rating: RatingConfig::default(),
            }
        }

        fn with_profile(&mut self, profile: Profile) {
            let id = profile.id;
            self.profiles
                .expect_find_by_id()
                .with(eq(id))
                .returning(move |_| Ok(Some(profile.clone())));
        }

        fn service(self) -> AnonChatService {
            AnonChatService::new(AnonChatServiceDependencies {
                profile_repository: Arc::new(self.profiles),
                conversation_repository: Arc::new(self.conversations),
                message_repository: Arc::new(self.messages),
                queue: self.queue,
                chats: self.chats,
                dispatcher: self.dispatcher,
                clock: self.clock,
                rating: self.rating,
            })
        }
    }

    fn profile(fixture: &Fixture) -> Profile {
        Profile::new(ProfileId::generate(), "someone", fixture.clock.now())
    }

    fn request(gender: Gender, filter: Filter) -> EnterQueueRequest {
        EnterQueueRequest {
            gender,
            age: None,
            filter,
        }
    }

    #[tokio::test]
    async fn matching_pair_receives_same_chat() {
        let mut fixture = Fixture::new();
        let (a, b) = (profile(&fixture), profile(&fixture));
        let (a_id, b_id) = (a.id, b.id);
        fixture.with_profile(a);
        fixture.with_profile(b);
        fixture
            .conversations
            .expect_insert()
            .times(1)
            .returning(|chat| Ok(chat.id));

        let dispatcher = fixture.dispatcher.clone();
        let chats = fixture.chats.clone();
        let queue = fixture.queue.clone();
        let service = fixture.service();

        let first = service
            .enter_queue(a_id, request(Gender::Female, Filter::default()))
            .await
            .unwrap();
        assert_eq!(first, QueueOutcome::Queued);

        let wants_female = Filter {
            gender: Some(Gender::Female),
            ..Filter::default()
        };
        let QueueOutcome::Matched(chat_id) = service
            .enter_queue(b_id, request(Gender::Male, wants_female))
            .await
            .unwrap()
        else {
            panic!("expected a match");
        };

        assert!(queue.is_empty().await);
        assert_eq!(chats.lookup(chat_id).await.unwrap().partner_of(a_id), Some(b_id));
        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                (a_id, Event::AnonChatEnter { chat_id }),
                (b_id, Event::AnonChatEnter { chat_id }),
            ]
        );
    }

    #[tokio::test]
    async fn failed_chat_creation_keeps_waiting_partner_queued() {
        let mut fixture = Fixture::new();
        let (a, b) = (profile(&fixture), profile(&fixture));
        let (a_id, b_id) = (a.id, b.id);
        fixture.with_profile(a);
        fixture.with_profile(b);
        fixture
            .conversations
            .expect_insert()
            .times(1)
            .returning(|_| Err(RepositoryError::storage("database unavailable")));

        let dispatcher = fixture.dispatcher.clone();
        let queue = fixture.queue.clone();
        let service = fixture.service();

        service
            .enter_queue(a_id, request(Gender::Female, Filter::default()))
            .await
            .unwrap();
        let result = service
            .enter_queue(b_id, request(Gender::Male, Filter::default()))
            .await;

        assert!(matches!(result, Err(ApplicationError::Repository(_))));
        assert!(queue.contains(a_id).await);
        assert!(!queue.contains(b_id).await);
        assert_eq!(queue.len().await, 1);
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocked_partners_come_from_profile() {
        let mut fixture = Fixture::new();
        let a = profile(&fixture);
        let mut b = profile(&fixture);
        b.blocked_chats.push(a.id);
        let (a_id, b_id) = (a.id, b.id);
        fixture.with_profile(a);
        fixture.with_profile(b);
        fixture.conversations.expect_insert().never();

        let service = fixture.service();
        service
            .enter_queue(a_id, request(Gender::Female, Filter::default()))
            .await
            .unwrap();
        let outcome = service
            .enter_queue(b_id, request(Gender::Male, Filter::default()))
            .await
            .unwrap();
        assert_eq!(outcome, QueueOutcome::Queued);
    }

    #[tokio::test]
    async fn invalid_filter_is_rejected() {
        let fixture = Fixture::new();
        let service = fixture.service();
        let filter = Filter {
            min_rating: Some(11.0),
            ..Filter::default()
        };
        let result = service
            .enter_queue(ProfileId::generate(), request(Gender::Male, filter))
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
        ));
    }

    #[tokio::test]
    async fn leave_chat_notifies_the_other_participant() {
        let mut fixture = Fixture::new();
        let (leaver, partner) = (ProfileId::generate(), ProfileId::generate());
        let chat = Conversation::anonymous(ChatId::generate(), leaver, partner, fixture.clock.now());
        let chat_id = chat.id;
        fixture.chats.register_open(chat_id, (leaver, partner)).await;

        fixture
            .conversations
            .expect_delete_for_participant()
            .with(eq(chat_id), eq(leaver), eq(ConversationKind::Anonymous))
            .returning(move |_, _, _| Ok(Some(chat.clone())));
        fixture
            .messages
            .expect_delete_in_chat()
            .with(eq(chat_id))
            .times(1)
            .returning(|_| Ok(2));

        let dispatcher = fixture.dispatcher.clone();
        let chats = fixture.chats.clone();
        let service = fixture.service();
        service.leave_chat(leaver, chat_id).await.unwrap();

        assert_eq!(
            *dispatcher.sent.lock().unwrap(),
            vec![(partner, Event::AnonChatFinished { chat_id })]
        );
        assert!(!chats.lookup(chat_id).await.unwrap().is_open());
    }

    #[tokio::test]
    async fn message_cleanup_failure_still_finishes_chat() {
        let mut fixture = Fixture::new();
        let (leaver, partner) = (ProfileId::generate(), ProfileId::generate());
        let chat = Conversation::anonymous(ChatId::generate(), leaver, partner, fixture.clock.now());
        let chat_id = chat.id;
        fixture.chats.register_open(chat_id, (leaver, partner)).await;

        fixture
            .conversations
            .expect_delete_for_participant()
            .returning(move |_, _, _| Ok(Some(chat.clone())));
        fixture
            .messages
            .expect_delete_in_chat()
            .times(1)
            .returning(|_| Err(RepositoryError::storage("database unavailable")));

        let dispatcher = fixture.dispatcher.clone();
        let chats = fixture.chats.clone();
        let service = fixture.service();
        let result = service.leave_chat(leaver, chat_id).await;

        assert!(matches!(result, Err(ApplicationError::Repository(_))));
        assert_eq!(
            *dispatcher.sent.lock().unwrap(),
            vec![(partner, Event::AnonChatFinished { chat_id })]
        );
        assert!(!chats.lookup(chat_id).await.unwrap().is_open());
    }

    #[tokio::test]
    async fn leaving_queue_requires_existing_profile() {
        let mut fixture = Fixture::new();
        let stranger = ProfileId::generate();
        fixture
            .profiles
            .expect_find_by_id()
            .with(eq(stranger))
            .returning(|_| Ok(None));
        let known = profile(&fixture);
        let known_id = known.id;
        fixture.with_profile(known);

        let queue = fixture.queue.clone();
        let service = fixture.service();
        assert!(matches!(
            service.leave_queue(stranger).await,
            Err(ApplicationError::Domain(DomainError::ProfileNotFound))
        ));

        service
            .enter_queue(known_id, request(Gender::Male, Filter::default()))
            .await
            .unwrap();
        service.leave_queue(known_id).await.unwrap();
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn leaving_unknown_chat_is_not_found() {
        let mut fixture = Fixture::new();
        fixture
            .conversations
            .expect_delete_for_participant()
            .returning(|_, _, _| Ok(None));
        fixture.messages.expect_delete_in_chat().never();

        let service = fixture.service();
        let result = service
            .leave_chat(ProfileId::generate(), ChatId::generate())
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::ChatNotFound))
        ));
    }

    #[tokio::test]
    async fn rating_partner_applies_weighted_adjustment() {
        let mut fixture = Fixture::new();
        let mut rater = profile(&fixture);
        rater.rating = Rating::new(10.0);
        let (rater_id, partner_id) = (rater.id, ProfileId::generate());
        let chat_id = ChatId::generate();
        fixture.chats.register_open(chat_id, (rater_id, partner_id)).await;
        fixture.with_profile(rater.clone());

        fixture
            .profiles
            .expect_adjust_rating()
            .withf(move |id, delta| *id == partner_id && (*delta + 0.1).abs() < 1e-9)
            .times(1)
            .returning(move |id, _| Ok(Some(Profile::new(id, "partner", time::OffsetDateTime::now_utc()))));
        fixture
            .profiles
            .expect_consume_rate()
            .with(eq(rater_id))
            .times(1)
            .returning(move |_| Ok(Some(rater.clone())));

        let service = fixture.service();
        let outcome = service.rate_user(rater_id, chat_id, Vote::Down).await.unwrap();
        assert_eq!(outcome, RateOutcome::Applied);
    }

    #[tokio::test]
    async fn rating_without_credits_is_skipped() {
        let mut fixture = Fixture::new();
        let mut rater = profile(&fixture);
        rater.rates = 0;
        let rater_id = rater.id;
        let chat_id = ChatId::generate();
        fixture.chats.register_open(chat_id, (rater_id, ProfileId::generate())).await;
        fixture.with_profile(rater);
        fixture.profiles.expect_adjust_rating().never();
        fixture.profiles.expect_consume_rate().never();

        let service = fixture.service();
        let outcome = service.rate_user(rater_id, chat_id, Vote::Up).await.unwrap();
        assert_eq!(outcome, RateOutcome::Skipped);
    }

    #[tokio::test]
    async fn rating_without_credits_can_be_rejected() {
        let mut fixture = Fixture::new();
        fixture.rating.reject_when_exhausted = true;
        let mut rater = profile(&fixture);
        rater.rates = 0;
        let rater_id = rater.id;
        let chat_id = ChatId::generate();
        fixture.chats.register_open(chat_id, (rater_id, ProfileId::generate())).await;
        fixture.with_profile(rater);

        let service = fixture.service();
        let result = service.rate_user(rater_id, chat_id, Vote::Up).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::RatesExhausted))
        ));
    }

    #[tokio::test]
    async fn rating_yourself_is_forbidden() {
        let fixture = Fixture::new();
        let profile_id = ProfileId::generate();
        let chat_id = ChatId::generate();
        fixture.chats.register_open(chat_id, (profile_id, profile_id)).await;

        let service = fixture.service();
        let result = service.rate_user(profile_id, chat_id, Vote::Up).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::SelfRating))
        ));
    }

    #[tokio::test]
    async fn outsiders_cannot_rate_or_block() {
        let fixture = Fixture::new();
        let chat_id = ChatId::generate();
        fixture
            .chats
            .register_open(chat_id, (ProfileId::generate(), ProfileId::generate()))
            .await;

        let service = fixture.service();
        let outsider = ProfileId::generate();
        assert!(matches!(
            service.rate_user(outsider, chat_id, Vote::Up).await,
            Err(ApplicationError::Domain(DomainError::ChatNotFound))
        ));
        assert!(matches!(
            service.block_user(outsider, ChatId::generate()).await,
            Err(ApplicationError::Domain(DomainError::ChatNotFound))
        ));
    }

    #[tokio::test]
    async fn block_records_partner_after_chat_closed() {
        let mut fixture = Fixture::new();
        let (profile_id, partner_id) = (ProfileId::generate(), ProfileId::generate());
        let chat_id = ChatId::generate();
        fixture.chats.register_open(chat_id, (partner_id, profile_id)).await;
        fixture.chats.mark_closed(chat_id, fixture.clock.now()).await;

        fixture
            .profiles
            .expect_block_partner()
            .with(eq(profile_id), eq(partner_id))
            .times(1)
            .returning(|_, _| Ok(()));
        fixture.profiles.expect_find_by_id().with(always()).never();

        let service = fixture.service();
        service.block_user(profile_id, chat_id).await.unwrap();
    }
}
