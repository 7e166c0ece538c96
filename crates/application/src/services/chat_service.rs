use std::sync::Arc;

use domain::{
    ChatId, Conversation, ConversationKind, ConversationRepository, DomainError, Event, Message,
    MessageRepository, MessageText, ProfileId, ProfileRepository,
};
use tracing::info;

use super::{require_profile, validate_page};
use crate::{clock::Clock, error::ApplicationResult, hub::EventDispatcher};

#[derive(Debug, Clone, PartialEq)]
pub struct ChatPage {
    /// 调用者参与的会话总数
    pub count: u64,
    pub chats: Vec<Conversation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessagePage {
    pub count: u64,
    /// 匿名会话中调用方不应看到对方的 id
    pub anonymous: bool,
    pub messages: Vec<Message>,
}

pub struct ChatServiceDependencies {
    pub profile_repository: Arc<dyn ProfileRepository>,
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub dispatcher: Arc<dyn EventDispatcher>,
    pub clock: Arc<dyn Clock>,
}

/// 会话与消息
pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 发送消息并推送给会话中的其他参与者。匿名会话中不暴露发送者。
    pub async fn send_message(
        &self,
        profile_id: ProfileId,
        chat_id: ChatId,
        text: String,
    ) -> ApplicationResult<Message> {
        let text = MessageText::new(text)?;
        let now = self.deps.clock.now();

        let conversation = self
            .deps
            .conversation_repository
            .touch(chat_id, profile_id, text.preview(), now)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        let message = Message::new(chat_id, profile_id, text, now);
        self.deps.message_repository.insert(message.clone()).await?;

        let recipients: Vec<ProfileId> = conversation.others(profile_id).collect();
        self.deps.dispatcher.dispatch_to_all(
            &recipients,
            Event::message(&message, conversation.is_anonymous()),
        );

        Ok(message)
    }

    pub async fn load_chats(
        &self,
        profile_id: ProfileId,
        count: u64,
        offset: u64,
    ) -> ApplicationResult<ChatPage> {
        validate_page(count)?;
        let total = self
            .deps
            .conversation_repository
            .count_for_participant(profile_id)
            .await?;
        let chats = self
            .deps
            .conversation_repository
            .list_for_participant(profile_id, offset, count)
            .await?;
        Ok(ChatPage {
            count: total,
            chats,
        })
    }

    pub async fn load_messages(
        &self,
        profile_id: ProfileId,
        chat_id: ChatId,
        count: u64,
        offset: u64,
    ) -> ApplicationResult<MessagePage> {
        validate_page(count)?;
        let conversation = self
            .deps
            .conversation_repository
            .find_for_participant(chat_id, profile_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        let total = self.deps.message_repository.count_in_chat(chat_id).await?;
        let messages = self
            .deps
            .message_repository
            .list_in_chat(chat_id, offset, count)
            .await?;
        Ok(MessagePage {
            count: total,
            anonymous: conversation.is_anonymous(),
            messages,
        })
    }

    /// 与另一个 profile 建立私聊，会话以对方的名字命名
    pub async fn create_personal_chat(
        &self,
        profile_id: ProfileId,
        receiver_id: ProfileId,
    ) -> ApplicationResult<ChatId> {
        if profile_id == receiver_id {
            return Err(DomainError::SelfMatch.into());
        }
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        let receiver = require_profile(self.deps.profile_repository.as_ref(), receiver_id).await?;

        let conversation = Conversation::personal(
            ChatId::generate(),
            receiver.name,
            profile_id,
            receiver_id,
            self.deps.clock.now(),
        );
        let chat_id = self
            .deps
            .conversation_repository
            .insert(conversation)
            .await?;

        info!(chat_id = %chat_id, profile_id = %profile_id, receiver_id = %receiver_id, "personal chat created");
        Ok(chat_id)
    }

    /// 删除私聊及其全部消息；匿名会话只能通过 leave-chat 结束
    pub async fn delete_personal_chat(
        &self,
        profile_id: ProfileId,
        chat_id: ChatId,
    ) -> ApplicationResult<()> {
        self.deps
            .conversation_repository
            .delete_for_participant(chat_id, profile_id, ConversationKind::Personal)
            .await?
            .ok_or(DomainError::ChatNotFound)?;
        let removed = self.deps.message_repository.delete_in_chat(chat_id).await?;

        info!(chat_id = %chat_id, profile_id = %profile_id, messages = removed, "personal chat deleted");
        Ok(())
    }
}
