//! 推送给在线客户端的事件
//!
//! 序列化后的 JSON 即是 SSE `data:` 帧和长轮询响应中的元素。

use serde::{Deserialize, Serialize};

use crate::entities::Message;
use crate::value_objects::{ChatId, MessageId, ProfileId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Message {
        id: MessageId,
        /// 匿名会话中为 `None`
        sender_id: Option<ProfileId>,
        chat_id: ChatId,
        text: String,
        #[serde(with = "time::serde::rfc3339")]
        created_at: Timestamp,
    },
    #[serde(rename_all = "camelCase")]
    AnonChatEnter { chat_id: ChatId },
    #[serde(rename_all = "camelCase")]
    AnonChatFinished { chat_id: ChatId },
}

impl Event {
    pub fn message(message: &Message, mask_sender: bool) -> Self {
        Event::Message {
            id: message.id,
            sender_id: (!mask_sender).then_some(message.sender_id),
            chat_id: message.chat_id,
            text: message.text.as_str().to_owned(),
            created_at: message.created_at,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Event::Message { chat_id, .. }
            | Event::AnonChatEnter { chat_id }
            | Event::AnonChatFinished { chat_id } => *chat_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Message { .. } => "message",
            Event::AnonChatEnter { .. } => "anon-chat-enter",
            Event::AnonChatFinished { .. } => "anon-chat-finished",
        }
    }
}
