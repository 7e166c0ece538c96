use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, MessageId, MessageText, ProfileId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: ProfileId,
    pub text: MessageText,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(chat_id: ChatId, sender_id: ProfileId, text: MessageText, now: Timestamp) -> Self {
        Self {
            id: MessageId::generate(),
            chat_id,
            sender_id,
            text,
            created_at: now,
        }
    }
}
