use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, ProfileId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Personal,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ChatId,
    pub kind: ConversationKind,
    pub name: String,
    pub participants: Vec<ProfileId>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: Timestamp,
    pub preview: Option<String>,
}

impl Conversation {
    pub const ANONYMOUS_NAME: &'static str = "Anonymous";

    pub fn anonymous(id: ChatId, a: ProfileId, b: ProfileId, now: Timestamp) -> Self {
        Self {
            id,
            kind: ConversationKind::Anonymous,
            name: Self::ANONYMOUS_NAME.to_owned(),
            participants: vec![a, b],
            last_update: now,
            preview: None,
        }
    }

    pub fn personal(
        id: ChatId,
        name: impl Into<String>,
        owner: ProfileId,
        receiver: ProfileId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            kind: ConversationKind::Personal,
            name: name.into(),
            participants: vec![owner, receiver],
            last_update: now,
            preview: None,
        }
    }

    pub fn has_participant(&self, profile_id: ProfileId) -> bool {
        self.participants.contains(&profile_id)
    }

    pub fn is_anonymous(&self) -> bool {
        self.kind == ConversationKind::Anonymous
    }

    /// 除 `profile_id` 以外的参与者
    pub fn others(&self, profile_id: ProfileId) -> impl Iterator<Item = ProfileId> + '_ {
        self.participants
            .iter()
            .copied()
            .filter(move |participant| *participant != profile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn others_excludes_caller() {
        let a = ProfileId::generate();
        let b = ProfileId::generate();
        let chat = Conversation::anonymous(ChatId::generate(), a, b, OffsetDateTime::now_utc());

        assert_eq!(chat.others(a).collect::<Vec<_>>(), vec![b]);
        assert!(chat.has_participant(b));
        assert!(!chat.has_participant(ProfileId::generate()));
        assert!(chat.is_anonymous());
    }
}
