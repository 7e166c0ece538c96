//! 领域模型错误定义
//!
//! 所有领域操作都以类型化错误快速失败，HTTP 层负责把它们翻译成响应。

use thiserror::Error;

/// 对外暴露的错误大类，供调用方（HTTP 层）决定状态码。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Validation,
}

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("profile not found")]
    ProfileNotFound,

    /// 会话不存在，或调用者不是会话参与者
    #[error("chat not found")]
    ChatNotFound,

    #[error("post not found")]
    PostNotFound,

    #[error("comment not found")]
    CommentNotFound,

    /// 在 drain 之前必须先 subscribe
    #[error("profile is not subscribed to events")]
    NotSubscribed,

    #[error("profile is already waiting in the anonymous chat queue")]
    AlreadyQueued,

    #[error("cannot start a conversation with yourself")]
    SelfMatch,

    #[error("cannot rate yourself")]
    SelfRating,

    #[error("cannot rate your own content")]
    OwnContent,

    #[error("no rate credits left")]
    RatesExhausted,

    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProfileNotFound
            | Self::ChatNotFound
            | Self::PostNotFound
            | Self::CommentNotFound
            | Self::NotSubscribed => ErrorKind::NotFound,
            Self::AlreadyQueued | Self::SelfMatch => ErrorKind::Conflict,
            Self::SelfRating | Self::OwnContent | Self::RatesExhausted => ErrorKind::Forbidden,
            Self::InvalidArgument { .. } => ErrorKind::Validation,
        }
    }
}

/// 文档存储协作者的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("document not found")]
    NotFound,
    #[error("document already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
