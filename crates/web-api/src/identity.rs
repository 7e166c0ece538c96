//! 调用者身份
//!
//! 认证由上游网关完成，网关把当前激活的 profile id 写入 `X-Profile-Id` 请求头。

use axum::{extract::FromRequestParts, http::request::Parts};
use domain::ProfileId;

use crate::error::ApiError;

pub const PROFILE_HEADER: &str = "x-profile-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentProfile(pub ProfileId);

impl<S> FromRequestParts<S> for CurrentProfile
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(PROFILE_HEADER)
            .ok_or_else(|| ApiError::unauthorized("missing X-Profile-Id header"))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<ProfileId>().ok())
            .map(CurrentProfile)
            .ok_or_else(|| ApiError::unauthorized("invalid X-Profile-Id header"))
    }
}
