use std::sync::Arc;

use config::EventsConfig;
use domain::{Event, ProfileId, ProfileRepository};
use tokio_util::sync::CancellationToken;

use super::require_profile;
use crate::{
    error::ApplicationResult,
    hub::{EventStream, SubscriptionRegistry},
};

pub struct EventServiceDependencies {
    pub profile_repository: Arc<dyn ProfileRepository>,
    pub registry: Arc<SubscriptionRegistry>,
    pub config: EventsConfig,
}

/// 客户端接收事件的入口：长轮询（subscribe + drain）或推送流
pub struct EventService {
    deps: EventServiceDependencies,
}

impl EventService {
    pub fn new(deps: EventServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn subscribe(&self, profile_id: ProfileId) -> ApplicationResult<()> {
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        self.deps.registry.subscribe(profile_id);
        Ok(())
    }

    /// 等待并取走缓冲的事件；客户端断开时由调用方触发 `cancel`
    pub async fn drain(
        &self,
        profile_id: ProfileId,
        cancel: &CancellationToken,
    ) -> ApplicationResult<Vec<Event>> {
        Ok(self
            .deps
            .registry
            .drain(profile_id, self.deps.config.drain_timeout(), cancel)
            .await?)
    }

    pub async fn stream(&self, profile_id: ProfileId) -> ApplicationResult<EventStream> {
        require_profile(self.deps.profile_repository.as_ref(), profile_id).await?;
        Ok(self.deps.registry.listen(profile_id))
    }
}
