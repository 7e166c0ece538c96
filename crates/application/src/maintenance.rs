//! 后台维护任务：事件订阅 GC、匿名会话缓存清理、评分次数补充。
//!
//! 每个任务按固定间隔运行，单次失败只记录日志，不会让任务退出。
//! 任务在 `shutdown` 被取消时结束。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use config::AppConfig;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{clock::Clock, hub::Hub, services::RatingService};

pub fn spawn(
    hub: &Hub,
    ratings: Arc<RatingService>,
    clock: Arc<dyn Clock>,
    config: &AppConfig,
    shutdown: CancellationToken,
) -> JoinSet<()> {
    let mut tasks = JoinSet::new();

    let registry = hub.registry.clone();
    let gc_clock = clock.clone();
    every(
        &mut tasks,
        "event-gc",
        config.events.gc_interval(),
        shutdown.clone(),
        move || {
            registry.gc(gc_clock.now());
            std::future::ready(())
        },
    );

    let chats = hub.chats.clone();
    every(
        &mut tasks,
        "chat-cache-sweep",
        config.anon_chat.sweep_interval(),
        shutdown.clone(),
        move || {
            let chats = chats.clone();
            let now = clock.now();
            async move {
                chats.sweep(now).await;
            }
        },
    );

    every(
        &mut tasks,
        "rate-replenish",
        config.rating.replenish_interval(),
        shutdown,
        move || {
            let ratings = ratings.clone();
            async move {
                if let Err(err) = ratings.replenish_rates().await {
                    warn!(error = %err, "rate replenishment failed");
                }
            }
        },
    );

    tasks
}

fn every<F, Fut>(
    tasks: &mut JoinSet<()>,
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tasks.spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即完成，跳过它
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => tick().await,
            }
        }
        debug!(task = name, "maintenance task stopped");
    });
}
