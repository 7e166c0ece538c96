//! 订阅表
//!
//! 每个 profile 有两种接收事件的方式：
//! - 推送：SSE 等长连接通过 [`SubscriptionRegistry::listen`] 注册监听者，
//!   事件直接写入其有界通道，连接断开（[`EventStream`] 被 drop）时监听者被移除，
//!   通道积压超过 `max_pending` 的慢连接同样被移除；
//! - 拉取：[`SubscriptionRegistry::subscribe`] 之后事件缓冲在 `pending` 中，
//!   客户端反复调用 [`SubscriptionRegistry::drain`] 取走。
//!
//! 同一 profile 内事件按派发顺序投递，不同 profile 之间没有顺序保证。

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use config::EventsConfig;
use domain::{DomainError, Event, ProfileId, Timestamp};
use futures_util::Stream;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Notify,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::EventDispatcher;
use crate::clock::{elapsed_exceeds, Clock};

struct Subscription {
    pending: VecDeque<Event>,
    last_activity: Timestamp,
    wake: Arc<Notify>,
}

impl Subscription {
    fn new(now: Timestamp) -> Self {
        Self {
            pending: VecDeque::new(),
            last_activity: now,
            wake: Arc::new(Notify::new()),
        }
    }

    fn take(&mut self, now: Timestamp) -> Vec<Event> {
        self.last_activity = now;
        self.pending.drain(..).collect()
    }
}

struct Listener {
    id: u64,
    sender: mpsc::Sender<Event>,
}

#[derive(Default)]
struct RegistryState {
    subscriptions: HashMap<ProfileId, Subscription>,
    listeners: HashMap<ProfileId, Vec<Listener>>,
    next_listener_id: u64,
}

impl RegistryState {
    fn remove_listener(&mut self, profile_id: ProfileId, id: u64) {
        if let Some(listeners) = self.listeners.get_mut(&profile_id) {
            listeners.retain(|listener| listener.id != id);
            if listeners.is_empty() {
                self.listeners.remove(&profile_id);
            }
        }
    }
}

// 监听者在 Drop 中同步注销，所以这里用标准库的 Mutex；临界区内没有 await。
fn lock(state: &Mutex<RegistryState>) -> MutexGuard<'_, RegistryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 一次 GC 的结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcReport {
    /// 因长时间未读取而移除的订阅
    pub removed: usize,
    /// 因超出缓冲上限而丢弃的旧事件
    pub truncated: usize,
    /// 已断开但尚未注销的监听者
    pub closed_listeners: usize,
}

pub struct SubscriptionRegistry {
    state: Arc<Mutex<RegistryState>>,
    clock: Arc<dyn Clock>,
    config: EventsConfig,
}

impl SubscriptionRegistry {
    pub fn new(config: EventsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            clock,
            config,
        }
    }

    /// 创建或替换 profile 的拉取订阅，旧缓冲被丢弃
    pub fn subscribe(&self, profile_id: ProfileId) {
        let now = self.clock.now();
        let previous = lock(&self.state)
            .subscriptions
            .insert(profile_id, Subscription::new(now));

        if let Some(previous) = previous {
            // 挂起在旧订阅上的 drain 醒来后会读取新的订阅
            previous.wake.notify_waiters();
        }
        debug!(profile_id = %profile_id, "profile subscribed to events");
    }

    pub fn is_subscribed(&self, profile_id: ProfileId) -> bool {
        lock(&self.state).subscriptions.contains_key(&profile_id)
    }

    pub fn subscription_count(&self) -> usize {
        lock(&self.state).subscriptions.len()
    }

    pub fn pending_len(&self, profile_id: ProfileId) -> usize {
        lock(&self.state)
            .subscriptions
            .get(&profile_id)
            .map_or(0, |subscription| subscription.pending.len())
    }

    pub fn listener_count(&self, profile_id: ProfileId) -> usize {
        lock(&self.state)
            .listeners
            .get(&profile_id)
            .map_or(0, Vec::len)
    }

    /// 把事件交给 profile 的所有监听者和拉取订阅。
    ///
    /// 返回是否至少有一个接收方；没有接收方时事件被静默丢弃。
    pub fn emit(&self, profile_id: ProfileId, event: Event) -> bool {
        let name = event.name();
        let mut state = lock(&self.state);
        let mut delivered = false;

        let mut listeners_gone = false;
        if let Some(listeners) = state.listeners.get_mut(&profile_id) {
            listeners.retain(|listener| match listener.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    // 丢掉发送端后流在读完积压的事件后结束，客户端需要重连
                    warn!(profile_id = %profile_id, listener_id = listener.id, "event listener lagging, detached");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            });
            delivered |= !listeners.is_empty();
            listeners_gone = listeners.is_empty();
        }
        if listeners_gone {
            state.listeners.remove(&profile_id);
        }

        if let Some(subscription) = state.subscriptions.get_mut(&profile_id) {
            subscription.pending.push_back(event);
            subscription.wake.notify_one();
            delivered = true;
        }

        if delivered {
            debug!(profile_id = %profile_id, event = name, "event emitted");
        } else {
            debug!(profile_id = %profile_id, event = name, "no subscriber, event dropped");
        }
        delivered
    }

    /// 取走 profile 缓冲的所有事件。
    ///
    /// 先等待 `coalesce_delay` 让突发事件合并到同一次响应；之后若缓冲为空则挂起，
    /// 直到有新事件、`timeout` 到期或 `cancel` 被触发。超时和取消都不是错误，
    /// 返回此时已经累积的事件（可能为空）。
    pub async fn drain(
        &self,
        profile_id: ProfileId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<Event>, DomainError> {
        if !self.is_subscribed(profile_id) {
            return Err(DomainError::NotSubscribed);
        }

        let delay = self.config.coalesce_delay();
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let wake = {
                let now = self.clock.now();
                let mut state = lock(&self.state);
                let Some(subscription) = state.subscriptions.get_mut(&profile_id) else {
                    return Ok(Vec::new());
                };
                if !subscription.pending.is_empty() || cancel.is_cancelled() {
                    return Ok(subscription.take(now));
                }
                subscription.last_activity = now;
                subscription.wake.clone()
            };

            // notify_one 会留下许可，所以释放锁之后才到达的事件也不会丢失唤醒
            tokio::select! {
                _ = wake.notified() => {}
                _ = tokio::time::sleep_until(deadline) => break,
                _ = cancel.cancelled() => break,
            }
        }

        Ok(self.take_pending(profile_id))
    }

    fn take_pending(&self, profile_id: ProfileId) -> Vec<Event> {
        let now = self.clock.now();
        lock(&self.state)
            .subscriptions
            .get_mut(&profile_id)
            .map(|subscription| subscription.take(now))
            .unwrap_or_default()
    }

    /// 为长连接注册一个监听者，返回的流被 drop 时自动注销。
    ///
    /// 通道容量为 `max_pending`；读取跟不上时监听者被移除，流随之结束。
    pub fn listen(&self, profile_id: ProfileId) -> EventStream {
        let (sender, receiver) = mpsc::channel(self.config.max_pending.max(1));
        let mut state = lock(&self.state);
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state
            .listeners
            .entry(profile_id)
            .or_default()
            .push(Listener { id, sender });
        debug!(profile_id = %profile_id, listener_id = id, "event listener attached");

        EventStream {
            receiver,
            _guard: ListenerGuard {
                state: Arc::downgrade(&self.state),
                profile_id,
                id,
            },
        }
    }

    /// 周期性回收：移除超过 `inactivity_timeout` 未读取的订阅，
    /// 把缓冲截断到最近的 `max_pending` 条，清理已断开的监听者。
    pub fn gc(&self, now: Timestamp) -> GcReport {
        let inactivity = self.config.inactivity_timeout();
        let max_pending = self.config.max_pending;
        let mut report = GcReport::default();
        let mut state = lock(&self.state);

        let before = state.subscriptions.len();
        state.subscriptions.retain(|_, subscription| {
            let keep = !elapsed_exceeds(now, subscription.last_activity, inactivity);
            if !keep {
                subscription.wake.notify_waiters();
            }
            keep
        });
        report.removed = before - state.subscriptions.len();

        for subscription in state.subscriptions.values_mut() {
            if subscription.pending.len() > max_pending {
                let excess = subscription.pending.len() - max_pending;
                subscription.pending.drain(..excess);
                report.truncated += excess;
            }
        }

        for listeners in state.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|listener| !listener.sender.is_closed());
            report.closed_listeners += before - listeners.len();
        }
        state.listeners.retain(|_, listeners| !listeners.is_empty());

        if report != GcReport::default() {
            info!(
                removed = report.removed,
                truncated = report.truncated,
                closed_listeners = report.closed_listeners,
                "event subscriptions collected"
            );
        }
        report
    }
}

impl EventDispatcher for SubscriptionRegistry {
    fn dispatch(&self, recipient: ProfileId, event: Event) {
        self.emit(recipient, event);
    }
}

struct ListenerGuard {
    state: Weak<Mutex<RegistryState>>,
    profile_id: ProfileId,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            lock(&state).remove_listener(self.profile_id, self.id);
            debug!(profile_id = %self.profile_id, listener_id = self.id, "event listener detached");
        }
    }
}

/// 推送通道的接收端
pub struct EventStream {
    receiver: mpsc::Receiver<Event>,
    _guard: ListenerGuard,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
