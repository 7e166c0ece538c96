use domain::{Event, ProfileId};

/// 事件派发器：领域操作通过它把事件投递给在线的 profile。
///
/// 投递是尽力而为的，没有订阅者时事件被直接丢弃，因此这里没有错误返回。
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, recipient: ProfileId, event: Event);

    fn dispatch_to_all(&self, recipients: &[ProfileId], event: Event) {
        for recipient in recipients {
            self.dispatch(*recipient, event.clone());
        }
    }
}
