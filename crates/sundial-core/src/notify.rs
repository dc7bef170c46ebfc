use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotifyKind {
    pub fn label(self) -> &'static str {
        match self {
            NotifyKind::Success => "success",
            NotifyKind::Error => "error",
            NotifyKind::Warning => "warning",
            NotifyKind::Info => "info",
        }
    }
}

/// A transient user-facing notification. `deadline` of `None` means the
/// entry persists until dismissed.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub kind: NotifyKind,
    pub message: String,
    pub deadline: Option<DateTime<Utc>>,
}

/// App-lifetime queue of transient notifications.
///
/// There is no timer here: callers run `sweep` with the current time to
/// drop expired entries, which keeps the queue deterministic under test.
#[derive(Debug)]
pub struct Notifier {
    queue: Vec<Notification>,
    next_id: u64,
    default_ttl: Option<TimeDelta>,
}

impl Notifier {
    pub fn new(default_ttl: Option<TimeDelta>) -> Self {
        Self {
            queue: Vec::new(),
            next_id: 1,
            default_ttl,
        }
    }

    pub fn push(&mut self, kind: NotifyKind, message: impl Into<String>) -> u64 {
        self.push_at(Utc::now(), kind, message, self.default_ttl)
    }

    pub fn push_at(
        &mut self,
        now: DateTime<Utc>,
        kind: NotifyKind,
        message: impl Into<String>,
        ttl: Option<TimeDelta>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let message = message.into();
        debug!(id, kind = kind.label(), message = %message, "notification enqueued");
        self.queue.push(Notification {
            id,
            kind,
            message,
            deadline: ttl.map(|ttl| now + ttl),
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotifyKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotifyKind::Error, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotifyKind::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotifyKind::Info, message)
    }

    /// Drop every entry whose deadline has passed.
    pub fn sweep(&mut self, now: DateTime<Utc>) {
        self.queue
            .retain(|n| n.deadline.is_none_or(|deadline| deadline > now));
    }

    pub fn dismiss(&mut self, id: u64) {
        self.queue.retain(|n| n.id != id);
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn items(&self) -> &[Notification] {
        &self.queue
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.queue)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_drops_only_expired_entries() {
        let now = Utc::now();
        let mut notifier = Notifier::new(Some(TimeDelta::seconds(5)));
        let expiring = notifier.push_at(now, NotifyKind::Info, "soon", Some(TimeDelta::seconds(5)));
        let sticky = notifier.push_at(now, NotifyKind::Error, "until dismissed", None);

        notifier.sweep(now + TimeDelta::seconds(4));
        assert_eq!(notifier.items().len(), 2);

        notifier.sweep(now + TimeDelta::seconds(6));
        let remaining: Vec<u64> = notifier.items().iter().map(|n| n.id).collect();
        assert_eq!(remaining, vec![sticky]);
        assert_ne!(sticky, expiring);
    }

    #[test]
    fn dismiss_removes_by_id() {
        let mut notifier = Notifier::new(None);
        let first = notifier.success("saved");
        let second = notifier.warning("careful");
        notifier.dismiss(first);
        assert_eq!(notifier.items().len(), 1);
        assert_eq!(notifier.items()[0].id, second);
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut notifier = Notifier::new(None);
        let a = notifier.info("a");
        let b = notifier.info("b");
        assert!(b > a);
    }
}
