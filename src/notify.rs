// User-visible notifications (toasts).
// Sinks are fire-and-forget: nothing waits for a toast to be seen.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Destructive,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: String,
    pub kind: ToastKind,
    pub title: String,
    pub description: String,
    pub created: DateTime<Utc>,
}

impl Toast {
    pub fn info(title: &str, description: &str) -> Self {
        Self::build(ToastKind::Info, title, description)
    }

    pub fn error(title: &str, description: &str) -> Self {
        Self::build(ToastKind::Destructive, title, description)
    }

    fn build(kind: ToastKind, title: &str, description: &str) -> Self {
        Toast {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.to_string(),
            description: description.to_string(),
            created: Utc::now(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Sink that only writes toasts to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Info => info!("{}: {}", toast.title, toast.description),
            ToastKind::Destructive => warn!("{}: {}", toast.title, toast.description),
        }
    }
}

/// Bounded queue the shell reads from each frame.
/// Clones share the same queue.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    inner: Arc<Mutex<VecDeque<Toast>>>,
    capacity: usize,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ToastQueue {
    pub fn new(capacity: usize) -> Self {
        ToastQueue {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Toasts currently queued, oldest first
    pub fn visible(&self) -> Vec<Toast> {
        match self.inner.lock() {
            Ok(queue) => queue.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dismiss(&self, id: &str) {
        if let Ok(mut queue) = self.inner.lock() {
            queue.retain(|t| t.id != id);
        }
    }

    /// Drop toasts that have been on screen longer than `timeout_secs`
    pub fn clean_expired(&self, timeout_secs: i64) {
        let now = Utc::now();
        if let Ok(mut queue) = self.inner.lock() {
            let before = queue.len();
            queue.retain(|t| (now - t.created).num_seconds() <= timeout_secs);
            if queue.len() != before {
                debug!("Auto-dismissed {} toast(s)", before - queue.len());
            }
        }
    }
}

impl NotificationSink for ToastQueue {
    fn notify(&self, toast: Toast) {
        info!("Toast [{:?}] {}: {}", toast.kind, toast.title, toast.description);
        if let Ok(mut queue) = self.inner.lock() {
            while queue.len() >= self.capacity {
                queue.pop_front();
            }
            queue.push_back(toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drops_oldest_when_full() {
        let queue = ToastQueue::new(2);
        queue.notify(Toast::info("one", ""));
        queue.notify(Toast::info("two", ""));
        queue.notify(Toast::error("three", ""));

        let titles: Vec<String> = queue.visible().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["two", "three"]);
    }

    #[test]
    fn test_clones_share_queue_and_dismiss() {
        let queue = ToastQueue::default();
        let handle = queue.clone();
        handle.notify(Toast::info("Device added", "ok"));
        assert_eq!(queue.len(), 1);

        let id = queue.visible()[0].id.clone();
        queue.dismiss(&id);
        assert!(handle.is_empty());
    }

    #[test]
    fn test_clean_expired() {
        let queue = ToastQueue::default();
        let mut old = Toast::info("old", "");
        old.created = Utc::now() - chrono::Duration::seconds(30);
        queue.notify(old);
        queue.notify(Toast::info("fresh", ""));

        queue.clean_expired(5);
        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "fresh");
    }
}
