//! Thread-safe [`Notifier`] backed by a [`NoticeQueue`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info};

use crate::Notifier;
use crate::queue::{Notice, NoticeKind, NoticeQueue};

/// Collects notices and tracks the waiting indicator.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    queue: Mutex<NoticeQueue>,
    waiting: AtomicBool,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the waiting indicator is currently shown.
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Snapshot of queued notices, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().iter().cloned().collect()
    }

    /// Number of queued notices of `kind`.
    pub fn count(&self, kind: NoticeKind) -> usize {
        self.lock().count(kind)
    }

    /// Removes and returns all queued notices.
    pub fn drain(&self) -> Vec<Notice> {
        self.lock().drain()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NoticeQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for NoticeBoard {
    fn show_waiting(&self) {
        self.waiting.store(true, Ordering::Relaxed);
        debug!("waiting indicator shown");
    }

    fn hide_waiting(&self) {
        if self.waiting.swap(false, Ordering::Relaxed) {
            debug!("waiting indicator hidden");
        }
    }

    fn notify(&self, message: &str) {
        info!(notice = %message, "user notice");
        self.lock().info(message);
    }

    fn notify_error(&self, message: &str) {
        error!(notice = %message, "user error notice");
        self.lock().error(message);
    }
}
