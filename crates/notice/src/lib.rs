//! User-facing notices for the provisioning flow.
//!
//! The provisioning core only ever talks to a [`Notifier`]: it toggles a
//! waiting indicator and posts short messages. [`NoticeBoard`] is the
//! in-process implementation the host drains and renders.

mod board;
mod queue;

pub use board::NoticeBoard;
pub use queue::{Notice, NoticeKind, NoticeQueue};

/// Sink for user-visible effects.
pub trait Notifier: Send + Sync {
    /// Shows the "work in progress" indicator.
    fn show_waiting(&self);

    /// Hides the "work in progress" indicator. Idempotent.
    fn hide_waiting(&self);

    /// Posts an informational notice.
    fn notify(&self, message: &str);

    /// Posts an error notice.
    fn notify_error(&self, message: &str);
}
