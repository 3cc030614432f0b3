//! Ordered store of notices waiting to be rendered.

/// The visual category of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A single user-facing notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Notices in the order they were posted.
///
/// How long a notice stays on screen is up to whoever renders it.
#[derive(Debug, Clone, Default)]
pub struct NoticeQueue {
    notices: Vec<Notice>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.push(Notice {
            kind,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeKind::Info, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeKind::Error, message);
    }

    /// Iterate over notices oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    /// Number of queued notices of `kind`.
    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices.iter().filter(|n| n.kind == kind).count()
    }

    /// Removes and returns every queued notice, oldest first.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
