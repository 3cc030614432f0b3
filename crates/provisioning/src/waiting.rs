//! Scoped waiting indicator.

use autoprov_notice::Notifier;

/// Shows the waiting indicator for as long as it is alive.
pub(crate) struct WaitingIndicator<'a> {
    notifier: &'a dyn Notifier,
}

impl<'a> WaitingIndicator<'a> {
    pub(crate) fn show(notifier: &'a dyn Notifier) -> Self {
        notifier.show_waiting();
        Self { notifier }
    }
}

impl Drop for WaitingIndicator<'_> {
    fn drop(&mut self) {
        self.notifier.hide_waiting();
    }
}

#[cfg(test)]
mod tests {
    use autoprov_notice::NoticeBoard;

    use super::*;

    #[test]
    fn shown_while_alive_hidden_on_drop() {
        let board = NoticeBoard::new();
        {
            let _waiting = WaitingIndicator::show(&board);
            assert!(board.is_waiting());
        }
        assert!(!board.is_waiting());
    }
}
