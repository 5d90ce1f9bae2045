// Settle window: suppresses scroll-driven recomputation while a programmatic
// scroll plays out. A new command replaces the open window, never queues behind it.

use crate::types::{SettleToken, Timestamp};

/// Suppression window opened by each programmatic scroll.
///
/// The window closes at whichever comes first: the fixed deadline, or the
/// host's completion signal for the *latest* command. Completion signals for
/// superseded commands are ignored so a fast second click keeps its own window.
#[derive(Debug, Clone)]
pub struct SettleWindow {
    delay_ms: u64,
    generation: u64,
    deadline: Option<Timestamp>,
}

impl SettleWindow {
    pub fn new(delay_ms: u64) -> Self {
        SettleWindow {
            delay_ms,
            generation: 0,
            deadline: None,
        }
    }

    /// Open a window `[now, now + delay)`, cancelling any open one.
    pub fn arm(&mut self, now: Timestamp) -> SettleToken {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = Some(now.saturating_add_millis(self.delay_ms));
        SettleToken::new(self.generation)
    }

    /// True while scroll events must be ignored.
    pub fn is_suppressing(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|deadline| now < deadline)
    }

    /// Explicit completion signal. Returns whether it closed the open window.
    pub fn release(&mut self, token: SettleToken) -> bool {
        if token.as_u64() != self.generation || self.deadline.is_none() {
            tracing::debug!(token = token.as_u64(), "ignoring stale settle token");
            return false;
        }
        self.deadline = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: u64) -> Timestamp {
        Timestamp::from_micros(ms * 1000)
    }

    #[test]
    fn suppresses_until_deadline() {
        let mut window = SettleWindow::new(500);
        assert!(!window.is_suppressing(ms(0)));

        window.arm(ms(100));
        assert!(window.is_suppressing(ms(100)));
        assert!(window.is_suppressing(ms(599)));
        assert!(!window.is_suppressing(ms(600)));
    }

    #[test]
    fn rearm_extends_instead_of_queueing() {
        let mut window = SettleWindow::new(500);
        window.arm(ms(0));
        window.arm(ms(400));
        // The first deadline (500) no longer applies.
        assert!(window.is_suppressing(ms(700)));
        assert!(!window.is_suppressing(ms(900)));
    }

    #[test]
    fn release_closes_only_latest_window() {
        let mut window = SettleWindow::new(500);
        let first = window.arm(ms(0));
        let second = window.arm(ms(50));

        assert!(!window.release(first));
        assert!(window.is_suppressing(ms(100)));

        assert!(window.release(second));
        assert!(!window.is_suppressing(ms(100)));

        // A second release of the same token is a no-op.
        assert!(!window.release(second));
    }

    #[test]
    fn zero_delay_never_suppresses() {
        let mut window = SettleWindow::new(0);
        window.arm(ms(10));
        assert!(!window.is_suppressing(ms(10)));
    }
}
