//! Single-slot step timer
//!
//! A lesson has at most one pending timer: the auto-advance of the current
//! explanation or choice step. Arming a new timer replaces the old one, and
//! leaving a step cancels it.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Sleep};

/// Identity of one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub id: u64,
    /// Step the timer belongs to
    pub step_index: usize,
    pub duration: Duration,
}

#[derive(Debug)]
struct PendingTimer {
    handle: TimerHandle,
    sleep: Pin<Box<Sleep>>,
}

/// Holds the one pending timer, if any
#[derive(Debug, Default)]
pub struct TimerSlot {
    next_id: u64,
    pending: Option<PendingTimer>,
}

impl TimerSlot {
    /// Arm a timer for `step_index`, cancelling any timer already pending
    pub fn arm(&mut self, step_index: usize, duration: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle {
            id: self.next_id,
            step_index,
            duration,
        };
        self.pending = Some(PendingTimer {
            handle,
            sleep: Box::pin(sleep(duration)),
        });
        handle
    }

    /// Drop the pending timer, returning it if there was one
    pub fn cancel(&mut self) -> Option<TimerHandle> {
        self.pending.take().map(|p| p.handle)
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending.as_ref().map(|p| p.handle)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolve when the pending timer fires, emptying the slot
    ///
    /// Never resolves while the slot is empty. Cancel-safe: dropping the
    /// future leaves the timer armed.
    pub async fn expired(&mut self) -> TimerHandle {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.sleep.as_mut().await;
            }
            None => std::future::pending::<()>().await,
        }

        match self.pending.take() {
            Some(pending) => pending.handle,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_arm_replaces_pending_timer() {
        let mut slot = TimerSlot::default();
        let first = slot.arm(1, Duration::from_secs(5));
        let second = slot.arm(2, Duration::from_secs(3));

        assert_ne!(first.id, second.id);
        assert_eq!(slot.pending(), Some(second), "only the latest timer is pending");
        assert_eq!(slot.cancel(), Some(second));
        assert!(!slot.is_pending());
        assert_eq!(slot.cancel(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_once() {
        let mut slot = TimerSlot::default();
        let armed = slot.arm(3, Duration::from_secs(5));

        let fired = slot.expired().await;
        assert_eq!(fired, armed);
        assert!(!slot.is_pending(), "slot empties when the timer fires");

        let again = timeout(Duration::from_secs(60), slot.expired()).await;
        assert!(again.is_err(), "an empty slot never fires");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut slot = TimerSlot::default();
        slot.arm(0, Duration::from_secs(1));
        slot.cancel();

        let fired = timeout(Duration::from_secs(10), slot.expired()).await;
        assert!(fired.is_err());
    }
}
