//! The platform capability contract: a millisecond clock and an 8-bit
//! event group with wait-for-any/timeout semantics, as described in
//! spec.md §5. One concrete, `std`-backed implementation rather than a
//! pluggable HAL trait with a single implementor.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds since an arbitrary but stable epoch, used for retry/KA
/// timers.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

bitflags::bitflags! {
    /// Event bits an `Endpoint` waits on. `CAN_ACCEPT_I_FRAMES` is tracked
    /// per peer in practice (see `fd::Peer::events`); `QUEUE_HAS_FREE_SLOTS`
    /// is global to the endpoint's I-queue.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Events: u8 {
        const CAN_ACCEPT_I_FRAMES = 0b0000_0001;
        const QUEUE_HAS_FREE_SLOTS = 0b0000_0010;
        const HAS_MARKER = 0b0000_0100;
        const CLOSED = 0b1000_0000;
    }
}

/// An 8-bit event group: `wait` blocks until any of `mask` is set (or
/// `timeout` elapses), `set`/`clear` mutate bits and wake waiters.
pub struct EventGroup {
    bits: Mutex<Events>,
    cv: Condvar,
}

impl EventGroup {
    pub fn new(initial: Events) -> Self {
        EventGroup {
            bits: Mutex::new(initial),
            cv: Condvar::new(),
        }
    }

    pub fn set(&self, mask: Events) {
        let mut bits = self.bits.lock().unwrap();
        bits.insert(mask);
        self.cv.notify_all();
    }

    pub fn clear(&self, mask: Events) {
        let mut bits = self.bits.lock().unwrap();
        bits.remove(mask);
    }

    pub fn get(&self) -> Events {
        *self.bits.lock().unwrap()
    }

    /// Blocks until any bit in `mask` is set or `timeout` elapses, returning
    /// the bits that were set at wake time. If `clear_on_exit` is set, the
    /// matched bits are cleared before returning.
    pub fn wait(&self, mask: Events, clear_on_exit: bool, timeout: Duration) -> Events {
        let deadline = Instant::now() + timeout;
        let mut bits = self.bits.lock().unwrap();
        loop {
            let matched = *bits & mask;
            if !matched.is_empty() || bits.contains(Events::CLOSED) {
                if clear_on_exit {
                    bits.remove(matched);
                }
                return matched;
            }
            let now = Instant::now();
            if now >= deadline {
                return Events::empty();
            }
            let (guard, timeout_result) =
                self.cv.wait_timeout(bits, deadline - now).unwrap();
            bits = guard;
            if timeout_result.timed_out() {
                let matched = *bits & mask;
                if clear_on_exit {
                    bits.remove(matched);
                }
                return matched;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_returns_immediately_when_bit_already_set() {
        let eg = EventGroup::new(Events::QUEUE_HAS_FREE_SLOTS);
        let got = eg.wait(Events::QUEUE_HAS_FREE_SLOTS, false, Duration::from_millis(10));
        assert_eq!(got, Events::QUEUE_HAS_FREE_SLOTS);
    }

    #[test]
    fn wait_times_out_when_bit_never_set() {
        let eg = EventGroup::new(Events::empty());
        let got = eg.wait(Events::HAS_MARKER, false, Duration::from_millis(5));
        assert!(got.is_empty());
    }

    #[test]
    fn clear_on_exit_removes_matched_bits() {
        let eg = EventGroup::new(Events::HAS_MARKER);
        let _ = eg.wait(Events::HAS_MARKER, true, Duration::from_millis(5));
        assert!(!eg.get().contains(Events::HAS_MARKER));
    }
}
