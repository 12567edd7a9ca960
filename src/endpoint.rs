//! The public handle: wires [`crate::fd::FdEngine`] to a host byte channel
//! under the mutex/event-group concurrency model of spec.md §5.
//!
//! The read-then-housekeep-then-write drive loop is a host `Channel` trait
//! plus a queued-callback adapter that defers user callbacks until the
//! internal mutex is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fd::{Config, FdEngine, FdHandler, Stats};
use crate::frame::Address;
use crate::hal::{now_ms, EventGroup, Events};

/// The only I/O the core performs: reading and writing raw bytes on behalf
/// of the host. `write` returns bytes accepted (non-negative) or a
/// transport error (negative); `read` returns bytes read, 0 for none, or a
/// negative error, per spec.md §6.
pub trait Channel {
    fn write(&mut self, bytes: &[u8]) -> i32;
    fn read(&mut self, buf: &mut [u8]) -> i32;
}

enum PendingEvent {
    Read(Address, Vec<u8>),
    Sent(Address, Vec<u8>),
    Connect(Address, bool),
}

/// Collects callback invocations made while the endpoint's mutex is held,
/// so they can be replayed into the real [`FdHandler`] after the lock is
/// released — the Rust shape of spec.md §9's "drop the mutex before
/// invoking any user-supplied callback".
#[derive(Default)]
struct QueueingHandler {
    events: Vec<PendingEvent>,
}

impl FdHandler for QueueingHandler {
    fn on_read(&mut self, addr: Address, payload: &[u8]) {
        self.events.push(PendingEvent::Read(addr, payload.to_vec()));
    }
    fn on_send(&mut self, addr: Address, payload: &[u8]) {
        self.events.push(PendingEvent::Sent(addr, payload.to_vec()));
    }
    fn on_connect_event(&mut self, addr: Address, connected: bool) {
        self.events.push(PendingEvent::Connect(addr, connected));
    }
}

impl QueueingHandler {
    fn replay_into(self, handler: &mut dyn FdHandler) {
        for ev in self.events {
            match ev {
                PendingEvent::Read(addr, p) => handler.on_read(addr, &p),
                PendingEvent::Sent(addr, p) => handler.on_send(addr, &p),
                PendingEvent::Connect(addr, c) => handler.on_connect_event(addr, c),
            }
        }
    }
}

/// A handler that ignores every callback, useful for demos and tools that
/// only care about the bytes on the wire.
pub struct FdHandlerNoop;
impl FdHandler for FdHandlerNoop {
    fn on_read(&mut self, _addr: Address, _payload: &[u8]) {}
    fn on_send(&mut self, _addr: Address, _payload: &[u8]) {}
    fn on_connect_event(&mut self, _addr: Address, _connected: bool) {}
}

/// Top-level protocol handle. Owns the [`FdEngine`] behind a mutex, an
/// event group used to avoid busy-waiting in [`Endpoint::send_packet`], and
/// the closed flag that makes `close()` the sole cancellation primitive.
pub struct Endpoint {
    inner: Mutex<FdEngine>,
    events: EventGroup,
    closed: AtomicBool,
}

/// Granularity of the poll used while `send_packet` waits for a window
/// slot to open. The engine has no mechanism to wake this early on a
/// specific peer's window opening without threading the event group into
/// `fd.rs`; polling at this interval is the documented trade-off.
const SEND_POLL_INTERVAL_MS: u64 = 5;

impl Endpoint {
    pub fn new(config: Config) -> Self {
        Endpoint {
            inner: Mutex::new(FdEngine::new(config)),
            events: EventGroup::new(Events::QUEUE_HAS_FREE_SLOTS),
            closed: AtomicBool::new(false),
        }
    }

    pub fn stats(&self) -> Stats {
        self.inner.lock().unwrap().stats()
    }

    /// Blocks up to `send_timeout` waiting for a window slot for `addr`,
    /// per spec.md §5's suspension-point contract. Returns `Timeout` if the
    /// wait is exhausted, `Failed` if the endpoint has been closed.
    pub fn send_packet(&self, addr: Address, data: &[u8], send_timeout: Duration) -> Result<()> {
        let deadline = now_ms() + send_timeout.as_millis() as u64;
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(Error::Failed);
            }
            let result = self.inner.lock().unwrap().try_enqueue_send(addr, data);
            match result {
                Ok(()) => return Ok(()),
                Err(Error::AgainLater) => {
                    let now = now_ms();
                    if now >= deadline {
                        return Err(Error::Timeout);
                    }
                    let wait = SEND_POLL_INTERVAL_MS.min(deadline - now);
                    self.events.wait(
                        Events::QUEUE_HAS_FREE_SLOTS | Events::CAN_ACCEPT_I_FRAMES | Events::CLOSED,
                        false,
                        Duration::from_millis(wait),
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Queues a DISC for `addr` and returns immediately; not a cancellation
    /// of already-sent, unacknowledged frames.
    pub fn disconnect(&self, addr: Address) {
        self.inner.lock().unwrap().disconnect(addr);
    }

    /// Feeds received bytes through the engine, replaying any resulting
    /// `on_read`/`on_send`/`on_connect_event` calls into `handler` after
    /// releasing the internal mutex.
    pub fn run_rx(&self, bytes: &[u8], handler: &mut dyn FdHandler) {
        let mut qh = QueueingHandler::default();
        self.inner.lock().unwrap().run_rx_step(bytes, &mut qh);
        self.events.set(Events::QUEUE_HAS_FREE_SLOTS);
        qh.replay_into(handler);
    }

    /// Drains up to `out.len()` encoded bytes for transmission, returning
    /// how many were written; replays callbacks as in [`Endpoint::run_rx`].
    pub fn run_tx(&self, out: &mut [u8], handler: &mut dyn FdHandler) -> usize {
        let mut qh = QueueingHandler::default();
        let n = self.inner.lock().unwrap().run_tx_step(out, &mut qh);
        self.events.set(Events::QUEUE_HAS_FREE_SLOTS);
        qh.replay_into(handler);
        n
    }

    /// Drives one full read-dispatch-write cycle against a host `Channel`.
    pub fn poll(&self, channel: &mut dyn Channel, handler: &mut dyn FdHandler) {
        let mut buf = [0u8; 256];
        let n = channel.read(&mut buf);
        if n > 0 {
            self.run_rx(&buf[..n as usize], handler);
        }
        let mut out = [0u8; 256];
        loop {
            let n = self.run_tx(&mut out, handler);
            if n == 0 {
                break;
            }
            if channel.write(&out[..n]) < 0 {
                break;
            }
        }
    }

    /// Wakes any blocked `send_packet` callers with `Failed`, flushes
    /// unsent queued frames without firing their callbacks, and marks the
    /// endpoint closed. Matches spec.md §5's cancellation contract.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.inner.lock().unwrap().close();
        self.events.set(Events::CLOSED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::CrcKind;
    use crate::fd::Mode;

    struct NoopHandler;
    impl FdHandler for NoopHandler {
        fn on_read(&mut self, _: Address, _: &[u8]) {}
        fn on_send(&mut self, _: Address, _: &[u8]) {}
        fn on_connect_event(&mut self, _: Address, _: bool) {}
    }

    fn cfg(addr: Address, peers: Vec<Address>) -> Config {
        Config {
            mtu: 32,
            window_frames: 4,
            crc_type: CrcKind::Off,
            send_timeout_ms: 50,
            retry_timeout_ms: 100,
            ka_timeout_ms: 500,
            retries: 2,
            addr,
            peers,
            mode: Mode::Abm,
        }
    }

    #[test]
    fn send_packet_times_out_when_peer_never_connects() {
        let secondary = Address::new(1, false);
        let ep = Endpoint::new(cfg(Address::PRIMARY, vec![secondary]));
        let mut h = NoopHandler;
        // No bytes are ever exchanged, so the peer never leaves Connecting.
        let _ = ep.run_tx(&mut [0u8; 64], &mut h);
        let result = ep.send_packet(secondary, b"x", Duration::from_millis(20));
        assert_eq!(result, Err(Error::Timeout));
    }

    #[test]
    fn close_flushes_queue_and_rejects_further_sends() {
        let secondary = Address::new(1, false);
        let ep = Endpoint::new(cfg(Address::PRIMARY, vec![secondary]));
        ep.close();
        let result = ep.send_packet(secondary, b"x", Duration::from_millis(10));
        assert_eq!(result, Err(Error::Failed));
    }
}
