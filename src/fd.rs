//! The FD engine: sliding-window ARQ riding on HDLC-LL, per spec.md
//! §4.4-§4.8. Connection state machine, window accounting, marker (poll/
//! final) discipline and the TX/RX scheduler all live here; `endpoint.rs`
//! adds the mutex/event-group wrapper and the host byte-stream loop.
//!
//! An incoming frame is classified, peer state is mutated, and a response
//! is enqueued if one is owed, across the full HDLC I/S/U taxonomy and a
//! per-peer connection state machine.

use crate::crc::CrcKind;
use crate::error::{Error, Result};
use crate::frame::{Address, Control, SupervisoryKind, UnnumberedKind};
use crate::hal::now_ms;
use crate::hdlc::{FrameSink, HdlcLl};
use crate::queue::{FrameQueue, SlotKind};

/// Asynchronous Balanced Mode (peer-to-peer) or Normal Response Mode
/// (primary polls secondaries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Abm,
    Nrm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone)]
struct Peer {
    addr: Address,
    state: PeerConnState,
    next_nr: u8,
    sent_nr: u8,
    next_ns: u8,
    confirm_ns: u8,
    last_ns: u8,
    sent_reject: bool,
    last_i_ts: u64,
    last_ka_ts: u64,
    ka_confirmed: bool,
    retries_left: u32,
}

impl Peer {
    fn new(addr: Address) -> Self {
        Peer {
            addr,
            state: PeerConnState::Disconnected,
            next_nr: 0,
            sent_nr: 0,
            next_ns: 0,
            confirm_ns: 0,
            last_ns: 0,
            sent_reject: false,
            last_i_ts: 0,
            last_ka_ts: 0,
            ka_confirmed: true,
            retries_left: 0,
        }
    }

    /// A producer slot is free iff fewer than `window_frames` I-frames are
    /// currently outstanding (sent-or-queued but not yet confirmed). One
    /// N(S) value is implicitly reserved since `window_frames` is capped at
    /// 7, never the full mod-8 range.
    fn has_free_producer_slot(&self, window_frames: u8) -> bool {
        let outstanding = (self.last_ns.wrapping_sub(self.confirm_ns)) & 0x07;
        outstanding < window_frames
    }
}

/// Per-peer and aggregate connection callbacks, address-qualified since a
/// single endpoint may hold several peers.
pub trait FdHandler {
    fn on_read(&mut self, addr: Address, payload: &[u8]);
    fn on_send(&mut self, addr: Address, payload: &[u8]);
    fn on_connect_event(&mut self, addr: Address, connected: bool);
}

/// Runtime configuration, per spec.md §6.
#[derive(Debug, Clone)]
pub struct Config {
    pub mtu: usize,
    pub window_frames: u8,
    pub crc_type: CrcKind,
    pub send_timeout_ms: u64,
    pub retry_timeout_ms: u64,
    pub ka_timeout_ms: u64,
    pub retries: u32,
    pub addr: Address,
    pub peers: Vec<Address>,
    pub mode: Mode,
}

impl Config {
    /// Rough estimate of the resident memory an [`FdEngine`] built from this
    /// config would occupy: `sizeof(FdEngine) + peers * sizeof(Peer) +
    /// hdlc buffers + window * (slot_overhead + mtu) + U_QUEUE_CAPACITY *
    /// slot_overhead`, per spec.md §4.9's `buffer_size`. Informational only
    /// — owned `Vec`/`VecDeque` storage replaces the original's single
    /// pointer-laid-out backing region, so nothing here is load-bearing for
    /// an actual allocation.
    pub fn estimated_bytes(&self) -> usize {
        let slot_overhead = crate::queue::slot_overhead();
        let hdlc_bytes = 2 * (self.mtu + 2 + self.crc_type.width_bytes());
        let window = self.window_frames.max(2) as usize;
        std::mem::size_of::<FdEngine>()
            + self.peers.len() * std::mem::size_of::<Peer>()
            + hdlc_bytes
            + window * (slot_overhead + self.mtu)
            + U_QUEUE_CAPACITY * slot_overhead
    }
}

/// Per-endpoint operating counters, supplemental to spec.md (carried over
/// from the original's `tiny_fd_data_t` statistics fields).
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub crc_errors: u64,
    pub out_of_sync_discarded: u64,
    pub retries_issued: u64,
    pub connects: u64,
    pub disconnects: u64,
}

const U_QUEUE_CAPACITY: usize = 4;

// Tags used for entries stored in the S/U queue. The queue's stored
// "control" byte is not the final wire control field for these — N(R) and
// P/F are only known at the moment a frame is actually granted the marker,
// so queued control/supervisory frames carry a small tag instead and are
// encoded fresh in `pick_next_frame`.
const TAG_SABM: u8 = 0;
const TAG_SNRM: u8 = 1;
const TAG_DISC: u8 = 2;
const TAG_UA: u8 = 3;
const TAG_FRMR: u8 = 4;
const TAG_RSET: u8 = 5;
const TAG_RR: u8 = 6;
const TAG_REJ: u8 = 7;

struct Collector {
    frames: Vec<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    errors: Vec<Error>,
}

impl Collector {
    fn new() -> Self {
        Collector {
            frames: Vec::new(),
            sent: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl FrameSink for Collector {
    fn on_frame_read(&mut self, payload: &[u8]) {
        self.frames.push(payload.to_vec());
    }
    fn on_frame_sent(&mut self, payload: &[u8]) {
        self.sent.push(payload.to_vec());
    }
    fn on_rx_error(&mut self, err: Error) {
        self.errors.push(err);
    }
}

/// The protocol engine for one endpoint: HDLC-LL codec, peer table, I and
/// S/U queues, marker discipline and scheduler.
pub struct FdEngine {
    config: Config,
    hdlc: HdlcLl,
    peers: Vec<Peer>,
    i_queue: FrameQueue,
    su_queue: FrameQueue,
    has_marker: bool,
    next_peer: usize,
    last_marker_ts: u64,
    stats: Stats,
}

impl FdEngine {
    pub fn new(config: Config) -> Self {
        let window = config.window_frames.max(2) as usize;
        let hdlc = HdlcLl::new(config.crc_type, config.mtu + 2 + config.crc_type.width_bytes());
        let peers = config.peers.iter().map(|&a| Peer::new(a)).collect();
        // ABM endpoints permanently hold the marker; NRM primaries start by
        // acquiring it to poll the first secondary, secondaries start
        // without it and wait to be polled.
        let has_marker = config.mode == Mode::Abm || config.addr == Address::PRIMARY;
        FdEngine {
            i_queue: FrameQueue::new(window, config.mtu),
            su_queue: FrameQueue::new(U_QUEUE_CAPACITY, config.mtu.max(1)),
            hdlc,
            peers,
            has_marker,
            next_peer: 0,
            last_marker_ts: now_ms(),
            config,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn is_primary(&self) -> bool {
        self.config.addr == Address::PRIMARY
    }

    fn find_peer(&self, addr: Address) -> Option<usize> {
        self.peers.iter().position(|p| p.addr.matches(addr))
    }

    /// Queues `data` as an I-frame to `addr`. Returns `AgainLater` if the
    /// peer is not yet connected or the window/queue has no free slot; the
    /// caller (`endpoint.rs`) is expected to retry under a `send_timeout`.
    pub fn try_enqueue_send(&mut self, addr: Address, data: &[u8]) -> Result<()> {
        let idx = self.find_peer(addr).ok_or(Error::UnknownPeer)?;
        match self.peers[idx].state {
            PeerConnState::Disconnected => {
                self.begin_connect(idx, now_ms());
                Err(Error::AgainLater)
            }
            PeerConnState::Connecting | PeerConnState::Disconnecting => Err(Error::AgainLater),
            PeerConnState::Connected => {
                if !self.peers[idx].has_free_producer_slot(self.config.window_frames) {
                    return Err(Error::AgainLater);
                }
                let ns = self.peers[idx].last_ns;
                let control = Control::Info { ns, nr: 0, pf: false }.encode();
                let wire_addr = Address::new(addr.station(), true);
                self.i_queue.allocate(SlotKind::I, wire_addr, control, data)?;
                self.peers[idx].last_ns = (self.peers[idx].last_ns + 1) & 0x07;
                Ok(())
            }
        }
    }

    pub fn has_free_producer_slot(&self, addr: Address) -> bool {
        let window_frames = self.config.window_frames;
        self.find_peer(addr)
            .map(|i| self.peers[i].has_free_producer_slot(window_frames))
            .unwrap_or(false)
    }

    pub fn queue_has_free_slots(&self) -> bool {
        self.i_queue.has_free_slots()
    }

    /// Queues a DISC for `addr`; returns immediately, matching spec.md §5's
    /// "`disconnect()` ... is not cancellation of in-flight sends".
    pub fn disconnect(&mut self, addr: Address) {
        if let Some(idx) = self.find_peer(addr) {
            if self.peers[idx].state == PeerConnState::Connected {
                self.enqueue_u(self.peers[idx].addr, TAG_DISC);
                self.peers[idx].state = PeerConnState::Disconnecting;
            }
        }
    }

    /// Flushes all queued frames without firing their callbacks and marks
    /// every peer disconnected, per spec.md §5's `close()` contract. Does
    /// not itself release HAL objects; `endpoint.rs` owns that.
    pub fn close(&mut self) {
        self.i_queue.reset();
        self.su_queue.reset();
        for peer in &mut self.peers {
            peer.state = PeerConnState::Disconnected;
        }
    }

    // ---- receive path ----------------------------------------------------

    pub fn run_rx_step(&mut self, bytes: &[u8], handler: &mut dyn FdHandler) {
        let mut collector = Collector::new();
        self.hdlc.run_rx(bytes, &mut collector);
        for err in collector.errors {
            match err {
                Error::WrongCrc => {
                    self.stats.crc_errors += 1;
                    log::warn!(target: "tiny_proto::fd", "dropped frame with bad CRC");
                }
                Error::OutOfSync => {
                    self.stats.out_of_sync_discarded += 1;
                    log::warn!(target: "tiny_proto::fd", "discarded byte received out of frame sync");
                }
                _ => {}
            }
        }
        for frame in collector.frames {
            self.stats.frames_received += 1;
            self.process_frame(&frame, handler);
        }
    }

    fn process_frame(&mut self, frame: &[u8], handler: &mut dyn FdHandler) {
        if frame.len() < 2 {
            return;
        }
        let addr = Address(frame[0]);
        if !addr.has_extension() {
            return;
        }
        let control = match Control::decode(frame[1]) {
            Some(c) => c,
            None => return,
        };
        let payload = &frame[2..];

        let idx = match self.find_peer(addr) {
            Some(i) => i,
            None => return,
        };
        self.peers[idx].ka_confirmed = true;
        if control.poll_final() {
            self.has_marker = true;
            self.last_marker_ts = now_ms();
        }

        match control {
            Control::Unnumbered { kind, .. } => self.process_unnumbered(idx, kind, addr, control, handler),
            Control::Supervisory { kind, nr, .. } => match kind {
                SupervisoryKind::ReceiveReady => {
                    self.confirm(idx, nr, handler);
                    if addr.is_command() && self.su_queue.next(SlotKind::U | SlotKind::S, addr, None).is_none() {
                        self.enqueue_u_or_s(idx, TAG_RR);
                    }
                }
                SupervisoryKind::Reject => self.handle_reject(idx, nr, control, handler),
            },
            Control::Info { ns, nr, .. } => self.process_info(idx, ns, nr, payload, handler),
        }
    }

    fn process_unnumbered(
        &mut self,
        idx: usize,
        kind: UnnumberedKind,
        addr: Address,
        incoming: Control,
        handler: &mut dyn FdHandler,
    ) {
        match kind {
            UnnumberedKind::Sabm | UnnumberedKind::Snrm | UnnumberedKind::Rset => {
                self.enter_connected(idx, handler);
                self.enqueue_u(addr, TAG_UA);
            }
            UnnumberedKind::Disc => {
                if self.peers[idx].state == PeerConnState::Connected {
                    self.enqueue_u(addr, TAG_UA);
                    self.enter_disconnected(idx, handler);
                }
            }
            UnnumberedKind::Ua => match self.peers[idx].state {
                PeerConnState::Connecting => self.enter_connected(idx, handler),
                PeerConnState::Disconnecting => self.enter_disconnected(idx, handler),
                _ => {}
            },
            UnnumberedKind::Frmr => {
                // Open question (carried from the original): receive-and-log
                // only, no peer-side state reset on FRMR receipt.
                log::warn!(target: "tiny_proto::fd", "received FRMR from {:?}, control byte {:#04x}", addr, incoming.encode());
            }
        }
    }

    fn process_info(&mut self, idx: usize, ns: u8, nr: u8, payload: &[u8], handler: &mut dyn FdHandler) {
        if self.peers[idx].state != PeerConnState::Connected {
            return;
        }
        let addr = self.peers[idx].addr;
        if ns == self.peers[idx].next_nr {
            handler.on_read(addr, payload);
            self.peers[idx].next_nr = (self.peers[idx].next_nr + 1) & 0x07;
            self.peers[idx].sent_reject = false;
        } else if !self.peers[idx].sent_reject {
            log::warn!(
                target: "tiny_proto::fd",
                "peer {:?} sent N(S)={} but {} was expected, sending REJ",
                addr, ns, self.peers[idx].next_nr
            );
            self.enqueue_s(addr, TAG_REJ);
            self.peers[idx].sent_reject = true;
        }

        self.confirm(idx, nr, handler);

        let has_pending_i = self
            .i_queue
            .next(SlotKind::I, self.peers[idx].addr, None)
            .is_some();
        if !has_pending_i && self.peers[idx].sent_nr != self.peers[idx].next_nr {
            self.enqueue_u_or_s(idx, TAG_RR);
            self.peers[idx].sent_nr = self.peers[idx].next_nr;
        }
    }

    /// Validates `nr` against the peer's *pre-confirm* window before doing
    /// anything: a REJ can only legitimately rewind to a value the peer
    /// already knows was sent, i.e. somewhere in `[confirm_ns, last_ns]`. A
    /// stale or corrupted N(R) outside that range means the remote is out
    /// of sync with us, so we report it with an FRMR rather than let
    /// `confirm` walk `confirm_ns` past frames that were never sent.
    fn handle_reject(&mut self, idx: usize, nr: u8, incoming: Control, handler: &mut dyn FdHandler) {
        let confirm_ns = self.peers[idx].confirm_ns;
        let last_ns = self.peers[idx].last_ns;
        let addr = self.peers[idx].addr;
        if in_window(confirm_ns, last_ns, nr) {
            self.confirm(idx, nr, handler);
            self.peers[idx].next_ns = nr;
        } else {
            log::warn!(
                target: "tiny_proto::fd",
                "peer {:?} sent out-of-range REJ N(R)={} (confirm_ns={}, last_ns={}), sending FRMR",
                addr, nr, confirm_ns, last_ns
            );
            self.enqueue_frmr(addr, incoming.encode());
        }
    }

    /// Frees every I-queue slot up to (not including) `nr`, firing `on_send`
    /// once per freed slot, and advances `confirm_ns`. Stops early (without
    /// reaching `nr`) if `confirm_ns` would run past `last_ns` — a stale or
    /// corrupted N(R) that acknowledges frames never sent — mirroring the
    /// original's out-of-sync guard rather than blindly converging
    /// `confirm_ns` to any `nr`.
    fn confirm(&mut self, idx: usize, nr: u8, handler: &mut dyn FdHandler) {
        let addr = self.peers[idx].addr;
        for _ in 0..8 {
            if self.peers[idx].confirm_ns == nr {
                break;
            }
            if self.peers[idx].confirm_ns == self.peers[idx].last_ns {
                log::warn!(
                    target: "tiny_proto::fd",
                    "peer {:?} N(R)={} is out of range (confirm_ns={}, last_ns={}), ignoring",
                    addr, nr, self.peers[idx].confirm_ns, self.peers[idx].last_ns
                );
                break;
            }
            let want_ns = self.peers[idx].confirm_ns;
            if let Some(slot) = self.i_queue.next(SlotKind::I, addr, Some(want_ns)) {
                let (_, _, payload) = self.i_queue.get(slot).expect("slot just matched");
                let payload = payload.to_vec();
                self.i_queue.free(slot);
                handler.on_send(addr, &payload);
            }
            self.peers[idx].confirm_ns = (self.peers[idx].confirm_ns + 1) & 0x07;
        }
    }

    fn enter_connected(&mut self, idx: usize, handler: &mut dyn FdHandler) {
        let now = now_ms();
        let peer = &mut self.peers[idx];
        peer.state = PeerConnState::Connected;
        peer.confirm_ns = 0;
        peer.last_ns = 0;
        peer.next_ns = 0;
        peer.next_nr = 0;
        peer.sent_nr = 0;
        peer.sent_reject = false;
        peer.retries_left = self.config.retries;
        peer.last_i_ts = now;
        peer.last_ka_ts = now;
        peer.ka_confirmed = true;
        let addr = peer.addr;
        self.i_queue.reset_for(addr);
        self.stats.connects += 1;
        log::debug!(target: "tiny_proto::fd", "peer {:?} connected", addr);
        handler.on_connect_event(addr, true);
    }

    fn enter_disconnected(&mut self, idx: usize, handler: &mut dyn FdHandler) {
        let addr = self.peers[idx].addr;
        self.peers[idx].state = PeerConnState::Disconnected;
        self.i_queue.reset_for(addr);
        self.stats.disconnects += 1;
        log::debug!(target: "tiny_proto::fd", "peer {:?} disconnected", addr);
        handler.on_connect_event(addr, false);
    }

    fn begin_connect(&mut self, idx: usize, now: u64) {
        self.peers[idx].state = PeerConnState::Connecting;
        self.peers[idx].retries_left = self.config.retries;
        self.peers[idx].last_i_ts = now;
        let addr = self.peers[idx].addr;
        let tag = match self.config.mode {
            Mode::Abm => TAG_SABM,
            Mode::Nrm => TAG_SNRM,
        };
        log::debug!(target: "tiny_proto::fd", "connecting to peer {:?}", addr);
        self.enqueue_u(addr, tag);
    }

    // ---- transmit path -----------------------------------------------

    pub fn run_tx_step(&mut self, out: &mut [u8], handler: &mut dyn FdHandler) -> usize {
        if self.hdlc.tx_busy() {
            return self.drive_hdlc_tx(out, handler);
        }

        self.run_timers(handler);

        if self.has_marker {
            if let Some(frame) = self.pick_next_frame() {
                if self.hdlc.put(frame).is_ok() {
                    self.stats.frames_sent += 1;
                    return self.drive_hdlc_tx(out, handler);
                }
            }
        } else if self.is_primary() && now_ms().saturating_sub(self.last_marker_ts) >= self.config.retry_timeout_ms {
            self.has_marker = true;
            self.last_marker_ts = now_ms();
        }
        0
    }

    fn drive_hdlc_tx(&mut self, out: &mut [u8], handler: &mut dyn FdHandler) -> usize {
        let mut collector = Collector::new();
        let n = self.hdlc.run_tx(out, &mut collector);
        if !collector.sent.is_empty() {
            self.after_frame_sent(handler);
        }
        n
    }

    fn after_frame_sent(&mut self, _handler: &mut dyn FdHandler) {
        if self.config.mode == Mode::Nrm {
            self.has_marker = false;
            if self.is_primary() {
                self.advance_next_peer();
                self.has_marker = true;
            }
            self.last_marker_ts = now_ms();
        }
    }

    fn advance_next_peer(&mut self) {
        if self.peers.is_empty() {
            return;
        }
        self.next_peer = (self.next_peer + 1) % self.peers.len();
    }

    fn run_timers(&mut self, handler: &mut dyn FdHandler) {
        let now = now_ms();
        for idx in 0..self.peers.len() {
            match self.peers[idx].state {
                PeerConnState::Connected => {
                    let has_unconfirmed = self.peers[idx].confirm_ns != self.peers[idx].next_ns;
                    let all_sent = self.peers[idx].next_ns == self.peers[idx].last_ns;
                    if has_unconfirmed
                        && all_sent
                        && now.saturating_sub(self.peers[idx].last_i_ts) >= self.config.retry_timeout_ms
                    {
                        let addr = self.peers[idx].addr;
                        if self.peers[idx].retries_left > 0 {
                            self.peers[idx].retries_left -= 1;
                            self.peers[idx].next_ns = self.peers[idx].confirm_ns;
                            self.peers[idx].last_i_ts = now;
                            self.stats.retries_issued += 1;
                            log::debug!(
                                target: "tiny_proto::fd",
                                "retry timeout for peer {:?}, {} retries left",
                                addr, self.peers[idx].retries_left
                            );
                        } else {
                            log::warn!(target: "tiny_proto::fd", "peer {:?} exhausted retries, disconnecting", addr);
                            self.enter_disconnected(idx, handler);
                            continue;
                        }
                    }
                    if now.saturating_sub(self.peers[idx].last_ka_ts) >= self.config.ka_timeout_ms {
                        let addr = self.peers[idx].addr;
                        if !self.peers[idx].ka_confirmed {
                            log::warn!(target: "tiny_proto::fd", "peer {:?} missed keep-alive, disconnecting", addr);
                            self.enter_disconnected(idx, handler);
                        } else {
                            log::debug!(target: "tiny_proto::fd", "sending keep-alive to peer {:?}", addr);
                            self.enqueue_u_or_s(idx, TAG_RR);
                            self.peers[idx].last_ka_ts = now;
                            self.peers[idx].ka_confirmed = false;
                        }
                    }
                }
                PeerConnState::Disconnected => {
                    if self.is_primary() && now.saturating_sub(self.peers[idx].last_i_ts) >= self.config.retry_timeout_ms {
                        self.begin_connect(idx, now);
                    }
                }
                _ => {}
            }
        }
    }

    /// (a) S/U-queue for the current peer, (b) the I-queue slot at
    /// `next_ns`, (c) in NRM with nothing pending, a fabricated RR/SNRM
    /// purely to pass the marker along.
    fn pick_next_frame(&mut self) -> Option<Vec<u8>> {
        if self.peers.is_empty() {
            return None;
        }
        let idx = self.next_peer.min(self.peers.len() - 1);
        let addr = self.peers[idx].addr;

        if let Some(slot) = self.su_queue.next(SlotKind::U | SlotKind::S, addr, None) {
            let (slot_addr, tag, payload) = self.su_queue.get(slot).expect("slot just matched");
            let payload = payload.to_vec();
            let control = self.encode_tagged(idx, tag, &payload);
            let wire_addr = slot_addr;
            self.su_queue.free(slot);
            let wire_payload = if tag == TAG_FRMR { payload } else { Vec::new() };
            return Some(build_wire_frame(wire_addr, control, &wire_payload));
        }

        let next_ns = self.peers[idx].next_ns;
        if let Some(slot) = self.i_queue.next(SlotKind::I, addr, Some(next_ns)) {
            let (slot_addr, _, payload) = self.i_queue.get(slot).expect("slot just matched");
            let payload = payload.to_vec();
            let control = Control::Info {
                ns: next_ns,
                nr: self.peers[idx].next_nr,
                pf: true,
            }
            .encode();
            self.peers[idx].next_ns = (self.peers[idx].next_ns + 1) & 0x07;
            self.peers[idx].sent_nr = self.peers[idx].next_nr;
            self.peers[idx].last_i_ts = now_ms();
            return Some(build_wire_frame(slot_addr, control, &payload));
        }

        if self.config.mode == Mode::Nrm {
            let control = if self.peers[idx].state == PeerConnState::Connected {
                Control::Supervisory {
                    kind: SupervisoryKind::ReceiveReady,
                    nr: self.peers[idx].next_nr,
                    pf: true,
                }
                .encode()
            } else {
                Control::Unnumbered { kind: UnnumberedKind::Snrm, pf: true }.encode()
            };
            return Some(build_wire_frame(addr, control, &[]));
        }
        None
    }

    fn encode_tagged(&self, idx: usize, tag: u8, payload: &[u8]) -> u8 {
        let nr = self.peers[idx].next_nr;
        match tag {
            TAG_SABM => Control::Unnumbered { kind: UnnumberedKind::Sabm, pf: true }.encode(),
            TAG_SNRM => Control::Unnumbered { kind: UnnumberedKind::Snrm, pf: true }.encode(),
            TAG_DISC => Control::Unnumbered { kind: UnnumberedKind::Disc, pf: true }.encode(),
            TAG_UA => Control::Unnumbered { kind: UnnumberedKind::Ua, pf: true }.encode(),
            TAG_RSET => Control::Unnumbered { kind: UnnumberedKind::Rset, pf: true }.encode(),
            TAG_FRMR => {
                let _ = payload;
                Control::Unnumbered { kind: UnnumberedKind::Frmr, pf: true }.encode()
            }
            TAG_RR => Control::Supervisory { kind: SupervisoryKind::ReceiveReady, nr, pf: true }.encode(),
            TAG_REJ => Control::Supervisory { kind: SupervisoryKind::Reject, nr, pf: true }.encode(),
            _ => unreachable!("internal tag"),
        }
    }

    fn enqueue_u(&mut self, addr: Address, tag: u8) {
        let command = matches!(tag, TAG_SABM | TAG_SNRM | TAG_DISC);
        let wire_addr = Address::new(addr.station(), command);
        let _ = self.su_queue.allocate(SlotKind::U, wire_addr, tag, &[]);
    }

    fn enqueue_s(&mut self, addr: Address, tag: u8) {
        let wire_addr = Address::new(addr.station(), false);
        let _ = self.su_queue.allocate(SlotKind::S, wire_addr, tag, &[]);
    }

    fn enqueue_u_or_s(&mut self, idx: usize, tag: u8) {
        let addr = self.peers[idx].addr;
        match tag {
            TAG_RR => self.enqueue_s(addr, TAG_RR),
            _ => self.enqueue_u(addr, tag),
        }
    }

    fn enqueue_frmr(&mut self, addr: Address, reason: u8) {
        let wire_addr = Address::new(addr.station(), false);
        let _ = self.su_queue.allocate(SlotKind::U, wire_addr, TAG_FRMR, &[reason]);
    }
}

fn build_wire_frame(addr: Address, control: u8, payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(2 + payload.len());
    v.push(addr.0);
    v.push(control);
    v.extend_from_slice(payload);
    v
}

/// True if `nr` lies within the inclusive window `[confirm_ns, upper]`
/// modulo 8, where `upper` is the highest N(S) the peer could legitimately
/// be acknowledging (`last_ns` for a REJ's rewind target).
fn in_window(confirm_ns: u8, upper: u8, nr: u8) -> bool {
    let span = (upper.wrapping_sub(confirm_ns)) & 0x07;
    let offset = (nr.wrapping_sub(confirm_ns)) & 0x07;
    offset <= span
}
