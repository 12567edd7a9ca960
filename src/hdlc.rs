//! HDLC-LL: the byte-level framer. Independent TX and RX state machines
//! sharing one context, per spec.md §4.2.
//!
//! The escape-latch algorithm lets `run_tx` make forward progress one byte
//! at a time across however many calls the caller needs. Frame-completion
//! callbacks are expressed as a trait object rather than raw function
//! pointers.
//!
//! `put()` takes an owned `Vec<u8>` instead of borrowing a caller-owned
//! buffer that must outlive `on_frame_sent`: one `Vec` allocation per frame
//! keeps the borrow-until-callback contract out of the API entirely.

use crate::crc::{Crc, CrcKind};
use crate::error::{Error, Result};

const FLAG: u8 = 0x7E;
const ESC: u8 = 0x7D;
const ESC_XOR: u8 = 0x20;
const FILL: u8 = 0xFF;

/// Receives decoded frames and send-completion notifications from an
/// [`HdlcLl`] instance: a small, object-safe seam between the codec and
/// whatever owns the link.
pub trait FrameSink {
    /// A full frame was decoded and its CRC verified; `payload` excludes the
    /// trailing FCS bytes.
    fn on_frame_read(&mut self, payload: &[u8]);

    /// The frame previously handed to [`HdlcLl::put`] has been fully
    /// written to the TX byte stream.
    fn on_frame_sent(&mut self, payload: &[u8]);

    /// A recoverable RX error occurred; the machine keeps running. Default
    /// implementation ignores it.
    fn on_rx_error(&mut self, _err: Error) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    ReadStart,
    ReadData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    Start,
    Data,
    Crc,
    End,
}

/// Which state machine(s) [`HdlcLl::reset`] should clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    TxOnly,
    RxOnly,
    Both,
}

/// The byte-level HDLC framer: one TX machine, one RX machine, sharing a
/// CRC algorithm selection.
#[derive(Debug)]
pub struct HdlcLl {
    crc_kind: CrcKind,
    max_frame_len: usize,

    rx_state: RxState,
    rx_buf: Vec<u8>,
    rx_escape: bool,
    rx_overflow: bool,
    rx_out_of_sync: u64,

    tx_state: TxState,
    tx_payload: Option<Vec<u8>>,
    tx_pos: usize,
    tx_pending_escape: Option<u8>,
    tx_crc_bytes: [u8; 4],
    tx_crc_len: usize,
    tx_crc_pos: usize,
}

impl HdlcLl {
    pub fn new(crc_kind: CrcKind, max_frame_len: usize) -> Self {
        HdlcLl {
            crc_kind,
            max_frame_len,
            rx_state: RxState::ReadStart,
            rx_buf: Vec::with_capacity(max_frame_len),
            rx_escape: false,
            rx_overflow: false,
            rx_out_of_sync: 0,
            tx_state: TxState::Idle,
            tx_payload: None,
            tx_pos: 0,
            tx_pending_escape: None,
            tx_crc_bytes: [0; 4],
            tx_crc_len: 0,
            tx_crc_pos: 0,
        }
    }

    pub fn out_of_sync_count(&self) -> u64 {
        self.rx_out_of_sync
    }

    /// Queues `payload` for transmission. Fails with `Busy` if a previous
    /// frame has not finished sending, `InvalidData` if `payload` is empty.
    pub fn put(&mut self, payload: Vec<u8>) -> Result<()> {
        if payload.is_empty() {
            return Err(Error::InvalidData);
        }
        if self.tx_state != TxState::Idle {
            return Err(Error::Busy);
        }
        let crc = crc_over(self.crc_kind, &payload);
        self.tx_crc_len = self.crc_kind.width_bytes();
        for i in 0..self.tx_crc_len {
            self.tx_crc_bytes[i] = (crc >> (8 * i)) as u8;
        }
        self.tx_payload = Some(payload);
        self.tx_pos = 0;
        self.tx_crc_pos = 0;
        self.tx_pending_escape = None;
        self.tx_state = TxState::Start;
        Ok(())
    }

    pub fn tx_busy(&self) -> bool {
        self.tx_state != TxState::Idle
    }

    /// Drains encoded bytes into `out`, returning how many were written.
    /// Makes forward progress one output byte at a time so a caller with a
    /// one-byte buffer still completes the frame eventually.
    pub fn run_tx(&mut self, out: &mut [u8], sink: &mut dyn FrameSink) -> usize {
        let mut written = 0;
        while written < out.len() {
            match self.tx_state {
                TxState::Idle => break,
                TxState::Start => {
                    out[written] = FLAG;
                    written += 1;
                    self.tx_state = TxState::Data;
                }
                TxState::Data => {
                    if let Some(b) = self.tx_pending_escape.take() {
                        out[written] = b;
                        written += 1;
                        continue;
                    }
                    let payload = self.tx_payload.as_ref().expect("payload set while Data");
                    if self.tx_pos >= payload.len() {
                        self.tx_state = TxState::Crc;
                        continue;
                    }
                    let byte = payload[self.tx_pos];
                    self.tx_pos += 1;
                    emit_escaped(byte, &mut out[written..], &mut written, &mut self.tx_pending_escape);
                }
                TxState::Crc => {
                    if let Some(b) = self.tx_pending_escape.take() {
                        out[written] = b;
                        written += 1;
                        continue;
                    }
                    if self.tx_crc_pos >= self.tx_crc_len {
                        self.tx_state = TxState::End;
                        continue;
                    }
                    let byte = self.tx_crc_bytes[self.tx_crc_pos];
                    self.tx_crc_pos += 1;
                    emit_escaped(byte, &mut out[written..], &mut written, &mut self.tx_pending_escape);
                }
                TxState::End => {
                    out[written] = FLAG;
                    written += 1;
                    let payload = self.tx_payload.take().expect("payload set while End");
                    self.tx_state = TxState::Idle;
                    sink.on_frame_sent(&payload);
                }
            }
        }
        written
    }

    /// Feeds received bytes through the RX machine, invoking `sink` for
    /// every completed frame and every recoverable error.
    pub fn run_rx(&mut self, bytes: &[u8], sink: &mut dyn FrameSink) {
        for &byte in bytes {
            match self.rx_state {
                RxState::ReadStart => {
                    if byte == FLAG {
                        self.rx_buf.clear();
                        self.rx_escape = false;
                        self.rx_overflow = false;
                        self.rx_state = RxState::ReadData;
                    } else if byte != FILL {
                        self.rx_out_of_sync += 1;
                        sink.on_rx_error(Error::OutOfSync);
                    }
                }
                RxState::ReadData => {
                    if byte == FLAG {
                        // ReadEnd, folded in: no byte of its own to consume.
                        if self.rx_buf.is_empty() {
                            // Two adjacent flags: stay in ReadData for the next frame.
                            self.rx_state = RxState::ReadData;
                            continue;
                        }
                        self.finish_frame(sink);
                        self.rx_state = RxState::ReadStart;
                        // The FLAG that ended this frame also opens the next one.
                        self.rx_buf.clear();
                        self.rx_escape = false;
                        self.rx_overflow = false;
                        self.rx_state = RxState::ReadData;
                    } else if byte == ESC {
                        self.rx_escape = true;
                    } else {
                        let stored = if self.rx_escape {
                            self.rx_escape = false;
                            byte ^ ESC_XOR
                        } else {
                            byte
                        };
                        if self.rx_buf.len() < self.max_frame_len {
                            self.rx_buf.push(stored);
                        } else {
                            self.rx_overflow = true;
                        }
                    }
                }
            }
        }
    }

    fn finish_frame(&mut self, sink: &mut dyn FrameSink) {
        if self.rx_overflow {
            sink.on_rx_error(Error::DataTooLarge);
            return;
        }
        let crc_len = self.crc_kind.width_bytes();
        if self.rx_buf.len() < crc_len {
            sink.on_rx_error(Error::DataTooLarge);
            return;
        }
        let mut c = Crc::new(self.crc_kind);
        c.update_block(&self.rx_buf);
        if !c.is_good() {
            sink.on_rx_error(Error::WrongCrc);
            return;
        }
        let payload_len = self.rx_buf.len() - crc_len;
        sink.on_frame_read(&self.rx_buf[..payload_len]);
    }

    pub fn reset(&mut self, scope: ResetScope) {
        match scope {
            ResetScope::TxOnly => self.reset_tx(),
            ResetScope::RxOnly => self.reset_rx(),
            ResetScope::Both => {
                self.reset_tx();
                self.reset_rx();
            }
        }
    }

    fn reset_tx(&mut self) {
        self.tx_state = TxState::Idle;
        self.tx_payload = None;
        self.tx_pos = 0;
        self.tx_pending_escape = None;
        self.tx_crc_pos = 0;
    }

    fn reset_rx(&mut self) {
        self.rx_state = RxState::ReadStart;
        self.rx_buf.clear();
        self.rx_escape = false;
        self.rx_overflow = false;
    }
}

fn crc_over(kind: CrcKind, payload: &[u8]) -> u32 {
    let mut c = Crc::new(kind);
    c.update_block(payload);
    c.finalize()
}

/// Writes one logical byte to `out[0]`, escaping it as `ESC, byte ^ 0x20` if
/// needed. If only one output slot is available and the byte must be
/// escaped, the second half is left in `pending` for the next call so a
/// one-byte-at-a-time caller still makes progress.
fn emit_escaped(byte: u8, out: &mut [u8], written: &mut usize, pending: &mut Option<u8>) {
    if byte == FLAG || byte == ESC {
        out[0] = ESC;
        *written += 1;
        *pending = Some(byte ^ ESC_XOR);
    } else {
        out[0] = byte;
        *written += 1;
    }
}
