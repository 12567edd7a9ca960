//! # tiny-proto
//!
//! An HDLC-derived framed-transport and reliable-delivery stack for
//! resource-constrained serial links between microcontrollers, or between a
//! controller and a host.
//!
//! Two layers do essentially all of the work:
//!
//! - [`hdlc`]: the byte-level framer — start/stop flagging, byte stuffing
//!   and frame-check-sequence handling ([`crc`]).
//! - [`fd`]: a sliding-window ARQ layer riding on the framer, giving
//!   ordered, at-most-once delivery with Asynchronous Balanced Mode
//!   (peer-to-peer) or Normal Response Mode (primary polling secondaries).
//!
//! [`endpoint::Endpoint`] is the top-level handle most callers want: it
//! wires the ARQ engine to a host-supplied [`endpoint::Channel`] under the
//! mutex/event-group concurrency model described in the module docs of
//! [`endpoint`].
//!
//! ```no_run
//! use tiny_proto::endpoint::{Endpoint, Channel};
//! use tiny_proto::fd::{Config, Mode, FdHandler};
//! use tiny_proto::frame::Address;
//! use tiny_proto::crc::CrcKind;
//! use std::time::Duration;
//!
//! struct Logger;
//! impl FdHandler for Logger {
//!     fn on_read(&mut self, addr: Address, payload: &[u8]) {
//!         println!("{:?}: {} bytes", addr, payload.len());
//!     }
//!     fn on_send(&mut self, _addr: Address, _payload: &[u8]) {}
//!     fn on_connect_event(&mut self, addr: Address, connected: bool) {
//!         println!("{:?} connected={}", addr, connected);
//!     }
//! }
//!
//! let secondary = Address::new(1, false);
//! let endpoint = Endpoint::new(Config {
//!     mtu: 64,
//!     window_frames: 4,
//!     crc_type: CrcKind::C16,
//!     send_timeout_ms: 1000,
//!     retry_timeout_ms: 200,
//!     ka_timeout_ms: 2000,
//!     retries: 3,
//!     addr: Address::PRIMARY,
//!     peers: vec![secondary],
//!     mode: Mode::Abm,
//! });
//! let _ = endpoint.send_packet(secondary, b"hello", Duration::from_millis(100));
//! ```

pub mod crc;
pub mod endpoint;
pub mod error;
pub mod fd;
pub mod frame;
pub mod hal;
pub mod hdlc;
pub mod queue;

pub use error::{Error, Result};
