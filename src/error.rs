//! Error kinds shared by every layer of the protocol stack.

use thiserror::Error;

/// Errors returned by the HDLC-LL, FrameQueue and FD layers.
///
/// Framing/CRC errors (`WrongCrc`, `DataTooLarge`, `OutOfSync`) are
/// recoverable: the layer that returns them keeps running and the caller
/// may simply continue feeding bytes. Connection-level failures are not
/// returned here at all; they surface only through `on_connect_event`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Generic unrecoverable state error in the current call.
    #[error("operation failed")]
    Failed,

    /// A wait (e.g. inside `send_packet`) was exhausted without success.
    #[error("timed out waiting for a free window slot")]
    Timeout,

    /// A received frame exceeds the receive buffer, or a payload exceeds the MTU.
    #[error("frame exceeds buffer or MTU")]
    DataTooLarge,

    /// Caller passed a null/zero-length/misconfigured argument.
    #[error("invalid argument")]
    InvalidData,

    /// Operation cannot run concurrently with one already in flight.
    #[error("busy with a previous operation")]
    Busy,

    /// A stray byte was seen outside of a frame. Informational.
    #[error("byte received out of frame sync")]
    OutOfSync,

    /// Transient condition; the caller may retry shortly.
    #[error("try again later")]
    AgainLater,

    /// A received frame's CRC did not match; the frame was discarded.
    #[error("CRC mismatch, frame discarded")]
    WrongCrc,

    /// The addressed station is not registered in the peer table.
    #[error("unknown peer address")]
    UnknownPeer,
}

pub type Result<T> = core::result::Result<T, Error>;
