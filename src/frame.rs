//! HDLC control-field and address-byte encoding, per spec.md §3.
//!
//! Wire encode/decode lives as small free functions and methods on plain
//! structs rather than trait methods.

/// Address byte mask that excludes the C/R bit, used when matching a
/// station regardless of whether the frame is a command or a response.
pub const ADDRESS_MATCH_MASK: u8 = 0xFC;

const ADDRESS_EXTENSION_BIT: u8 = 0x01;
const ADDRESS_CR_BIT: u8 = 0x02;

/// The wire address byte: a 6-bit station number, the command/response bit
/// and the (always-set, in this implementation) extension bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address(pub u8);

impl Address {
    /// Address byte used by the primary station (`0xFF`).
    pub const PRIMARY: Address = Address(0xFF);

    /// Builds an address byte for `station` (0..=63), setting the
    /// command/response bit and the extension bit.
    pub fn new(station: u8, command: bool) -> Address {
        let cr = if command { ADDRESS_CR_BIT } else { 0 };
        Address(((station & 0x3F) << 2) | cr | ADDRESS_EXTENSION_BIT)
    }

    pub fn station(self) -> u8 {
        (self.0 >> 2) & 0x3F
    }

    pub fn is_command(self) -> bool {
        self.0 & ADDRESS_CR_BIT != 0
    }

    /// The extension bit must be 1; frames without it are unsupported
    /// extended-format frames and are ignored by the caller.
    pub fn has_extension(self) -> bool {
        self.0 & ADDRESS_EXTENSION_BIT != 0
    }

    /// Address compared ignoring the C/R bit, the matching rule FrameQueue
    /// lookups and peer-table lookups use.
    pub fn matches(self, other: Address) -> bool {
        self.0 & ADDRESS_MATCH_MASK == other.0 & ADDRESS_MATCH_MASK
    }
}

/// Supervisory frame subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisoryKind {
    ReceiveReady,
    Reject,
}

/// Unnumbered frame subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnnumberedKind {
    Sabm,
    Snrm,
    Disc,
    Ua,
    Frmr,
    Rset,
}

/// A decoded HDLC control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Info { ns: u8, nr: u8, pf: bool },
    Supervisory { kind: SupervisoryKind, nr: u8, pf: bool },
    Unnumbered { kind: UnnumberedKind, pf: bool },
}

const PF_BIT: u8 = 0x10;

impl Control {
    pub fn poll_final(self) -> bool {
        match self {
            Control::Info { pf, .. } => pf,
            Control::Supervisory { pf, .. } => pf,
            Control::Unnumbered { pf, .. } => pf,
        }
    }

    pub fn with_poll_final(self, pf: bool) -> Control {
        match self {
            Control::Info { ns, nr, .. } => Control::Info { ns, nr, pf },
            Control::Supervisory { kind, nr, .. } => Control::Supervisory { kind, nr, pf },
            Control::Unnumbered { kind, .. } => Control::Unnumbered { kind, pf },
        }
    }

    pub fn encode(self) -> u8 {
        match self {
            Control::Info { ns, nr, pf } => {
                ((nr & 0x07) << 5) | (if pf { PF_BIT } else { 0 }) | ((ns & 0x07) << 1)
            }
            Control::Supervisory { kind, nr, pf } => {
                let type_bits = match kind {
                    SupervisoryKind::ReceiveReady => 0x00,
                    SupervisoryKind::Reject => 0x04,
                };
                ((nr & 0x07) << 5) | (if pf { PF_BIT } else { 0 }) | type_bits | 0x01
            }
            Control::Unnumbered { kind, pf } => {
                let base = match kind {
                    UnnumberedKind::Sabm => 0x2C,
                    UnnumberedKind::Snrm => 0x80,
                    UnnumberedKind::Disc => 0x40,
                    UnnumberedKind::Ua => 0x60,
                    UnnumberedKind::Frmr => 0x84,
                    UnnumberedKind::Rset => 0x8C,
                };
                (base & !PF_BIT) | (if pf { PF_BIT } else { 0 }) | 0x03
            }
        }
    }

    pub fn decode(byte: u8) -> Option<Control> {
        let pf = byte & PF_BIT != 0;
        if byte & 0x01 == 0 {
            // I-frame
            let ns = (byte >> 1) & 0x07;
            let nr = (byte >> 5) & 0x07;
            return Some(Control::Info { ns, nr, pf });
        }
        if byte & 0x03 == 0x01 {
            // S-frame
            let nr = (byte >> 5) & 0x07;
            let kind = match byte & 0x0C {
                0x00 => SupervisoryKind::ReceiveReady,
                0x04 => SupervisoryKind::Reject,
                _ => return None,
            };
            return Some(Control::Supervisory { kind, nr, pf });
        }
        // U-frame: match against the byte with P/F masked out.
        let base = byte & !PF_BIT;
        let kind = match base {
            0x2F => UnnumberedKind::Sabm,
            0x83 => UnnumberedKind::Snrm,
            0x43 => UnnumberedKind::Disc,
            0x63 => UnnumberedKind::Ua,
            0x87 => UnnumberedKind::Frmr,
            0x8F => UnnumberedKind::Rset,
            _ => return None,
        };
        Some(Control::Unnumbered { kind, pf })
    }
}
