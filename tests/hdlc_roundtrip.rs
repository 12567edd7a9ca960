//! Round-trip and boundary-behavior checks for the HDLC-LL framer.

use proptest::prelude::*;
use tiny_proto::crc::CrcKind;
use tiny_proto::hdlc::{FrameSink, HdlcLl};

#[derive(Default)]
struct Recorder {
    frames: Vec<Vec<u8>>,
}

impl FrameSink for Recorder {
    fn on_frame_read(&mut self, payload: &[u8]) {
        self.frames.push(payload.to_vec());
    }
    fn on_frame_sent(&mut self, _payload: &[u8]) {}
}

fn encode(kind: CrcKind, payload: &[u8]) -> Vec<u8> {
    let mut hdlc = HdlcLl::new(kind, payload.len() + 8);
    let mut sink = Recorder::default();
    hdlc.put(payload.to_vec()).unwrap();
    let mut wire = Vec::new();
    loop {
        let mut buf = [0u8; 8];
        let n = hdlc.run_tx(&mut buf, &mut sink);
        if n == 0 {
            break;
        }
        wire.extend_from_slice(&buf[..n]);
    }
    wire
}

fn decode(kind: CrcKind, wire: &[u8]) -> Vec<Vec<u8>> {
    let mut hdlc = HdlcLl::new(kind, wire.len() + 8);
    let mut sink = Recorder::default();
    hdlc.run_rx(wire, &mut sink);
    sink.frames
}

proptest! {
    #[test]
    fn decode_of_encode_is_identity(
        payload in prop::collection::vec(any::<u8>(), 1..64),
        kind_idx in 0u8..4,
    ) {
        let kind = match kind_idx {
            0 => CrcKind::Off,
            1 => CrcKind::C8,
            2 => CrcKind::C16,
            _ => CrcKind::C32,
        };
        let wire = encode(kind, &payload);
        let decoded = decode(kind, &wire);
        prop_assert_eq!(decoded, vec![payload]);
    }

    #[test]
    fn one_byte_at_a_time_tx_produces_same_wire_as_bulk(
        payload in prop::collection::vec(any::<u8>(), 1..32),
    ) {
        let mut bulk = HdlcLl::new(CrcKind::C16, 64);
        let mut sink = Recorder::default();
        bulk.put(payload.clone()).unwrap();
        let mut bulk_wire = Vec::new();
        loop {
            let mut buf = [0u8; 64];
            let n = bulk.run_tx(&mut buf, &mut sink);
            if n == 0 { break; }
            bulk_wire.extend_from_slice(&buf[..n]);
        }

        let mut trickle = HdlcLl::new(CrcKind::C16, 64);
        trickle.put(payload).unwrap();
        let mut trickle_wire = Vec::new();
        loop {
            let mut buf = [0u8; 1];
            let n = trickle.run_tx(&mut buf, &mut sink);
            if n == 0 { break; }
            trickle_wire.push(buf[0]);
        }
        prop_assert_eq!(bulk_wire, trickle_wire);
    }
}

#[test]
fn escape_sequence_matches_documented_wire_bytes() {
    let wire = encode(CrcKind::Off, &[0x7E, 0x7D]);
    assert_eq!(wire, vec![0x7E, 0x7D, 0x5E, 0x7D, 0x5D, 0x7E]);
    assert_eq!(decode(CrcKind::Off, &wire), vec![vec![0x7E, 0x7D]]);
}

#[test]
fn double_flag_discards_empty_frame_without_error() {
    let frames = decode(CrcKind::Off, &[0x7E, 0x7E, 0x01, 0x02, 0x7E]);
    assert_eq!(frames, vec![vec![0x01, 0x02]]);
}

#[test]
fn stray_fill_between_frames_yields_no_callback() {
    let frames = decode(CrcKind::Off, &[0xFF, 0xFF, 0xFF, 0x7E, 0xAB, 0x7E]);
    assert_eq!(frames, vec![vec![0xAB]]);
}

#[test]
fn single_send_crc_off_scenario() {
    let wire = encode(CrcKind::Off, &[0x01, 0x02, 0x03]);
    assert_eq!(wire, vec![0x7E, 0x01, 0x02, 0x03, 0x7E]);
}

#[test]
fn crc_mismatch_is_silently_discarded() {
    let mut wire = encode(CrcKind::C32, &[0xAA, 0xBB, 0xCC]);
    let flip_at = wire.len() - 2;
    wire[flip_at] ^= 0x01;
    assert!(decode(CrcKind::C32, &wire).is_empty());
}
