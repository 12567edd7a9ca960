//! Dumps the wire bytes HDLC-LL produces for a payload containing both
//! escapable bytes, matching spec.md's escape-round-trip scenario.

use tiny_proto::crc::CrcKind;
use tiny_proto::hdlc::{FrameSink, HdlcLl};

struct Printer;
impl FrameSink for Printer {
    fn on_frame_read(&mut self, payload: &[u8]) {
        println!("decoded: {:02x?}", payload);
    }
    fn on_frame_sent(&mut self, payload: &[u8]) {
        println!("sent (original payload): {:02x?}", payload);
    }
}

fn main() {
    env_logger::init();

    let mut hdlc = HdlcLl::new(CrcKind::Off, 64);
    let mut sink = Printer;
    hdlc.put(vec![0x7E, 0x7D]).expect("queue frame");

    let mut wire = Vec::new();
    loop {
        let mut buf = [0u8; 1];
        let n = hdlc.run_tx(&mut buf, &mut sink);
        if n == 0 {
            break;
        }
        wire.extend_from_slice(&buf[..n]);
    }
    print!("wire:");
    for b in &wire {
        print!(" {:02x}", b);
    }
    println!();

    let mut rx = HdlcLl::new(CrcKind::Off, 64);
    rx.run_rx(&wire, &mut sink);
}
