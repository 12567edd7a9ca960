//! A primary polling two secondaries in Normal Response Mode, dumping the
//! raw wire bytes so the P/F bit pattern described in spec.md's scenario 6
//! (every primary command bears P=1, every secondary response bears F=1)
//! can be eyeballed.

use tiny_proto::crc::CrcKind;
use tiny_proto::endpoint::FdHandlerNoop;
use tiny_proto::fd::{Config, Mode};
use tiny_proto::frame::Address;

fn main() {
    env_logger::init();

    let primary_addr = Address::PRIMARY;
    let secondary1 = Address::new(1, false);
    let secondary2 = Address::new(2, false);

    let engine = tiny_proto::endpoint::Endpoint::new(Config {
        mtu: 32,
        window_frames: 2,
        crc_type: CrcKind::Off,
        send_timeout_ms: 500,
        retry_timeout_ms: 100,
        ka_timeout_ms: 2000,
        retries: 2,
        addr: primary_addr,
        peers: vec![secondary1, secondary2],
        mode: Mode::Nrm,
    });

    let mut handler = FdHandlerNoop;
    for _ in 0..20 {
        let mut buf = [0u8; 64];
        let n = engine.run_tx(&mut buf, &mut handler);
        if n > 0 {
            print!("primary -> wire:");
            for b in &buf[..n] {
                print!(" {:02x}", b);
            }
            println!();
        }
    }
}
