//! Two ABM endpoints exchanging a handful of packets over an in-process
//! byte-pipe channel, with logging set up via `env_logger`.

use std::collections::VecDeque;
use std::time::Duration;

use tiny_proto::crc::CrcKind;
use tiny_proto::endpoint::{Channel, Endpoint};
use tiny_proto::fd::{Config, FdHandler, Mode};
use tiny_proto::frame::Address;

struct Pipe {
    inbox: VecDeque<u8>,
}

impl Pipe {
    fn new() -> Self {
        Pipe { inbox: VecDeque::new() }
    }
}

impl Channel for Pipe {
    fn write(&mut self, bytes: &[u8]) -> i32 {
        self.inbox.extend(bytes);
        bytes.len() as i32
    }
    fn read(&mut self, buf: &mut [u8]) -> i32 {
        let mut n = 0;
        while n < buf.len() {
            match self.inbox.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n as i32
    }
}

struct PrintHandler(&'static str);
impl FdHandler for PrintHandler {
    fn on_read(&mut self, addr: Address, payload: &[u8]) {
        println!("[{}] received {:?} from {:?}", self.0, payload, addr);
    }
    fn on_send(&mut self, addr: Address, payload: &[u8]) {
        println!("[{}] acked {} bytes to {:?}", self.0, payload.len(), addr);
    }
    fn on_connect_event(&mut self, addr: Address, connected: bool) {
        println!("[{}] {:?} connected={}", self.0, addr, connected);
    }
}

fn main() {
    env_logger::init();

    let primary_addr = Address::PRIMARY;
    let secondary_addr = Address::new(1, false);

    let primary = Endpoint::new(Config {
        mtu: 64,
        window_frames: 4,
        crc_type: CrcKind::C16,
        send_timeout_ms: 2000,
        retry_timeout_ms: 100,
        ka_timeout_ms: 5000,
        retries: 3,
        addr: primary_addr,
        peers: vec![secondary_addr],
        mode: Mode::Abm,
    });
    let secondary = Endpoint::new(Config {
        mtu: 64,
        window_frames: 4,
        crc_type: CrcKind::C16,
        send_timeout_ms: 2000,
        retry_timeout_ms: 100,
        ka_timeout_ms: 5000,
        retries: 3,
        addr: secondary_addr,
        peers: vec![primary_addr],
        mode: Mode::Abm,
    });

    let mut to_secondary = Pipe::new();
    let mut to_primary = Pipe::new();
    let mut primary_handler = PrintHandler("primary");
    let mut secondary_handler = PrintHandler("secondary");

    for round in 0..200 {
        if round == 5 {
            let _ = primary.send_packet(secondary_addr, b"hello", Duration::from_millis(500));
        }

        let mut buf = [0u8; 256];
        let n = primary.run_tx(&mut buf, &mut primary_handler);
        if n > 0 {
            to_secondary.write(&buf[..n]);
        }
        let n = secondary.run_tx(&mut buf, &mut secondary_handler);
        if n > 0 {
            to_primary.write(&buf[..n]);
        }

        let mut rx = [0u8; 256];
        let n = to_secondary.read(&mut rx);
        if n > 0 {
            secondary.run_rx(&rx[..n as usize], &mut secondary_handler);
        }
        let n = to_primary.read(&mut rx);
        if n > 0 {
            primary.run_rx(&rx[..n as usize], &mut primary_handler);
        }
    }

    println!("primary stats: {:?}", primary.stats());
    println!("secondary stats: {:?}", secondary.stats());
}
