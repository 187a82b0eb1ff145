//! CAN-to-UDP gateway transport
//!
//! Each datagram carries one CAN frame in a fixed 13-byte layout:
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | Arbitration id, big-endian              |
//! | 4      | 1    | Data length, 0..=8                      |
//! | 5      | 8    | Data, unused bytes zero                 |

use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use twinmount_core::protocol::{BusFrame, MAX_PAYLOAD};

use super::{BusError, BusTransport};

pub const DATAGRAM_LEN: usize = 13;
const HEADER_LEN: usize = 5;

// A zero read timeout means "block forever" to the OS
const MIN_RECV_TIMEOUT: Duration = Duration::from_millis(1);

pub fn decode_datagram(buf: &[u8], arrival_ms: u64) -> Result<BusFrame, BusError> {
    if buf.len() != DATAGRAM_LEN {
        return Err(BusError::MalformedDatagram(format!(
            "{} bytes, expected {}",
            buf.len(),
            DATAGRAM_LEN
        )));
    }
    let id = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let len = buf[4] as usize;
    if len > MAX_PAYLOAD {
        return Err(BusError::MalformedDatagram(format!(
            "id 0x{:03X} length {}",
            id, len
        )));
    }
    Ok(BusFrame::new(id, &buf[HEADER_LEN..HEADER_LEN + len], arrival_ms)?)
}

pub fn encode_datagram(frame: &BusFrame) -> [u8; DATAGRAM_LEN] {
    let mut buf = [0u8; DATAGRAM_LEN];
    buf[0..4].copy_from_slice(&frame.id().to_be_bytes());
    buf[4] = frame.len() as u8;
    buf[HEADER_LEN..HEADER_LEN + frame.len()].copy_from_slice(frame.payload());
    buf
}

pub struct UdpGateway {
    socket: UdpSocket,
    gateway: SocketAddr,
    started: Instant,
}

impl UdpGateway {
    pub fn open(bind: SocketAddr, gateway: SocketAddr) -> io::Result<UdpGateway> {
        let socket = Socket::new(Domain::for_address(bind), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&bind.into())?;

        let socket: UdpSocket = socket.into();
        log::debug!("{} via {}: listening for bus frames", gateway, bind);
        Ok(UdpGateway {
            socket,
            gateway,
            started: Instant::now(),
        })
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl BusTransport for UdpGateway {
    fn recv(&self, timeout: Duration) -> Result<Option<BusFrame>, BusError> {
        self.socket
            .set_read_timeout(Some(timeout.max(MIN_RECV_TIMEOUT)))?;

        let mut buf = [0u8; 64];
        let (len, from) = match self.socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(None);
            }
            Err(e) => return Err(BusError::Io(e)),
        };
        if from.ip() != self.gateway.ip() {
            log::trace!("Ignoring datagram from {}", from);
            return Ok(None);
        }

        match decode_datagram(&buf[..len], self.elapsed_ms()) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                log::warn!("{}: {} {:02X?}", self.gateway, e, &buf[..len]);
                Ok(None)
            }
        }
    }

    fn send(&self, frame: &BusFrame) -> Result<(), BusError> {
        let buf = encode_datagram(frame);
        self.socket.send_to(&buf, self.gateway)?;
        Ok(())
    }

    fn name(&self) -> String {
        format!("gateway {}", self.gateway)
    }
}
