//! Field bus access
//!
//! The physical bus is reached through a [`BusTransport`]: either a
//! CAN-to-UDP gateway or a recorded candump log. The process holds exactly
//! one [`BusHandle`]; it opens the transport once and keeps it until the
//! process exits. Reopening the bus after every send drives the adapter into
//! bus-off, so a failed open is remembered and never retried.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use twinmount_core::protocol::{BusFrame, ProtocolError};

use crate::Cli;

mod replay;
mod udp;

pub use replay::{parse_candump_line, ReplayTransport};
pub use udp::{decode_datagram, encode_datagram, UdpGateway, DATAGRAM_LEN};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Bus unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed gateway datagram: {0}")]
    MalformedDatagram(String),

    #[error("Replay line {line}: {reason}")]
    Replay { line: usize, reason: String },

    #[error("End of replay")]
    EndOfReplay,

    #[error("Sending is not possible on {0}")]
    SendRefused(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// One bus connection, shared between the receiver and the command sender
pub trait BusTransport: Send + Sync {
    /// Wait up to `timeout` for the next frame. `Ok(None)` means nothing
    /// arrived in time.
    fn recv(&self, timeout: Duration) -> Result<Option<BusFrame>, BusError>;

    fn send(&self, frame: &BusFrame) -> Result<(), BusError>;

    fn name(&self) -> String;
}

/// Where the bus is
#[derive(Debug, Clone, PartialEq)]
pub enum BusTarget {
    Gateway { bind: SocketAddr, gateway: SocketAddr },
    Replay(PathBuf),
    None,
}

impl BusTarget {
    pub fn from_args(args: &Cli) -> BusTarget {
        if let Some(path) = &args.replay {
            BusTarget::Replay(path.clone())
        } else if let Some(gateway) = args.gateway {
            BusTarget::Gateway {
                bind: args.bind,
                gateway,
            }
        } else {
            BusTarget::None
        }
    }

    fn open(&self) -> Result<Arc<dyn BusTransport>, BusError> {
        match self {
            BusTarget::Gateway { bind, gateway } => {
                Ok(Arc::new(UdpGateway::open(*bind, *gateway)?))
            }
            BusTarget::Replay(path) => Ok(Arc::new(ReplayTransport::open(path)?)),
            BusTarget::None => Err(BusError::Unavailable(
                "no gateway or replay file configured".to_string(),
            )),
        }
    }
}

enum HandleState {
    Unopened,
    Open(Arc<dyn BusTransport>),
    Failed(String),
}

pub struct BusHandle {
    target: BusTarget,
    state: Mutex<HandleState>,
}

impl BusHandle {
    pub fn new(target: BusTarget) -> BusHandle {
        BusHandle {
            target,
            state: Mutex::new(HandleState::Unopened),
        }
    }

    /// Wrap an already open transport
    pub fn with_transport(transport: Arc<dyn BusTransport>) -> BusHandle {
        BusHandle {
            target: BusTarget::None,
            state: Mutex::new(HandleState::Open(transport)),
        }
    }

    /// The transport, opening it on first use
    pub fn get(&self) -> Result<Arc<dyn BusTransport>, BusError> {
        let mut state = self.state.lock().unwrap();
        match &*state {
            HandleState::Open(transport) => return Ok(transport.clone()),
            HandleState::Failed(reason) => return Err(BusError::Unavailable(reason.clone())),
            HandleState::Unopened => {}
        }

        match self.target.open() {
            Ok(transport) => {
                log::info!("Bus open on {}", transport.name());
                *state = HandleState::Open(transport.clone());
                Ok(transport)
            }
            Err(e) => {
                log::error!("Cannot open bus: {}", e);
                *state = HandleState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock().unwrap(), HandleState::Open(_))
    }

    /// Send one frame. Failures are returned, never retried.
    pub fn send(&self, frame: &BusFrame) -> Result<(), BusError> {
        let transport = self.get()?;
        transport.send(frame)?;
        log::trace!(
            "{}: sent 0x{:03X} {:02X?}",
            transport.name(),
            frame.id(),
            frame.payload()
        );
        Ok(())
    }
}
