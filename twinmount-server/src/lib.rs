//! Twin Mount Server
//!
//! Process side of the fire-control console. Owns the field bus, runs the
//! blocking receiver that feeds decoded telemetry into the targeting engine,
//! and the periodic ticker that re-evaluates both firing solutions and
//! optionally commands the guns.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use twinmount_core::targeting::Targeting;
use twinmount_core::telemetry::ModuleBoard;

pub mod bus;
pub mod receiver;
pub mod settings;
pub mod tables;
pub mod ticker;

use settings::Config;

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Configuration file (JSON); defaults to the per-user config directory
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Firing table CSV, overrides the configuration file
    #[arg(long)]
    pub firing_table: Option<PathBuf>,

    /// Slope correction table CSV, overrides the configuration file
    #[arg(long)]
    pub slope_table: Option<PathBuf>,

    /// Address of the CAN-to-UDP gateway
    #[arg(short, long)]
    pub gateway: Option<SocketAddr>,

    /// Local address to receive gateway datagrams on
    #[arg(long, default_value = "0.0.0.0:20000")]
    pub bind: SocketAddr,

    /// Replay a candump log instead of using a live bus
    #[arg(short, long, conflicts_with = "gateway")]
    pub replay: Option<PathBuf>,

    /// Send aim commands to the guns
    #[arg(long, default_value_t = false)]
    pub transmit: bool,

    /// Fire-control tick interval in milliseconds, overrides the configuration file
    #[arg(long)]
    pub tick_ms: Option<u64>,
}

impl Cli {
    pub fn is_replay(&self) -> bool {
        self.replay.is_some()
    }
}

pub struct SessionInner {
    pub args: Cli,
    pub config: Config,
    pub targeting: Targeting,
    pub modules: ModuleBoard,
}

/// State shared between the bus receiver and the fire-control ticker
#[derive(Clone)]
pub struct Session(Arc<RwLock<SessionInner>>);

impl Session {
    pub fn new(args: Cli, config: Config, targeting: Targeting) -> Self {
        Session(Arc::new(RwLock::new(SessionInner {
            args,
            config,
            targeting,
            modules: ModuleBoard::new(),
        })))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.0.read().unwrap()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.0.write().unwrap()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use twinmount_core::tables::{FiringTable, TableSet};
    use twinmount_core::targeting::TargetingConfig;

    pub fn session(extra_args: &[&str]) -> Session {
        let mut argv = vec!["twinmount-server"];
        argv.extend_from_slice(extra_args);
        let args = Cli::parse_from(argv);

        let firing = FiringTable::from_reader("X,P\n1000,100\n3000,300\n".as_bytes()).unwrap();
        let targeting = Targeting::new(
            TargetingConfig::default(),
            TableSet::new(Some(firing), None),
        );
        Session::new(args, Config::default(), targeting)
    }
}
