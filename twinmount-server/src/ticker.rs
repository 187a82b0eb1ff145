//! Fire-control ticker
//!
//! Re-evaluates both firing solutions on a fixed cadence, independent of
//! bus traffic, and when transmitting sends one aim command per gun. A
//! failed send is logged and reported; the next tick sends a fresh
//! solution instead of repeating the old one.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_graceful_shutdown::SubsystemHandle;

use twinmount_core::protocol::{encode_aim_command, AimCommand, BusIds};
use twinmount_core::targeting::FiringSolution;
use twinmount_core::Side;

use crate::bus::{BusError, BusHandle};
use crate::Session;

pub struct FireControlTicker {
    session: Session,
    bus: Arc<BusHandle>,
    ids: BusIds,
    interval: Duration,
    transmit: bool,
}

impl FireControlTicker {
    pub fn new(session: Session, bus: Arc<BusHandle>) -> FireControlTicker {
        let (ids, interval, transmit) = {
            let inner = session.read();
            let transmit = inner.args.transmit && !inner.args.is_replay();
            if inner.args.transmit && !transmit {
                log::warn!("Replay mode, not sending aim commands");
            }
            (
                inner.config.bus.clone(),
                inner.config.tick_interval(&inner.args),
                transmit,
            )
        };
        FireControlTicker {
            session,
            bus,
            ids,
            interval,
            transmit,
        }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), BusError> {
        log::debug!(
            "Fire control every {:?}, transmit {}",
            self.interval,
            self.transmit
        );
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    log::debug!("Fire control shutdown");
                    return Ok(());
                },
                _ = interval.tick() => {
                    self.tick();
                },
            }
        }
    }

    /// One evaluation. Returns the guns whose aim command could not be sent.
    pub fn tick(&self) -> Vec<(Side, BusError)> {
        let solutions = {
            let mut inner = self.session.write();
            inner.targeting.tick();
            if log::log_enabled!(log::Level::Debug) {
                match serde_json::to_string(&inner.targeting.snapshot()) {
                    Ok(json) => log::debug!("{}", json),
                    Err(e) => log::debug!("Snapshot not serializable: {}", e),
                }
            }
            Side::ALL.map(|side| (side, inner.targeting.solution(side)))
        };

        if !self.transmit {
            return Vec::new();
        }
        solutions
            .into_iter()
            .filter_map(|(side, solution)| {
                self.send_aim(side, &solution)
                    .err()
                    .map(|e| (side, e))
            })
            .collect()
    }

    fn send_aim(&self, side: Side, solution: &FiringSolution) -> Result<(), BusError> {
        let command = AimCommand::from_solution(side, solution);
        let frame = encode_aim_command(&self.ids, &command)?;
        if let Err(e) = self.bus.send(&frame) {
            log::error!("{} gun aim command not sent: {}", side, e);
            return Err(e);
        }
        Ok(())
    }
}
