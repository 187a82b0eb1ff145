//! Bus receiver
//!
//! Blocks on the bus with a bounded timeout on a dedicated blocking thread,
//! decodes every frame and applies it to the shared session. Any bus error
//! stops this receiver only; targeting keeps running on the last values.

use std::sync::Arc;
use std::time::Duration;
use tokio_graceful_shutdown::SubsystemHandle;
use tokio_util::sync::CancellationToken;

use twinmount_core::protocol::{BusFrame, FrameDecoder, TelemetryEvent};

use crate::bus::{BusError, BusHandle};
use crate::Session;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);

pub struct BusReceiver {
    session: Session,
    bus: Arc<BusHandle>,
    decoder: FrameDecoder,
    frames: u64,
}

impl BusReceiver {
    pub fn new(session: Session, bus: Arc<BusHandle>) -> BusReceiver {
        let ids = session.read().config.bus.clone();
        BusReceiver {
            session,
            bus,
            decoder: FrameDecoder::new(ids),
            frames: 0,
        }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), BusError> {
        let cancel = subsys.create_cancellation_token();
        match tokio::task::spawn_blocking(move || self.receive_loop(&cancel)).await {
            Ok(frames) => {
                log::info!("Bus receiver stopped after {} frames", frames);
            }
            Err(e) => {
                log::error!("Bus receiver thread failed: {}", e);
            }
        }
        Ok(())
    }

    /// Receive until cancelled or the bus fails; returns the frame count
    pub fn receive_loop(mut self, cancel: &CancellationToken) -> u64 {
        let transport = match self.bus.get() {
            Ok(transport) => transport,
            Err(e) => {
                log::error!("Bus receiver not started: {}", e);
                return 0;
            }
        };
        log::debug!("{}: receiving", transport.name());

        while !cancel.is_cancelled() {
            match transport.recv(RECV_TIMEOUT) {
                Ok(Some(frame)) => {
                    self.frames += 1;
                    self.process_frame(&frame);
                }
                Ok(None) => {}
                Err(BusError::EndOfReplay) => {
                    log::info!("{}: end of replay", transport.name());
                    break;
                }
                Err(e) => {
                    log::error!("{}: receive error: {}", transport.name(), e);
                    break;
                }
            }
        }
        self.frames
    }

    /// Decode one frame and apply it. Returns true if shared state changed.
    pub fn process_frame(&self, frame: &BusFrame) -> bool {
        log::trace!("0x{:03X} {:02X?}", frame.id(), frame.payload());
        match self.decoder.decode(frame) {
            Ok(Some(TelemetryEvent::ModuleReading(reading))) => {
                self.session.write().modules.update(reading);
                true
            }
            Ok(Some(event)) => self.session.write().targeting.handle_event(&event),
            Ok(None) => false,
            // Already logged by the decoder
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockTransport;
    use crate::test_support::session;
    use twinmount_core::Side;

    fn frame(id: u32, data: &[u8]) -> BusFrame {
        BusFrame::new(id, data, 0).unwrap()
    }

    #[test]
    fn test_frames_reach_targeting_and_board() {
        let session = session(&[]);
        let mock = MockTransport::with_frames(vec![
            frame(0x200, &2.0f32.to_le_bytes()),
            frame(0x201, &30.0f32.to_le_bytes()),
            frame(0x105, &[2, 0x09, 0x60, 0x00, 0x64, 0x00, 0xF0, 41]),
            frame(0x220, &[0, 0x01, 0b0000_0011, 0, 0]),
            frame(0x7FF, &[1, 2, 3]),
        ]);
        let bus = Arc::new(BusHandle::with_transport(Arc::new(mock)));
        let receiver = BusReceiver::new(session.clone(), bus);

        // Stops by itself when the mock runs dry
        let frames = receiver.receive_loop(&CancellationToken::new());
        assert_eq!(frames, 5);

        let inner = session.read();
        let fix = inner.targeting.fix();
        assert!((fix.distance - 2000.0).abs() < 1e-3);
        assert!((fix.bearing_deg - 30.0).abs() < 1e-6);
        assert!(inner.targeting.solution(Side::Left).azimuth_deg > 0.0);

        let reading = inner.modules.get(5, 2).unwrap();
        assert!((reading.voltage - 24.0).abs() < 1e-4);
        assert!((reading.power - 24.0).abs() < 1e-4);
        assert_eq!(reading.temperature, 41);

        let rack = inner.targeting.state().gun(Side::Left).ammo.unwrap();
        assert_eq!(rack.slots(), vec![1, 2]);
    }

    #[test]
    fn test_unknown_side_code_changes_nothing() {
        let session = session(&[]);
        let bus = Arc::new(BusHandle::with_transport(Arc::new(MockTransport::default())));
        let receiver = BusReceiver::new(session.clone(), bus);
        assert!(!receiver.process_frame(&frame(0x220, &[0, 0x09, 0xFF, 0xFF, 0x03])));
        assert!(session.read().targeting.state().gun(Side::Left).ammo.is_none());
        assert!(session.read().targeting.state().gun(Side::Right).ammo.is_none());
    }

    #[test]
    fn test_cancelled_before_start() {
        let session = session(&[]);
        let mock = MockTransport::with_frames(vec![frame(0x200, &1.0f32.to_le_bytes())]);
        let bus = Arc::new(BusHandle::with_transport(Arc::new(mock)));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(BusReceiver::new(session, bus).receive_loop(&cancel), 0);
    }

    #[test]
    fn test_no_bus_stops_receiver_only() {
        let session = session(&[]);
        let bus = Arc::new(BusHandle::new(crate::bus::BusTarget::None));
        let receiver = BusReceiver::new(session.clone(), bus);
        assert_eq!(receiver.receive_loop(&CancellationToken::new()), 0);
        // Session still usable
        session.write().targeting.tick();
    }
}
