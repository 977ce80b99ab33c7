//! The control surface consumed by external collaborators.
//!
//! [`ControlPort`] is the narrow command/query interface the UI layer
//! talks to: one production implementation ([`EngineHandle`]) and one
//! in-memory fake ([`FakeControl`]) so collaborators can be tested
//! without sockets or a running worker.

use std::sync::{Arc, Mutex};

use crate::engine::{ControllerSnapshot, EngineHandle};
use crate::error::BridgeError;
use crate::link::LinkState;
use crate::transport::TransportProtocol;

// ── ControlPort ──────────────────────────────────────────────────

/// The operations the bridge exposes to its collaborators.
pub trait ControlPort {
    /// Validate and apply a new transport target.
    fn configure_transport(
        &self,
        address: &str,
        port: &str,
        protocol: TransportProtocol,
    ) -> Result<(), BridgeError>;

    /// Update the frame send rate (Hz, clamped to 1..=8000).
    fn set_send_rate(&self, hz: u32) -> Result<(), BridgeError>;

    /// Snapshot of the current link state (poll every 100 ms).
    fn link_state(&self) -> LinkState;

    /// Request connect/disconnect (advisory).
    fn toggle_connection(&self) -> Result<(), BridgeError>;

    /// Request a forced resynchronization (advisory).
    fn request_sync(&self) -> Result<(), BridgeError>;

    /// Replace the controller snapshot to be replicated.
    fn update_state(&self, snapshot: ControllerSnapshot) -> Result<(), BridgeError>;

    fn touch_down(&self, pointer: i32, y: f32) -> Result<(), BridgeError>;
    fn touch_move(&self, pointer: i32, y: f32) -> Result<(), BridgeError>;
    fn touch_up(&self, pointer: i32) -> Result<(), BridgeError>;
}

impl ControlPort for EngineHandle {
    fn configure_transport(
        &self,
        address: &str,
        port: &str,
        protocol: TransportProtocol,
    ) -> Result<(), BridgeError> {
        EngineHandle::configure_transport(self, address, port, protocol)
    }

    fn set_send_rate(&self, hz: u32) -> Result<(), BridgeError> {
        EngineHandle::set_send_rate(self, hz)
    }

    fn link_state(&self) -> LinkState {
        EngineHandle::link_state(self)
    }

    fn toggle_connection(&self) -> Result<(), BridgeError> {
        EngineHandle::toggle_connection(self)
    }

    fn request_sync(&self) -> Result<(), BridgeError> {
        EngineHandle::request_sync(self)
    }

    fn update_state(&self, snapshot: ControllerSnapshot) -> Result<(), BridgeError> {
        EngineHandle::update_state(self, snapshot)
    }

    fn touch_down(&self, pointer: i32, y: f32) -> Result<(), BridgeError> {
        EngineHandle::touch_down(self, pointer, y)
    }

    fn touch_move(&self, pointer: i32, y: f32) -> Result<(), BridgeError> {
        EngineHandle::touch_move(self, pointer, y)
    }

    fn touch_up(&self, pointer: i32) -> Result<(), BridgeError> {
        EngineHandle::touch_up(self, pointer)
    }
}

// ── FakeControl ──────────────────────────────────────────────────

/// Recorded activity of a [`FakeControl`].
#[derive(Debug, Default)]
pub struct FakeControlLog {
    pub configs: Vec<(String, u16, TransportProtocol)>,
    pub send_rates: Vec<u32>,
    pub toggles: usize,
    pub syncs: usize,
    pub snapshots: Vec<ControllerSnapshot>,
    pub touches: Vec<(&'static str, i32)>,
}

/// In-memory [`ControlPort`] for testing collaborators.
///
/// Cloning shares the log and the scripted state, so a test keeps one
/// handle while the code under test holds the other.
#[derive(Debug, Clone, Default)]
pub struct FakeControl {
    log: Arc<Mutex<FakeControlLog>>,
    state: Arc<Mutex<LinkState>>,
}

impl FakeControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the state the next `link_state` call reports.
    pub fn set_link_state(&self, state: LinkState) {
        *self.state.lock().unwrap() = state;
    }

    /// Inspect everything the collaborator did.
    pub fn with_log<R>(&self, f: impl FnOnce(&FakeControlLog) -> R) -> R {
        f(&self.log.lock().unwrap())
    }
}

impl ControlPort for FakeControl {
    fn configure_transport(
        &self,
        address: &str,
        port: &str,
        protocol: TransportProtocol,
    ) -> Result<(), BridgeError> {
        let config = crate::transport::TransportConfig::new(address, port, protocol)?;
        let state = self.link_state();
        if !state.is_suspended() {
            return Err(BridgeError::ConfigLocked(state));
        }
        self.log
            .lock()
            .unwrap()
            .configs
            .push((config.address, config.port, config.protocol));
        Ok(())
    }

    fn set_send_rate(&self, hz: u32) -> Result<(), BridgeError> {
        self.log
            .lock()
            .unwrap()
            .send_rates
            .push(crate::transport::clamp_send_rate(hz));
        Ok(())
    }

    fn link_state(&self) -> LinkState {
        *self.state.lock().unwrap()
    }

    fn toggle_connection(&self) -> Result<(), BridgeError> {
        self.log.lock().unwrap().toggles += 1;
        Ok(())
    }

    fn request_sync(&self) -> Result<(), BridgeError> {
        self.log.lock().unwrap().syncs += 1;
        Ok(())
    }

    fn update_state(&self, snapshot: ControllerSnapshot) -> Result<(), BridgeError> {
        self.log.lock().unwrap().snapshots.push(snapshot);
        Ok(())
    }

    fn touch_down(&self, pointer: i32, _y: f32) -> Result<(), BridgeError> {
        self.log.lock().unwrap().touches.push(("down", pointer));
        Ok(())
    }

    fn touch_move(&self, pointer: i32, _y: f32) -> Result<(), BridgeError> {
        self.log.lock().unwrap().touches.push(("move", pointer));
        Ok(())
    }

    fn touch_up(&self, pointer: i32) -> Result<(), BridgeError> {
        self.log.lock().unwrap().touches.push(("up", pointer));
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_records_commands() {
        let fake = FakeControl::new();
        let port: &dyn ControlPort = &fake;

        port.configure_transport("10.0.0.2", "24864", TransportProtocol::Udp)
            .unwrap();
        port.set_send_rate(99_999).unwrap();
        port.toggle_connection().unwrap();
        port.request_sync().unwrap();
        port.touch_down(1, 40.0).unwrap();
        port.touch_up(1).unwrap();

        fake.with_log(|log| {
            assert_eq!(log.configs, vec![("10.0.0.2".into(), 24864, TransportProtocol::Udp)]);
            assert_eq!(log.send_rates, vec![8000]); // clamped
            assert_eq!(log.toggles, 1);
            assert_eq!(log.syncs, 1);
            assert_eq!(log.touches, vec![("down", 1), ("up", 1)]);
        });
    }

    #[test]
    fn fake_validates_like_production() {
        let fake = FakeControl::new();
        assert!(fake.configure_transport("host.name", "1", TransportProtocol::Udp).is_err());
        assert!(fake.configure_transport("1.2.3.4", "99999", TransportProtocol::Udp).is_err());

        // Config edits are locked outside Suspended, like the engine.
        fake.set_link_state(LinkState::Active);
        assert!(matches!(
            fake.configure_transport("1.2.3.4", "80", TransportProtocol::Udp),
            Err(BridgeError::ConfigLocked(LinkState::Active))
        ));
    }

    #[test]
    fn fake_reports_scripted_state() {
        let fake = FakeControl::new();
        assert_eq!(fake.link_state(), LinkState::Suspended);
        fake.set_link_state(LinkState::Active);
        assert_eq!(fake.link_state(), LinkState::Active);
    }
}
