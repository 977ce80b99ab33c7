//! The bridge engine: one worker task that owns the socket.
//!
//! The engine is constructed once at process start and threaded through
//! the components that need it as an explicit [`EngineHandle`] — there
//! is no process-global instance. The worker is the only place socket
//! lifecycle happens, so open/rebind/close are naturally serialized.
//!
//! Per tick (at the configured send rate) the worker:
//! 1. drains any sync acknowledgements from the sink,
//! 2. expires an overdue sync request,
//! 3. sends one frame chosen by link state — Syncing → sync frame,
//!    Active → the latest encoded controller snapshot, Suspended →
//!    nothing.
//!
//! Fast snapshot updates between ticks coalesce: the wire protocol is
//! state replication, not an event log, so only the latest state needs
//! to reach the peer.

use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::flick::{FlickDetector, SAMPLE_INTERVAL};
use crate::frame::{AirOutput, EncodeInput, Frame, FrameEncode, RichEncoder};
use crate::link::{LinkState, LinkSupervisor};
use crate::transport::{
    FrameSink, TcpSink, TransportConfig, TransportProtocol, UdpSink, clamp_send_rate,
    send_interval,
};
use crate::zones::ZoneSet;
use crate::cabinet::CabinetState;

/// Command channel depth. Bursts beyond this coalesce by dropping the
/// oldest-style updates at the sender (logged, not fatal).
const COMMAND_DEPTH: usize = 64;

// ── ControllerSnapshot ───────────────────────────────────────────

/// Everything the UI collaborator reports per input frame.
#[derive(Debug, Clone, Default)]
pub struct ControllerSnapshot {
    pub cabinet: CabinetState,
    pub air: ZoneSet,
    pub slide: ZoneSet,
    pub air_output: AirOutput,
}

// ── Commands ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Configure(TransportConfig),
    SetSendRate(u32),
    Toggle,
    Sync,
    UpdateState(ControllerSnapshot),
    TouchDown(i32, f32),
    TouchMove(i32, f32),
    TouchUp(i32),
    Shutdown,
}

// ── EngineHandle ─────────────────────────────────────────────────

/// Cloneable handle to a running engine worker.
///
/// Input-path methods never block on network I/O — they enqueue a
/// command and return. Link state is observed through a snapshot
/// ([`link_state`](Self::link_state)) or a subscription
/// ([`subscribe`](Self::subscribe)), never shared memory.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<LinkState>,
}

impl EngineHandle {
    fn push(&self, command: Command) -> Result<(), BridgeError> {
        match self.commands.try_send(command) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(BridgeError::EngineStopped),
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                // The worker is briefly behind; the dropped update is
                // superseded by the next one (state replication, not an
                // event log).
                debug!("command queue full, dropping {cmd:?}");
                Ok(())
            }
        }
    }

    /// Validate and apply a new transport target.
    ///
    /// Validation failures surface here, synchronously, as does an
    /// attempt to edit outside the Suspended state (rebinding a live
    /// socket is never allowed). The worker re-checks the state when
    /// the command lands, so a racing toggle cannot slip an edit in.
    pub fn configure_transport(
        &self,
        address: &str,
        port: &str,
        protocol: TransportProtocol,
    ) -> Result<(), BridgeError> {
        let config = TransportConfig::new(address, port, protocol)?;
        let state = self.link_state();
        if !state.is_suspended() {
            return Err(BridgeError::ConfigLocked(state));
        }
        self.push(Command::Configure(config))
    }

    /// Update the send rate (clamped into 1..=8000 Hz).
    pub fn set_send_rate(&self, hz: u32) -> Result<(), BridgeError> {
        self.push(Command::SetSendRate(clamp_send_rate(hz)))
    }

    /// Latest published link state.
    pub fn link_state(&self) -> LinkState {
        *self.state_rx.borrow()
    }

    /// Subscribe to link-state changes.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state_rx.clone()
    }

    /// Request connect (when Suspended) or disconnect (when Active).
    /// Advisory — observers see the outcome on their next poll.
    pub fn toggle_connection(&self) -> Result<(), BridgeError> {
        self.push(Command::Toggle)
    }

    /// Request a forced resynchronization with the peer.
    pub fn request_sync(&self) -> Result<(), BridgeError> {
        self.push(Command::Sync)
    }

    /// Replace the controller snapshot that Active ticks encode.
    pub fn update_state(&self, snapshot: ControllerSnapshot) -> Result<(), BridgeError> {
        self.push(Command::UpdateState(snapshot))
    }

    pub fn touch_down(&self, pointer: i32, y: f32) -> Result<(), BridgeError> {
        self.push(Command::TouchDown(pointer, y))
    }

    pub fn touch_move(&self, pointer: i32, y: f32) -> Result<(), BridgeError> {
        self.push(Command::TouchMove(pointer, y))
    }

    pub fn touch_up(&self, pointer: i32) -> Result<(), BridgeError> {
        self.push(Command::TouchUp(pointer))
    }

    /// Stop the worker. Idempotent; safe to call after shutdown.
    pub fn shutdown(&self) {
        let _ = self.commands.try_send(Command::Shutdown);
    }
}

// ── BridgeEngine ─────────────────────────────────────────────────

/// Factory for the engine worker task.
pub struct BridgeEngine;

impl BridgeEngine {
    /// Spawn a worker with no sink; frames flow once a transport is
    /// configured and the link toggled up.
    pub fn spawn(send_rate_hz: u32) -> EngineHandle {
        Self::spawn_inner(send_rate_hz, None)
    }

    /// Spawn a worker over an existing sink (tests and embedding).
    pub fn spawn_with_sink<S: FrameSink + 'static>(send_rate_hz: u32, sink: S) -> EngineHandle {
        Self::spawn_inner(send_rate_hz, Some(Box::new(sink)))
    }

    fn spawn_inner(send_rate_hz: u32, sink: Option<Box<dyn FrameSink>>) -> EngineHandle {
        let (commands, command_rx) = mpsc::channel(COMMAND_DEPTH);
        let (state_tx, state_rx) = watch::channel(LinkState::Suspended);

        let worker = Worker {
            commands: command_rx,
            state_tx,
            sink,
            supervisor: LinkSupervisor::new(),
            snapshot: ControllerSnapshot::default(),
            flick: FlickDetector::new(),
            protocol: TransportProtocol::default(),
            send_rate_hz: clamp_send_rate(send_rate_hz),
        };
        tokio::spawn(worker.run());

        EngineHandle { commands, state_rx }
    }
}

// ── Worker ───────────────────────────────────────────────────────

struct Worker {
    commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<LinkState>,
    sink: Option<Box<dyn FrameSink>>,
    supervisor: LinkSupervisor,
    snapshot: ControllerSnapshot,
    flick: FlickDetector,
    protocol: TransportProtocol,
    send_rate_hz: u32,
}

impl Worker {
    async fn run(mut self) {
        info!("engine worker up at {} Hz", self.send_rate_hz);

        let mut send_tick = tokio::time::interval(send_interval(self.send_rate_hz));
        send_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut flick_tick = tokio::time::interval(SAMPLE_INTERVAL);
        flick_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut flick_byte = 0u8;

        loop {
            let mut rate_change = None;

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        None | Some(Command::Shutdown) => break,
                        Some(Command::SetSendRate(hz)) => rate_change = Some(hz),
                        Some(command) => self.handle(command).await,
                    }
                }
                _ = send_tick.tick() => self.on_send_tick(flick_byte).await,
                _ = flick_tick.tick() => {
                    if self.snapshot.air_output == AirOutput::Flick {
                        flick_byte = self.flick.sample();
                    }
                }
            }

            if let Some(hz) = rate_change {
                self.send_rate_hz = hz;
                send_tick = tokio::time::interval(send_interval(hz));
                send_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                debug!("send rate now {hz} Hz");
            }

            self.publish_state();
        }

        // Dropping the sink closes the socket; a send racing this stop
        // fails as a transient and is ignored by the sink itself.
        self.sink = None;
        info!("engine worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Configure(config) => self.apply_config(config).await,
            Command::Toggle => self.supervisor.toggle(),
            Command::Sync => self.supervisor.begin_sync(Instant::now()),
            Command::UpdateState(snapshot) => self.snapshot = snapshot,
            Command::TouchDown(pointer, y) => self.flick.touch_down(pointer, y),
            Command::TouchMove(pointer, y) => self.flick.touch_move(pointer, y),
            Command::TouchUp(pointer) => self.flick.touch_up(pointer),
            // Handled in the select loop.
            Command::SetSendRate(_) | Command::Shutdown => {}
        }
    }

    /// Rebinding a live socket is never allowed; configuration edits
    /// are only honoured while the link is Suspended.
    async fn apply_config(&mut self, config: TransportConfig) {
        let state = self.supervisor.state();
        if !state.is_suspended() {
            warn!("transport edit rejected: link is {state}");
            return;
        }

        let target = match config.socket_addr() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("transport config unusable: {e}");
                return;
            }
        };

        let sink: Result<Box<dyn FrameSink>, BridgeError> = match config.protocol {
            TransportProtocol::Udp => UdpSink::connect(target)
                .await
                .map(|s| Box::new(s) as Box<dyn FrameSink>),
            TransportProtocol::Tcp => TcpSink::connect(target)
                .await
                .map(|s| Box::new(s) as Box<dyn FrameSink>),
        };

        match sink {
            Ok(sink) => {
                self.protocol = config.protocol;
                self.sink = Some(sink);
                info!("transport bound to {target} ({})", config.protocol);
            }
            Err(e) => warn!("transport bind failed: {e}"),
        }
    }

    async fn on_send_tick(&mut self, flick_byte: u8) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        while let Some(ack) = sink.try_recv_ack() {
            self.supervisor.on_ack(ack.confirmed);
        }
        self.supervisor.poll_deadline(Instant::now());

        match self.supervisor.state() {
            LinkState::Syncing => {
                if let Some(target) = self.supervisor.sync_target() {
                    sink.send(&Frame::sync(target, self.protocol)).await;
                }
            }
            LinkState::Active => {
                let frame = RichEncoder::new(self.protocol).encode(&EncodeInput {
                    cabinet: self.snapshot.cabinet.clone(),
                    air: self.snapshot.air,
                    slide: self.snapshot.slide,
                    air_output: self.snapshot.air_output,
                    flick_byte,
                });
                sink.send(&frame).await;
            }
            LinkState::Suspended => {}
        }
    }

    fn publish_state(&self) {
        let state = self.supervisor.state();
        self.state_tx.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────
