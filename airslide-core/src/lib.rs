//! # airslide-core
//!
//! Core library for the airslide touch-to-sensor bridge.
//!
//! Turns continuous multi-touch gestures into the discrete sensor states
//! expected by a playfield-emulation peer, and streams those states as
//! fixed-format binary frames over a network socket.
//!
//! This crate contains:
//! - **Zones**: `air_zones` / `slide_zones` — pointer positions to discrete
//!   sensor-zone activations, with sensitivity-scaled pairing bands
//! - **Frames**: `Frame`, `FrameType`, `FrameEncode` — byte-exact wire
//!   frames with a strict card > event > state priority
//! - **Cabinet**: `ButtonMask`, `AccessCode`, `CabinetState`
//! - **Link**: `LinkState`, `LinkSupervisor` — the suspend/sync/active
//!   connection state machine
//! - **Transport**: `FrameSink` implementations over UDP and framed TCP
//! - **Engine**: `BridgeEngine` — the single worker task that owns the
//!   socket and paces frame transmission
//! - **Error**: `BridgeError` — typed, `thiserror`-based error hierarchy

pub mod cabinet;
pub mod codec;
pub mod control;
pub mod engine;
pub mod error;
pub mod flick;
pub mod frame;
pub mod link;
pub mod transport;
pub mod zones;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use cabinet::{AccessCode, ButtonMask, CabinetState};
pub use codec::WireCodec;
pub use control::{ControlPort, FakeControl};
pub use engine::{BridgeEngine, ControllerSnapshot, EngineHandle};
pub use error::BridgeError;
pub use flick::FlickDetector;
pub use frame::{
    AirOutput, BasicEncoder, EncodeInput, Frame, FrameEncode, FrameType, RichEncoder, SyncAck,
    encode_frame,
};
pub use link::{LinkState, LinkSupervisor, POLL_INTERVAL};
pub use transport::{
    DEFAULT_SEND_RATE, FrameSink, MemorySink, TcpSink, TransportConfig, TransportProtocol,
    UdpSink, clamp_send_rate,
};
pub use zones::{PointerSample, SensitivityConfig, ZoneSet, air_zones, slide_zones};
