//! Controller frame encoding.
//!
//! Every frame is a fixed-length byte sequence: a 1-byte discriminator
//! followed by a type-specific payload, all multi-byte fields
//! little-endian.
//!
//! ```text
//! type  meaning  payload
//! 0x00  Sync     1 byte: requested state (0x80 suspend, 0x30 activate)
//! 0x10  Event    1 byte: bit0 coin, bit1 service, bit2 test
//! 0x20  State    1 byte air bitmask (bit k-1 ⇒ zone k, k ∈ 1..6)
//!                + 4 bytes slide bitmask (bit k-1 ⇒ zone k, k ∈ 1..32)
//! 0x30  Card     10 bytes packed BCD of the 20-digit access code
//! ```
//!
//! When the stream framing variant is selected the discriminator
//! additionally carries `0x80` in its top bit.
//!
//! Exactly one frame type is produced per encode, by strict priority:
//! card (present + valid code) over event (any button) over state.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::cabinet::{ButtonMask, CabinetState};
use crate::error::BridgeError;
use crate::link::LinkState;
use crate::transport::TransportProtocol;
use crate::zones::ZoneSet;

// ── FrameType ────────────────────────────────────────────────────

/// Frame discriminator, stored in bits 4-5 of byte 0.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Handshake / resync request.
    Sync = 0x00,
    /// Cabinet button event.
    Event = 0x10,
    /// Air + slide sensor state.
    State = 0x20,
    /// Card access code.
    Card = 0x30,
}

impl FrameType {
    /// Total frame length on the wire, discriminator included.
    pub const fn wire_len(self) -> usize {
        match self {
            FrameType::Sync | FrameType::Event => 2,
            FrameType::State => 6,
            FrameType::Card => 11,
        }
    }
}

impl TryFrom<u8> for FrameType {
    type Error = BridgeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0x30 {
            0x00 => Ok(FrameType::Sync),
            0x10 => Ok(FrameType::Event),
            0x20 => Ok(FrameType::State),
            0x30 => Ok(FrameType::Card),
            _ => unreachable!(),
        }
    }
}

// ── AirOutput ────────────────────────────────────────────────────

/// How the state frame's air byte is produced.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AirOutput {
    /// Bitmask of the activated air zones.
    #[default]
    Bitmask = 1,
    /// Output of the flick sampler (see [`crate::flick`]).
    Flick = 2,
}

impl TryFrom<u32> for AirOutput {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AirOutput::Bitmask),
            2 => Ok(AirOutput::Flick),
            _ => Err(BridgeError::UnknownVariant {
                type_name: "AirOutput",
                value: value as u64,
            }),
        }
    }
}

// ── Frame ────────────────────────────────────────────────────────

/// One immutable, ready-to-send wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    fn discriminator(frame_type: FrameType, protocol: TransportProtocol) -> u8 {
        let protocol_bit = match protocol {
            TransportProtocol::Udp => 0x00,
            TransportProtocol::Tcp => 0x80,
        };
        protocol_bit | frame_type as u8
    }

    /// Build a sync frame requesting the peer confirm `target`.
    pub fn sync(target: LinkState, protocol: TransportProtocol) -> Self {
        let mut buf = BytesMut::with_capacity(FrameType::Sync.wire_len());
        buf.put_u8(Self::discriminator(FrameType::Sync, protocol));
        buf.put_u8(match target {
            LinkState::Suspended => 1 << 7,
            _ => (1 << 5) | (1 << 4),
        });
        Self(buf.freeze())
    }

    /// Build an event frame from the button mask.
    pub fn event(buttons: ButtonMask, protocol: TransportProtocol) -> Self {
        let mut buf = BytesMut::with_capacity(FrameType::Event.wire_len());
        buf.put_u8(Self::discriminator(FrameType::Event, protocol));
        buf.put_u8(buttons.bits());
        Self(buf.freeze())
    }

    /// Build a state frame from a raw air byte and slide mask.
    pub fn state(air_byte: u8, slide_mask: u32, protocol: TransportProtocol) -> Self {
        let mut buf = BytesMut::with_capacity(FrameType::State.wire_len());
        buf.put_u8(Self::discriminator(FrameType::State, protocol));
        buf.put_u8(air_byte);
        buf.put_u32_le(slide_mask);
        Self(buf.freeze())
    }

    /// Build a card frame from packed BCD.
    pub fn card(bcd: [u8; 10], protocol: TransportProtocol) -> Self {
        let mut buf = BytesMut::with_capacity(FrameType::Card.wire_len());
        buf.put_u8(Self::discriminator(FrameType::Card, protocol));
        buf.put_slice(&bcd);
        Self(buf.freeze())
    }

    pub fn frame_type(&self) -> FrameType {
        // Infallible: every 2-bit discriminator maps to a type.
        FrameType::try_from(self.0[0]).unwrap_or(FrameType::Sync)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Zone bitmasks ────────────────────────────────────────────────

/// Air zones 1..=6 as a mask byte; out-of-range IDs are dropped, not
/// rejected, to tolerate stale sets during configuration changes.
pub fn air_mask(zones: &ZoneSet) -> u8 {
    let mut mask = 0u8;
    for id in zones.iter() {
        if (1..=6).contains(&id) {
            mask |= 1 << (id - 1);
        }
    }
    mask
}

/// Slide zones 1..=32 as a mask word; out-of-range IDs are dropped.
pub fn slide_mask(zones: &ZoneSet) -> u32 {
    let mut mask = 0u32;
    for id in zones.iter() {
        if (1..=32).contains(&id) {
            mask |= 1 << (id - 1);
        }
    }
    mask
}

// ── FrameEncode ──────────────────────────────────────────────────

/// Everything an encoder needs to build one outgoing frame.
#[derive(Debug, Clone, Default)]
pub struct EncodeInput {
    pub cabinet: CabinetState,
    pub air: ZoneSet,
    pub slide: ZoneSet,
    pub air_output: AirOutput,
    /// Latest flick-sampler byte; used instead of the air bitmask
    /// while [`AirOutput::Flick`] is selected.
    pub flick_byte: u8,
}

/// A frame encoder: one valid input, exactly one frame out.
///
/// Two implementations exist: [`RichEncoder`] (the system of record,
/// card- and button-aware) and [`BasicEncoder`] (state frames only,
/// for peers that predate the card/button extension).
pub trait FrameEncode {
    fn encode(&self, input: &EncodeInput) -> Frame;
}

/// The canonical encoder: full card > event > state priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct RichEncoder {
    pub protocol: TransportProtocol,
}

impl RichEncoder {
    pub fn new(protocol: TransportProtocol) -> Self {
        Self { protocol }
    }
}

impl FrameEncode for RichEncoder {
    fn encode(&self, input: &EncodeInput) -> Frame {
        let cabinet = &input.cabinet;

        if cabinet.card_present {
            match &cabinet.access_code {
                Some(code) => return Frame::card(code.to_bcd(), self.protocol),
                // Card held without a usable code: fall through to the
                // event/state paths rather than fault.
                None => warn!("card present but no valid access code configured"),
            }
        }

        if !cabinet.buttons.is_empty() {
            return Frame::event(cabinet.buttons, self.protocol);
        }

        let air_byte = match input.air_output {
            AirOutput::Bitmask => air_mask(&input.air),
            AirOutput::Flick => input.flick_byte,
        };
        Frame::state(air_byte, slide_mask(&input.slide), self.protocol)
    }
}

/// Reduced-feature encoder: sensor state only, no card or button
/// frames. Kept as an alternate implementation of the same interface
/// for peers speaking the simplified protocol variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEncoder {
    pub protocol: TransportProtocol,
}

impl BasicEncoder {
    pub fn new(protocol: TransportProtocol) -> Self {
        Self { protocol }
    }
}

impl FrameEncode for BasicEncoder {
    fn encode(&self, input: &EncodeInput) -> Frame {
        let air_byte = match input.air_output {
            AirOutput::Bitmask => air_mask(&input.air),
            AirOutput::Flick => input.flick_byte,
        };
        Frame::state(air_byte, slide_mask(&input.slide), self.protocol)
    }
}

/// Encode one frame with the canonical encoder over the datagram
/// flavour — the plain-function surface offered to collaborators that
/// do not hold an encoder instance.
pub fn encode_frame(cabinet: &CabinetState, air: &ZoneSet, slide: &ZoneSet) -> Frame {
    RichEncoder::default().encode(&EncodeInput {
        cabinet: cabinet.clone(),
        air: *air,
        slide: *slide,
        ..Default::default()
    })
}

// ── SyncAck ──────────────────────────────────────────────────────

/// The peer's 2-byte reply to a sync frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncAck {
    /// The state the peer confirms: Suspended or Active.
    pub confirmed: LinkState,
}

impl SyncAck {
    /// Parse a datagram as a sync acknowledgement.
    ///
    /// Anything that is not a well-formed ack returns `None` — stray
    /// traffic on the socket is ignored, not an error.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 2 {
            return None;
        }
        let header = bytes[0];
        if (header >> 6) & 1 != 1 || header & 0x30 != 0 {
            return None;
        }
        let confirmed = if (bytes[1] >> 4) & 1 == 1 {
            LinkState::Active
        } else {
            LinkState::Suspended
        };
        Some(Self { confirmed })
    }
}

// ── Tests ────────────────────────────────────────────────────────
