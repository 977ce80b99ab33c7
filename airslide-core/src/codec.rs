//! Stream codec for the framed TCP transport variant.
//!
//! Outbound: frames are fixed-length and self-describing, so encoding
//! is a plain byte copy. Inbound: the peer only ever sends 2-byte sync
//! acknowledgements; anything that does not parse as one is discarded
//! to keep the stream in sync.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BridgeError;
use crate::frame::{Frame, SyncAck};

/// Codec pairing outgoing [`Frame`]s with incoming [`SyncAck`]s.
#[derive(Debug, Default)]
pub struct WireCodec;

impl Encoder<Frame> for WireCodec {
    type Error = BridgeError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(item.as_bytes());
        Ok(())
    }
}

impl Decoder for WireCodec {
    type Item = SyncAck;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.len() >= 2 {
            let candidate = [src[0], src[1]];
            src.advance(2);
            if let Some(ack) = SyncAck::parse(&candidate) {
                return Ok(Some(ack));
            }
            // Not an ack — drop the pair and keep scanning.
        }
        Ok(None)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkState;
    use crate::transport::TransportProtocol;

    #[test]
    fn encode_appends_frame_bytes() {
        let mut codec = WireCodec;
        let mut buf = BytesMut::new();
        codec
            .encode(Frame::state(0x01, 0x8000_0001, TransportProtocol::Tcp), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], [0xA0, 0x01, 0x01, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn decode_yields_acks_and_skips_noise() {
        let mut codec = WireCodec;
        let mut buf = BytesMut::new();
        // Noise pair, then a valid ack confirming Active.
        buf.put_slice(&[0xFF, 0xFF, 0b0100_0000, 0b0001_0000]);

        let ack = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(ack.confirmed, LinkState::Active);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_waits_for_a_full_pair() {
        let mut codec = WireCodec;
        let mut buf = BytesMut::new();
        buf.put_u8(0b0100_0000);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.put_u8(0x00);
        let ack = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(ack.confirmed, LinkState::Suspended);
    }
}
