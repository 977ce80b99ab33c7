//! Network transport: endpoint configuration and frame sinks.
//!
//! A [`FrameSink`] pushes the latest encoded frame toward the peer and
//! surfaces any sync acknowledgements the peer sends back. Sends are
//! fire-and-forget — a dropped state frame is immediately superseded by
//! the next one, so failures are logged and swallowed, never raised.
//!
//! Sinks are owned exclusively by the engine worker task; all socket
//! lifecycle (open, rebind, close) is serialized there so concurrent
//! start/stop calls cannot interleave on the handle.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::WireCodec;
use crate::error::BridgeError;
use crate::frame::{Frame, SyncAck};

// ── Send rate ────────────────────────────────────────────────────

/// Accepted send-rate range in Hz.
pub const SEND_RATE_RANGE: std::ops::RangeInclusive<u32> = 1..=8000;

/// Default send rate (2 ms interval).
pub const DEFAULT_SEND_RATE: u32 = 500;

/// Clamp a requested send rate into the accepted range.
pub fn clamp_send_rate(hz: u32) -> u32 {
    hz.clamp(*SEND_RATE_RANGE.start(), *SEND_RATE_RANGE.end())
}

/// The tick interval for a (clamped) send rate.
pub fn send_interval(hz: u32) -> std::time::Duration {
    std::time::Duration::from_nanos(1_000_000_000 / clamp_send_rate(hz) as u64)
}

// ── TransportProtocol ────────────────────────────────────────────

/// Which wire flavour the peer expects.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportProtocol {
    /// Raw datagrams.
    #[default]
    Udp = 0,
    /// Framed stream; frames carry the protocol bit in byte 0.
    Tcp = 1,
}

impl std::fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportProtocol::Udp => write!(f, "UDP"),
            TransportProtocol::Tcp => write!(f, "TCP"),
        }
    }
}

impl TryFrom<u32> for TransportProtocol {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransportProtocol::Udp),
            1 => Ok(TransportProtocol::Tcp),
            _ => Err(BridgeError::UnknownVariant {
                type_name: "TransportProtocol",
                value: value as u64,
            }),
        }
    }
}

// ── TransportConfig ──────────────────────────────────────────────

/// Validated target endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub address: String,
    pub port: u16,
    pub protocol: TransportProtocol,
}

impl TransportConfig {
    /// Validate raw address/port strings into a config.
    ///
    /// The address check is deliberately coarse — non-blank, digits and
    /// dots only. It mirrors what the settings surface accepts and is
    /// not a full IPv4 validator.
    pub fn new(address: &str, port: &str, protocol: TransportProtocol) -> Result<Self, BridgeError> {
        validate_address(address)?;
        let port = parse_port(port)?;
        Ok(Self {
            address: address.to_string(),
            port,
            protocol,
        })
    }

    /// The resolved socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, BridgeError> {
        format!("{}:{}", self.address, self.port)
            .parse()
            .map_err(|_| BridgeError::InvalidAddress(self.address.clone()))
    }
}

/// Coarse address syntax check: non-blank, digits and dots only.
pub fn validate_address(address: &str) -> Result<(), BridgeError> {
    let ok = !address.trim().is_empty()
        && address.chars().all(|c| c.is_ascii_digit() || c == '.');
    if ok {
        Ok(())
    } else {
        Err(BridgeError::InvalidAddress(address.to_string()))
    }
}

/// Parse a port string as an integer in 0..=65535.
pub fn parse_port(port: &str) -> Result<u16, BridgeError> {
    port.parse::<u16>()
        .map_err(|_| BridgeError::InvalidPort(port.to_string()))
}

// ── FrameSink ────────────────────────────────────────────────────

/// A destination for encoded frames.
///
/// One production implementation per wire flavour ([`UdpSink`],
/// [`TcpSink`]) plus an in-memory fake ([`MemorySink`]) for tests.
#[async_trait]
pub trait FrameSink: Send {
    /// Push a frame toward the peer. Fire-and-forget: failures are
    /// logged and swallowed.
    async fn send(&mut self, frame: &Frame);

    /// Pop the next pending sync acknowledgement, if one has arrived.
    /// Never blocks.
    fn try_recv_ack(&mut self) -> Option<SyncAck>;
}

// ── UdpSink ──────────────────────────────────────────────────────

/// Datagram sink over an ephemeral local socket.
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    /// Bind an ephemeral socket targeting `target`.
    pub async fn connect(target: SocketAddr) -> Result<Self, BridgeError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        info!("udp sink bound {} -> {target}", socket.local_addr()?);
        Ok(Self { socket, target })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BridgeError> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl FrameSink for UdpSink {
    async fn send(&mut self, frame: &Frame) {
        if let Err(e) = self.socket.send_to(frame.as_bytes(), self.target).await {
            // Superseded by the next frame within milliseconds.
            debug!("udp send failed: {e}");
        }
    }

    fn try_recv_ack(&mut self) -> Option<SyncAck> {
        let mut buf = [0u8; 16];
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, _)) => {
                    if let Some(ack) = SyncAck::parse(&buf[..len]) {
                        return Some(ack);
                    }
                    // Not an ack — ignore stray traffic and keep draining.
                }
                Err(_) => return None,
            }
        }
    }
}

// ── TcpSink ──────────────────────────────────────────────────────

/// Stream sink over a framed TCP connection.
pub struct TcpSink {
    framed: Framed<TcpStream, WireCodec>,
}

impl TcpSink {
    pub async fn connect(target: SocketAddr) -> Result<Self, BridgeError> {
        let stream = TcpStream::connect(target).await?;
        stream.set_nodelay(true)?;
        info!("tcp sink connected to {target}");
        Ok(Self {
            framed: Framed::new(stream, WireCodec::default()),
        })
    }
}

#[async_trait]
impl FrameSink for TcpSink {
    async fn send(&mut self, frame: &Frame) {
        if let Err(e) = self.framed.send(frame.clone()).await {
            warn!("tcp send failed: {e}");
        }
    }

    fn try_recv_ack(&mut self) -> Option<SyncAck> {
        match self.framed.next().now_or_never() {
            Some(Some(Ok(ack))) => Some(ack),
            Some(Some(Err(e))) => {
                debug!("tcp ack decode failed: {e}");
                None
            }
            _ => None,
        }
    }
}

// ── MemorySink ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemorySinkInner {
    sent: Vec<Frame>,
    acks: VecDeque<SyncAck>,
}

/// In-memory fake sink. Cloning shares the same buffers, so a test can
/// keep one handle while the engine owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> Vec<Frame> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Queue an acknowledgement for the engine to pick up.
    pub fn push_ack(&self, ack: SyncAck) {
        self.inner.lock().unwrap().acks.push_back(ack);
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: &Frame) {
        self.inner.lock().unwrap().sent.push(frame.clone());
    }

    fn try_recv_ack(&mut self) -> Option<SyncAck> {
        self.inner.lock().unwrap().acks.pop_front()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkState;

    #[test]
    fn address_validation() {
        assert!(validate_address("192.168.1.50").is_ok());
        // Coarse check: syntactically loose strings still pass.
        assert!(validate_address("999.1").is_ok());
        assert!(validate_address("").is_err());
        assert!(validate_address("   ").is_err());
        assert!(validate_address("example.com").is_err());
        assert!(validate_address("192.168.1.1:80").is_err());
    }

    #[test]
    fn port_validation() {
        assert_eq!(parse_port("0").unwrap(), 0);
        assert_eq!(parse_port("65535").unwrap(), 65535);
        assert!(parse_port("65536").is_err());
        assert!(parse_port("-1").is_err());
        assert!(parse_port("abc").is_err());
        assert!(parse_port("").is_err());
    }

    #[test]
    fn config_construction() {
        let cfg = TransportConfig::new("127.0.0.1", "24864", TransportProtocol::Udp).unwrap();
        assert_eq!(cfg.port, 24864);
        assert_eq!(cfg.socket_addr().unwrap().port(), 24864);
        assert!(TransportConfig::new("bad host", "1", TransportProtocol::Udp).is_err());
    }

    #[test]
    fn send_rate_clamping() {
        assert_eq!(clamp_send_rate(0), 1);
        assert_eq!(clamp_send_rate(500), 500);
        assert_eq!(clamp_send_rate(20_000), 8000);
        assert_eq!(send_interval(500), std::time::Duration::from_millis(2));
    }

    #[test]
    fn memory_sink_records_and_acks() {
        let sink = MemorySink::new();
        let mut engine_side = sink.clone();

        tokio_test::block_on(engine_side.send(&Frame::state(0x01, 0, TransportProtocol::Udp)));
        assert_eq!(sink.sent().len(), 1);

        sink.push_ack(SyncAck { confirmed: LinkState::Active });
        assert_eq!(
            engine_side.try_recv_ack(),
            Some(SyncAck { confirmed: LinkState::Active })
        );
        assert_eq!(engine_side.try_recv_ack(), None);
    }

    #[tokio::test]
    async fn udp_sink_delivers_frames_and_acks() {
        // A local "peer" socket stands in for the playfield host.
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let mut sink = UdpSink::connect(peer_addr).await.unwrap();

        sink.send(&Frame::event(crate::cabinet::ButtonMask::COIN, TransportProtocol::Udp))
            .await;

        let mut buf = [0u8; 16];
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], [0x10, 0x01]);
        assert_eq!(from.port(), sink.local_addr().unwrap().port());

        // Peer replies with an ack confirming Active.
        peer.send_to(&[0b0100_0000, 0b0001_0000], from).await.unwrap();
        // Give the datagram a moment to land in the receive buffer.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(
            sink.try_recv_ack(),
            Some(SyncAck { confirmed: LinkState::Active })
        );
    }
}
