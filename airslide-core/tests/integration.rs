//! Integration tests — the full pointer → zones → frame → socket
//! pipeline against a stand-in playfield peer on localhost UDP.

use std::time::Duration;

use airslide_core::{
    AccessCode, BridgeEngine, ButtonMask, CabinetState, ControllerSnapshot, EngineHandle,
    LinkState, TransportProtocol, air_zones, slide_zones,
};
use tokio::net::UdpSocket;
use tokio::time::timeout;

// ── Helpers ──────────────────────────────────────────────────────

/// Bind a stand-in peer on an OS-assigned port.
async fn peer_socket() -> (UdpSocket, String, String) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    (socket, addr.ip().to_string(), addr.port().to_string())
}

/// Receive the next frame with a generous deadline.
async fn recv_frame(peer: &UdpSocket) -> (Vec<u8>, std::net::SocketAddr) {
    let mut buf = [0u8; 32];
    let (len, from) = timeout(Duration::from_secs(5), peer.recv_from(&mut buf))
        .await
        .expect("timed out waiting for a frame")
        .unwrap();
    (buf[..len].to_vec(), from)
}

/// Receive frames until one satisfies `want`, skipping earlier sends.
async fn recv_frame_matching(
    peer: &UdpSocket,
    want: impl Fn(&[u8]) -> bool,
) -> (Vec<u8>, std::net::SocketAddr) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected frame never arrived"
        );
        let (frame, from) = recv_frame(peer).await;
        if want(&frame) {
            return (frame, from);
        }
    }
}

async fn wait_for_state(handle: &EngineHandle, expected: LinkState) {
    let mut rx = handle.subscribe();
    timeout(Duration::from_secs(5), async {
        while *rx.borrow_and_update() != expected {
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap_or_else(|_| panic!("state never became {expected}"));
}

/// A connected engine targeting `peer`, already toggled Active.
async fn active_engine(ip: &str, port: &str) -> EngineHandle {
    let handle = BridgeEngine::spawn(2000);
    handle
        .configure_transport(ip, port, TransportProtocol::Udp)
        .unwrap();
    handle.toggle_connection().unwrap();
    wait_for_state(&handle, LinkState::Active).await;
    handle
}

// ── Pipeline ─────────────────────────────────────────────────────

#[tokio::test]
async fn touch_state_reaches_the_peer() {
    let (peer, ip, port) = peer_socket().await;
    let handle = active_engine(&ip, &port).await;

    // One finger resting high in the air region, one on the strip:
    // 600 px air region over a 1280x200 slide strip.
    let air_pointers = [airslide_core::PointerSample::new(0, 0.0, 55.0)];
    let slide_pointers = [airslide_core::PointerSample::new(1, 20.0, 700.0)];
    let air = air_zones(&air_pointers, 600.0, 0.0);
    let slide = slide_zones(&slide_pointers, 1280.0, 600.0, 200.0, 0.0);
    assert_eq!(air.iter().collect::<Vec<_>>(), vec![6]);
    assert_eq!(slide.iter().collect::<Vec<_>>(), vec![1]);

    handle
        .update_state(ControllerSnapshot {
            air,
            slide,
            ..Default::default()
        })
        .unwrap();

    let (frame, _) =
        recv_frame_matching(&peer, |f| f[0] == 0x20 && f[1] == 0x20).await;
    assert_eq!(frame, [0x20, 0x20, 0x01, 0x00, 0x00, 0x00]);
    handle.shutdown();
}

#[tokio::test]
async fn card_frame_outranks_buttons_on_the_wire() {
    let (peer, ip, port) = peer_socket().await;
    let handle = active_engine(&ip, &port).await;

    handle
        .update_state(ControllerSnapshot {
            cabinet: CabinetState {
                buttons: ButtonMask::COIN,
                card_present: true,
                access_code: Some(AccessCode::parse("12345678901234567890").unwrap()),
            },
            ..Default::default()
        })
        .unwrap();

    let (frame, _) = recv_frame_matching(&peer, |f| f[0] == 0x30).await;
    assert_eq!(frame.len(), 11);
    assert_eq!(
        frame[1..],
        [0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56, 0x78, 0x90]
    );
    handle.shutdown();
}

// ── Sync handshake ───────────────────────────────────────────────

#[tokio::test]
async fn sync_handshake_against_a_live_peer() {
    let (peer, ip, port) = peer_socket().await;

    let handle = BridgeEngine::spawn(2000);
    handle
        .configure_transport(&ip, &port, TransportProtocol::Udp)
        .unwrap();
    handle.request_sync().unwrap();
    wait_for_state(&handle, LinkState::Syncing).await;

    // The peer sees sync frames asking it to go Active...
    let (frame, from) = recv_frame_matching(&peer, |f| f[0] == 0x00).await;
    assert_eq!(frame, [0x00, 0x30]);

    // ...and its acknowledgement completes the handshake.
    peer.send_to(&[0b0100_0000, 0b0001_0000], from).await.unwrap();
    wait_for_state(&handle, LinkState::Active).await;
    handle.shutdown();
}

#[tokio::test]
async fn silent_peer_lets_the_sync_expire() {
    let (_peer, ip, port) = peer_socket().await;

    let handle = BridgeEngine::spawn(2000);
    handle
        .configure_transport(&ip, &port, TransportProtocol::Udp)
        .unwrap();
    handle.request_sync().unwrap();
    wait_for_state(&handle, LinkState::Syncing).await;
    // No ack: the 500 ms deadline reverts to the pre-sync state.
    wait_for_state(&handle, LinkState::Suspended).await;
    handle.shutdown();
}

// ── Coalescing ───────────────────────────────────────────────────

#[tokio::test]
async fn rapid_updates_coalesce_to_the_latest_state() {
    let (peer, ip, port) = peer_socket().await;
    let handle = active_engine(&ip, &port).await;

    // A burst of intermediate states; only the last needs to survive.
    for zone in 1..=6u32 {
        handle
            .update_state(ControllerSnapshot {
                air: [zone].into_iter().collect(),
                ..Default::default()
            })
            .unwrap();
    }

    // Eventually the wire settles on the final snapshot (zone 6).
    tokio::time::sleep(Duration::from_millis(30)).await;
    let mut drained = Vec::new();
    let mut buf = [0u8; 32];
    while let Ok((len, _)) = peer.try_recv_from(&mut buf) {
        drained.push(buf[..len].to_vec());
    }
    let last = drained.last().expect("no frames reached the peer");
    assert_eq!(last[..2], [0x20, 0x20]);
    handle.shutdown();
}
