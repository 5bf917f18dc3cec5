//! End-to-end: the scanner's WebSocket transport against a real peer server.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use qrlink_core::{ConnectionState, ServerAddress, SettingKey};
use qrlink_peer::domain::ReceivedText;
use qrlink_peer::infrastructure::PeerServer;
use qrlink_scanner::application::Session;
use qrlink_scanner::infrastructure::session_actor::{spawn_session, SessionHandle};
use qrlink_scanner::infrastructure::storage::MemorySettingsStore;
use qrlink_scanner::infrastructure::transport::WsTransport;
use qrlink_scanner::infrastructure::ui_bridge::ScannerAppState;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

async fn start_peer() -> (String, Arc<AtomicBool>, mpsc::Receiver<ReceivedText>) {
    let server = PeerServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let url = format!("ws://{}", server.local_addr());
    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(server.serve(Arc::clone(&running), tx));
    (url, running, rx)
}

fn start_scanner(store: Arc<MemorySettingsStore>) -> SessionHandle {
    let (event_tx, event_rx) = mpsc::channel(16);
    let transport = Arc::new(WsTransport::new(event_tx));
    let session = Session::new(transport, store);
    let (handle, _join) = spawn_session(session, event_rx, ScannerAppState::new());
    handle
}

async fn wait_for_state(handle: &SessionHandle, state: ConnectionState) {
    let mut rx = handle.subscribe();
    timeout(WAIT, rx.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for session state")
        .expect("session actor stopped");
}

#[tokio::test]
async fn test_scan_connect_and_forward_to_live_peer() {
    // Arrange
    let (url, running, mut received) = start_peer().await;
    let store = Arc::new(MemorySettingsStore::new());
    let scanner = start_scanner(store.clone());

    // Act: scan the pairing code, then a payload
    scanner.raw_scan(url.as_str()).await.unwrap();
    wait_for_state(&scanner, ConnectionState::Connected).await;
    assert!(scanner.send_text("  typed text  ").await.unwrap());

    // Assert
    let got = timeout(WAIT, received.recv()).await.unwrap().unwrap();
    assert_eq!(got.text, "typed text");
    assert_eq!(store.value(SettingKey::LastServerAddress), Some(url));

    running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_disconnect_from_live_peer_forgets_address() {
    let (url, running, _received) = start_peer().await;
    let store = Arc::new(MemorySettingsStore::new());
    let scanner = start_scanner(store.clone());
    scanner.connect(ServerAddress::parse(&url).unwrap()).await.unwrap();
    wait_for_state(&scanner, ConnectionState::Connected).await;

    assert!(scanner.disconnect().await.unwrap());

    assert_eq!(scanner.snapshot().state, ConnectionState::Disconnected);
    assert_eq!(store.value(SettingKey::LastServerAddress), None);
    running.store(false, Ordering::Relaxed);
}

#[tokio::test]
async fn test_unreachable_peer_returns_to_disconnected() {
    // Arrange: a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);
    let store = Arc::new(MemorySettingsStore::new());
    let scanner = start_scanner(store.clone());

    // Act: the reply arrives with the session already Connecting
    scanner.connect(ServerAddress::parse(&url).unwrap()).await.unwrap();
    wait_for_state(&scanner, ConnectionState::Disconnected).await;

    // Assert
    assert_eq!(scanner.snapshot().server_address, None);
    assert_eq!(store.value(SettingKey::LastServerAddress), None);
}

#[tokio::test]
async fn test_disconnect_is_immediate_when_peer_stops_reading() {
    // Arrange: a peer that completes the handshake and then never reads
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    let store = Arc::new(MemorySettingsStore::new());
    let scanner = start_scanner(store.clone());
    scanner.connect(ServerAddress::parse(&url).unwrap()).await.unwrap();
    wait_for_state(&scanner, ConnectionState::Connected).await;

    // Act: flood the connection until writes back up
    let flooder = scanner.clone();
    let payload = "x".repeat(1024 * 1024);
    let sends = tokio::spawn(async move {
        for _ in 0..64 {
            if flooder.send_text(payload.clone()).await.is_err() {
                break;
            }
        }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    let changed = timeout(Duration::from_secs(5), scanner.disconnect())
        .await
        .expect("disconnect queued behind a blocked send")
        .unwrap();

    // Assert
    assert!(changed);
    assert_eq!(scanner.snapshot().state, ConnectionState::Disconnected);
    assert_eq!(store.value(SettingKey::LastServerAddress), None);
    timeout(WAIT, sends).await.unwrap().unwrap();
}
