pub mod store_tests;

use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tracing::Level;

use tandem_core::model::{IceCandidate, ParticipantId, ParticipantRecord, PeerRole, RoomDocument};
use tandem_rendezvous::RendezvousService;
use tandem_session::Subscription;

/// How long to wait for a store push before failing the test (ms).
pub const EVENT_TIMEOUT_MS: u64 = 5000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Starts a rendezvous node on an ephemeral port and returns its store URL.
pub async fn spawn_node() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind an ephemeral port");
    let addr = listener.local_addr().expect("Listener has no local addr");
    tokio::spawn(RendezvousService::new().serve(listener));
    format!("ws://{addr}/store")
}

pub fn participant(role: PeerRole) -> ParticipantRecord {
    ParticipantRecord::new(ParticipantId::new(), role, None)
}

pub fn test_candidate(index: u16) -> IceCandidate {
    IceCandidate {
        candidate: format!(
            "candidate:{index} 1 udp 2122260223 192.168.0.10 {} typ host",
            40000 + index
        ),
        sdp_mid: Some("0".to_owned()),
        sdp_mline_index: Some(0),
        username_fragment: None,
    }
}

/// Waits for the next watch item, panicking on timeout.
pub async fn next_event<T>(subscription: &mut Subscription<T>) -> T {
    tokio::time::timeout(Duration::from_millis(EVENT_TIMEOUT_MS), subscription.recv())
        .await
        .expect("Timed out waiting for a store event")
        .expect("Watch ended unexpectedly")
}

/// Skips room snapshots until the document passes the check.
pub async fn wait_for_room<F>(
    watch: &mut Subscription<Option<RoomDocument>>,
    mut check: F,
) -> RoomDocument
where
    F: FnMut(&RoomDocument) -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(EVENT_TIMEOUT_MS);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let snapshot = tokio::time::timeout(remaining, watch.recv())
            .await
            .expect("Timed out waiting for a room snapshot")
            .expect("Room watch ended unexpectedly");
        let Some(document) = snapshot else { continue };
        if check(&document) {
            return document;
        }
    }
}
