use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::watch;

use tandem_core::model::{
    CloseReason, ConnectionState, ParticipantId, ParticipantRecord, RoomDocument,
};
use tandem_session::{
    MemoryStore, RemoteMedia, RoomCoordinator, SessionConfig, SessionHandle, Subscription,
    SyntheticSource, TransportConfig,
};

/// Timeout for a two-party connection to establish (ms).
pub const CONNECT_TIMEOUT_MS: u64 = 10000;
/// Timeout for a session to reach a terminal state (ms).
pub const CLOSE_TIMEOUT_MS: u64 = 5000;
/// Timeout for store-side effects and watch pushes (ms).
pub const STORE_TIMEOUT_MS: u64 = 3000;

/// Session config pinned to host-only ICE: tests never leave the machine.
pub fn test_config() -> SessionConfig {
    let mut config = SessionConfig::new(ParticipantId::new());
    config.transport = TransportConfig::host_only();
    config
}

pub fn test_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn test_source() -> Arc<SyntheticSource> {
    Arc::new(SyntheticSource::new())
}

/// Polls a watch channel until the value passes the check.
pub async fn wait_for_update<T, F>(
    rx: &mut watch::Receiver<T>,
    timeout_ms: u64,
    what: &str,
    mut check: F,
) -> Result<T>
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        let current = rx.borrow_and_update().clone();
        if check(&current) {
            return Ok(current);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            anyhow::bail!("Timed out waiting for {what}");
        }
        tokio::time::timeout(remaining, rx.changed())
            .await
            .with_context(|| format!("Timed out waiting for {what}"))?
            .with_context(|| format!("Watch closed while waiting for {what}"))?;
    }
}

/// Waits until the session reports Connected.
pub async fn wait_for_connected(handle: &SessionHandle) -> Result<()> {
    let mut state = handle.state();
    wait_for_update(&mut state, CONNECT_TIMEOUT_MS, "the connected state", |s| {
        matches!(s, ConnectionState::Connected)
    })
    .await?;
    Ok(())
}

/// Waits for the terminal state and returns the close reason.
pub async fn wait_for_closed(state: &mut watch::Receiver<ConnectionState>) -> Result<CloseReason> {
    let last = wait_for_update(state, CLOSE_TIMEOUT_MS, "a terminal state", |s| {
        s.is_terminal()
    })
    .await?;
    match last {
        ConnectionState::Closed(reason) => Ok(reason),
        other => anyhow::bail!("Session ended in {other} instead of closing"),
    }
}

/// Waits until the peer record shows up on the handle.
pub async fn wait_for_peer(handle: &SessionHandle) -> Result<ParticipantRecord> {
    let mut peer = handle.peer();
    let record = wait_for_update(&mut peer, STORE_TIMEOUT_MS, "the peer record", |p| {
        p.is_some()
    })
    .await?;
    record.context("Peer record vanished after the check")
}

/// Waits until both remote tracks arrive.
pub async fn wait_for_remote_media(handle: &SessionHandle) -> Result<RemoteMedia> {
    let mut remote = handle.remote_media();
    wait_for_update(&mut remote, CONNECT_TIMEOUT_MS, "remote tracks", |m| {
        m.audio.is_some() && m.video.is_some()
    })
    .await
}

/// Skips room snapshots until the document passes the check.
pub async fn wait_for_snapshot<F>(
    watch: &mut Subscription<Option<RoomDocument>>,
    mut check: F,
) -> Result<RoomDocument>
where
    F: FnMut(&RoomDocument) -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(STORE_TIMEOUT_MS);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let snapshot = tokio::time::timeout(remaining, watch.recv())
            .await
            .context("Timed out waiting for a room snapshot")?
            .context("Room watch ended before the expected snapshot")?;
        let Some(document) = snapshot else { continue };
        if check(&document) {
            return Ok(document);
        }
    }
}

/// Expects the next snapshot to be the deletion marker.
pub async fn expect_room_deleted(watch: &mut Subscription<Option<RoomDocument>>) -> Result<()> {
    let snapshot = tokio::time::timeout(Duration::from_millis(STORE_TIMEOUT_MS), watch.recv())
        .await
        .context("Timed out waiting for the room deletion")?
        .context("Room watch ended without the deletion marker")?;
    anyhow::ensure!(
        snapshot.is_none(),
        "Expected the deletion marker, got {snapshot:?}"
    );
    Ok(())
}

/// Brings up a full two-party call over a shared in-process store.
pub async fn connect_pair(
    store: Arc<MemoryStore>,
    source: Arc<SyntheticSource>,
) -> Result<(SessionHandle, SessionHandle)> {
    let creator = RoomCoordinator::create(store.clone(), source.clone(), test_config())
        .await
        .context("Failed to open the creator session")?;
    let joiner = RoomCoordinator::join(store, source, creator.room().clone(), test_config())
        .await
        .context("Failed to join the room")?;
    wait_for_connected(&creator).await?;
    wait_for_connected(&joiner).await?;
    Ok((creator, joiner))
}
