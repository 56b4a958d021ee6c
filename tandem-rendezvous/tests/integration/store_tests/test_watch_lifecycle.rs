use std::time::Duration;

use tandem_core::model::{CandidateLane, PeerRole, RoomId, SessionDescription};
use tandem_session::{RemoteStore, SignalingStore};

use crate::integration::{
    init_tracing, next_event, participant, spawn_node, test_candidate, wait_for_room,
};

#[tokio::test]
async fn test_late_candidate_watch_replays_backlog() {
    init_tracing();

    let url = spawn_node().await;
    let publisher = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the publisher");
    let watcher = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the watcher");

    let room = RoomId::new();
    publisher
        .create_room(&room, participant(PeerRole::Creator))
        .await
        .expect("Failed to create the room");
    for index in 0..3 {
        publisher
            .publish_candidate(&room, CandidateLane::Offer, test_candidate(index))
            .await
            .expect("Failed to publish a candidate");
    }

    // A watch opened after the fact still starts from the first candidate
    let mut lane = watcher
        .watch_candidates(&room, CandidateLane::Offer)
        .await
        .expect("Failed to watch the offer lane");
    for index in 0..3 {
        assert_eq!(next_event(&mut lane).await, test_candidate(index));
    }

    publisher
        .publish_candidate(&room, CandidateLane::Offer, test_candidate(3))
        .await
        .expect("Failed to publish a candidate");
    assert_eq!(next_event(&mut lane).await, test_candidate(3));
}

#[tokio::test]
async fn test_room_deletion_reaches_watchers() {
    init_tracing();

    let url = spawn_node().await;
    let creator_store = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the creator");
    let watcher = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the watcher");

    let room = RoomId::new();
    creator_store
        .create_room(&room, participant(PeerRole::Creator))
        .await
        .expect("Failed to create the room");

    let mut room_watch = watcher
        .watch_room(&room)
        .await
        .expect("Failed to watch the room");
    assert!(
        next_event(&mut room_watch).await.is_some(),
        "Expected the initial snapshot"
    );

    creator_store
        .delete_room(&room)
        .await
        .expect("Failed to delete the room");
    assert_eq!(next_event(&mut room_watch).await, None);
}

#[tokio::test]
async fn test_disconnected_client_leaves_node_usable() {
    init_tracing();

    let url = spawn_node().await;
    let creator_store = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the creator");

    let room = RoomId::new();
    creator_store
        .create_room(&room, participant(PeerRole::Creator))
        .await
        .expect("Failed to create the room");

    // A client that watched the room and went away must not wedge the node
    {
        let doomed = RemoteStore::connect(&url).await.expect("Failed to connect");
        let mut watch = doomed
            .watch_room(&room)
            .await
            .expect("Failed to watch the room");
        assert!(next_event(&mut watch).await.is_some());
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut room_watch = creator_store
        .watch_room(&room)
        .await
        .expect("Failed to watch the room");
    creator_store
        .publish_offer(&room, SessionDescription::offer("v=0 survivor".to_owned()))
        .await
        .expect("Failed to publish the offer");
    let document = wait_for_room(&mut room_watch, |doc| doc.offer.is_some()).await;
    assert_eq!(document.offer.unwrap().sdp, "v=0 survivor");

    creator_store
        .delete_room(&room)
        .await
        .expect("Failed to delete the room");
    assert_eq!(next_event(&mut room_watch).await, None);
}
