use tandem_core::model::{Admission, PeerRole, RoomId};
use tandem_session::{RemoteStore, SignalingStore};

use crate::integration::{init_tracing, participant, spawn_node};

#[tokio::test]
async fn test_join_missing_room() {
    init_tracing();

    let url = spawn_node().await;
    let store = RemoteStore::connect(&url).await.expect("Failed to connect");

    let room = RoomId::new();
    let admission = store
        .admit_participant(&room, participant(PeerRole::Joiner))
        .await
        .expect("Admission request failed");
    assert_eq!(admission, Admission::RoomMissing);

    // The failed join must not create anything
    assert!(store.list_participants(&room).await.is_err());
}

#[tokio::test]
async fn test_third_join_is_rejected() {
    init_tracing();

    let url = spawn_node().await;
    let creator_store = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the creator");
    let joiner_store = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the joiner");
    let late_store = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the latecomer");

    let room = RoomId::new();
    creator_store
        .create_room(&room, participant(PeerRole::Creator))
        .await
        .expect("Failed to create the room");
    let second = joiner_store
        .admit_participant(&room, participant(PeerRole::Joiner))
        .await
        .expect("Admission request failed");
    assert!(matches!(second, Admission::Granted { .. }));

    let latecomer = participant(PeerRole::Joiner);
    let third = late_store
        .admit_participant(&room, latecomer.clone())
        .await
        .expect("Admission request failed");
    assert_eq!(third, Admission::RoomFull);

    // The rejected participant leaves no record behind
    let participants = creator_store
        .list_participants(&room)
        .await
        .expect("Failed to list participants");
    assert_eq!(participants.len(), 2);
    assert!(participants.iter().all(|record| record.id != latecomer.id));
}
