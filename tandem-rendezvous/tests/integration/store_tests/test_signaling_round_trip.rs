use tandem_core::model::{Admission, CandidateLane, PeerRole, RoomId, SessionDescription};
use tandem_session::{RemoteStore, SignalingStore};

use crate::integration::{
    init_tracing, next_event, participant, spawn_node, test_candidate, wait_for_room,
};

#[tokio::test]
async fn test_signaling_round_trip() {
    init_tracing();

    let url = spawn_node().await;
    let creator_store = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the creator");
    let joiner_store = RemoteStore::connect(&url)
        .await
        .expect("Failed to connect the joiner");

    let room = RoomId::new();
    let creator = participant(PeerRole::Creator);
    creator_store
        .create_room(&room, creator.clone())
        .await
        .expect("Failed to create the room");

    let mut creator_room = creator_store
        .watch_room(&room)
        .await
        .expect("Failed to watch the room");
    let initial = next_event(&mut creator_room)
        .await
        .expect("Room document is missing");
    assert!(initial.offer.is_none(), "Fresh room must carry no offer");

    // Admission answers with the current document
    let joiner = participant(PeerRole::Joiner);
    let admission = joiner_store
        .admit_participant(&room, joiner.clone())
        .await
        .expect("Admission request failed");
    let Admission::Granted { document } = admission else {
        panic!("Expected a granted admission, got {admission:?}");
    };
    assert!(document.answer.is_none());

    let mut joiner_room = joiner_store
        .watch_room(&room)
        .await
        .expect("Failed to watch the room");

    creator_store
        .publish_offer(&room, SessionDescription::offer("v=0 creator".to_owned()))
        .await
        .expect("Failed to publish the offer");
    let with_offer = wait_for_room(&mut joiner_room, |doc| doc.offer.is_some()).await;
    assert_eq!(with_offer.offer.unwrap().sdp, "v=0 creator");

    joiner_store
        .publish_answer(&room, SessionDescription::answer("v=0 joiner".to_owned()))
        .await
        .expect("Failed to publish the answer");
    let with_answer = wait_for_room(&mut creator_room, |doc| doc.answer.is_some()).await;
    assert_eq!(with_answer.answer.unwrap().sdp, "v=0 joiner");

    // Candidates arrive in publication order on their lane
    let mut lane = creator_store
        .watch_candidates(&room, CandidateLane::Answer)
        .await
        .expect("Failed to watch the answer lane");
    for index in 0..3 {
        joiner_store
            .publish_candidate(&room, CandidateLane::Answer, test_candidate(index))
            .await
            .expect("Failed to publish a candidate");
    }
    for index in 0..3 {
        assert_eq!(next_event(&mut lane).await, test_candidate(index));
    }

    let participants = creator_store
        .list_participants(&room)
        .await
        .expect("Failed to list participants");
    assert_eq!(participants.len(), 2);
    assert!(participants.iter().any(|record| record.id == joiner.id));
}
