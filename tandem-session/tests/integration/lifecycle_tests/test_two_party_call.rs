use tandem_core::model::{Admission, CloseReason, ParticipantId, ParticipantRecord, PeerRole};
use tandem_session::{MediaKind, SignalingStore};

use crate::integration::init_tracing;
use crate::utils::{
    STORE_TIMEOUT_MS, connect_pair, test_source, test_store, wait_for_closed, wait_for_peer,
    wait_for_remote_media, wait_for_update,
};

#[tokio::test]
async fn test_two_party_call() {
    init_tracing();

    let store = test_store();
    let (creator, joiner) = connect_pair(store.clone(), test_source())
        .await
        .expect("Failed to establish the call");
    let room = creator.room().clone();

    // Each side sees the other participant and both remote tracks
    let seen_by_creator = wait_for_peer(&creator)
        .await
        .expect("Creator never saw the peer");
    assert_eq!(seen_by_creator.id, *joiner.identity());
    let seen_by_joiner = wait_for_peer(&joiner)
        .await
        .expect("Joiner never saw the peer");
    assert_eq!(seen_by_joiner.id, *creator.identity());
    wait_for_remote_media(&creator)
        .await
        .expect("Creator received no remote tracks");
    wait_for_remote_media(&joiner)
        .await
        .expect("Joiner received no remote tracks");

    // A mute reaches the peer through its participant record
    creator
        .set_enabled(MediaKind::Audio, false)
        .await
        .expect("Failed to mute the microphone");
    let mut joiner_peer = joiner.peer();
    let muted = wait_for_update(
        &mut joiner_peer,
        STORE_TIMEOUT_MS,
        "the muted peer record",
        |p| p.as_ref().is_some_and(|record| !record.profile.audio),
    )
    .await
    .expect("Mute never reached the peer")
    .expect("Peer record vanished");
    assert!(muted.profile.video, "Video must stay on after an audio mute");

    // The departure evicts the survivor, which removes the room
    joiner.leave().await;

    let mut creator_state = creator.state();
    let reason = wait_for_closed(&mut creator_state)
        .await
        .expect("Creator was not evicted");
    assert_eq!(reason, CloseReason::PeerLeft);

    // The code cannot be joined again
    let admission = store
        .admit_participant(
            &room,
            ParticipantRecord::new(ParticipantId::new(), PeerRole::Joiner, None),
        )
        .await
        .expect("Admission request failed");
    assert_eq!(admission, Admission::RoomMissing);
}
