use tandem_core::model::{Admission, CloseReason, ParticipantId, ParticipantRecord, PeerRole};
use tandem_session::{RoomCoordinator, SignalingStore};

use crate::integration::init_tracing;
use crate::utils::{
    expect_room_deleted, test_config, test_source, test_store, wait_for_closed, wait_for_snapshot,
};

#[tokio::test]
async fn test_last_leaver_deletes_room() {
    init_tracing();

    let store = test_store();
    let handle = RoomCoordinator::create(store.clone(), test_source(), test_config())
        .await
        .expect("Failed to open the session");
    let room = handle.room().clone();
    let mut state = handle.state();

    let mut room_watch = store
        .watch_room(&room)
        .await
        .expect("Failed to watch the room");
    wait_for_snapshot(&mut room_watch, |_| true)
        .await
        .expect("No initial snapshot arrived");

    // Nobody else ever joined, so leaving takes the room down with it
    handle.leave().await;
    let reason = wait_for_closed(&mut state)
        .await
        .expect("Session never closed");
    assert_eq!(reason, CloseReason::LocalLeave);

    expect_room_deleted(&mut room_watch)
        .await
        .expect("Room was not deleted");
    let admission = store
        .admit_participant(
            &room,
            ParticipantRecord::new(ParticipantId::new(), PeerRole::Joiner, None),
        )
        .await
        .expect("Admission request failed");
    assert_eq!(admission, Admission::RoomMissing);
}
