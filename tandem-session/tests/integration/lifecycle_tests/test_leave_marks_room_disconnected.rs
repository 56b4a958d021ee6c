use tandem_core::model::{ParticipantId, ParticipantRecord, PeerRole, RoomId};
use tandem_session::{RoomCoordinator, SignalingStore};

use crate::integration::init_tracing;
use crate::utils::{test_config, test_source, test_store, wait_for_snapshot};

#[tokio::test]
async fn test_leave_marks_room_disconnected() {
    init_tracing();

    let store = test_store();

    // A bare creator record without a live session: nobody reacts to the
    // departure, so the store keeps exactly what the leaver wrote.
    let room = RoomId::new();
    let creator_record = ParticipantRecord::new(ParticipantId::new(), PeerRole::Creator, None);
    store
        .create_room(&room, creator_record.clone())
        .await
        .expect("Failed to seed the room");

    let joiner = RoomCoordinator::join(store.clone(), test_source(), room.clone(), test_config())
        .await
        .expect("Failed to join the room");
    let joiner_id = joiner.identity().clone();
    joiner.leave().await;

    // The leaver removed only its own record
    let participants = store
        .list_participants(&room)
        .await
        .expect("Room must survive a non-last leave");
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].id, creator_record.id);
    assert!(participants.iter().all(|record| record.id != joiner_id));

    // and flagged the document for the remaining side
    let mut room_watch = store
        .watch_room(&room)
        .await
        .expect("Failed to watch the room");
    let document = wait_for_snapshot(&mut room_watch, |_| true)
        .await
        .expect("No room snapshot arrived");
    assert!(document.disconnect, "Leave must set the disconnect flag");
}
