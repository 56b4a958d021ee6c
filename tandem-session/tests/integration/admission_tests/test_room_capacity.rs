use tandem_core::SessionError;
use tandem_core::model::ConnectionState;
use tandem_session::{RoomCoordinator, SignalingStore};

use crate::integration::init_tracing;
use crate::utils::{connect_pair, test_config, test_source, test_store};

#[tokio::test]
async fn test_third_join_is_rejected() {
    init_tracing();

    let store = test_store();
    let source = test_source();
    let (creator, joiner) = connect_pair(store.clone(), source.clone())
        .await
        .expect("Failed to establish the call");
    let room = creator.room().clone();

    let error = RoomCoordinator::join(store.clone(), source, room.clone(), test_config())
        .await
        .err()
        .expect("The third join must be rejected");
    assert!(matches!(error, SessionError::RoomFull(_)));

    // The rejection leaves the existing pair untouched
    let participants = store
        .list_participants(&room)
        .await
        .expect("Failed to list participants");
    assert_eq!(participants.len(), 2);
    assert!(matches!(
        *creator.state().borrow(),
        ConnectionState::Connected
    ));
    assert!(matches!(
        *joiner.state().borrow(),
        ConnectionState::Connected
    ));
}
