use tandem_core::SessionError;
use tandem_core::model::RoomId;
use tandem_session::{RoomCoordinator, SignalingStore};

use crate::integration::init_tracing;
use crate::utils::{test_config, test_source, test_store};

#[tokio::test]
async fn test_join_missing_room() {
    init_tracing();

    let store = test_store();
    let room = RoomId::new();
    let error = RoomCoordinator::join(store.clone(), test_source(), room.clone(), test_config())
        .await
        .err()
        .expect("Join must fail for an unknown code");
    assert!(matches!(error, SessionError::RoomNotFound(_)));

    // The attempt must leave no trace in the store
    assert!(store.list_participants(&room).await.is_err());
}
