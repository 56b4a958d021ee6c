use tandem_core::SessionError;
use tandem_session::RoomCoordinator;

use crate::integration::init_tracing;
use crate::utils::{test_config, test_source, test_store, wait_for_connected};

#[tokio::test]
async fn test_concurrent_joins_pick_one_winner() {
    init_tracing();

    let store = test_store();
    let source = test_source();
    let creator = RoomCoordinator::create(store.clone(), source.clone(), test_config())
        .await
        .expect("Failed to open the creator session");
    let room = creator.room().clone();

    // Both joins race through admission; the store admits exactly one
    let (first, second) = tokio::join!(
        RoomCoordinator::join(store.clone(), source.clone(), room.clone(), test_config()),
        RoomCoordinator::join(store.clone(), source.clone(), room.clone(), test_config()),
    );

    let (winner, loser) = match (first, second) {
        (Ok(handle), Err(error)) | (Err(error), Ok(handle)) => (handle, error),
        (Ok(_), Ok(_)) => panic!("Both joiners were admitted"),
        (Err(first), Err(second)) => panic!("Nobody was admitted: {first}, {second}"),
    };
    assert!(matches!(loser, SessionError::RoomFull(_)));

    wait_for_connected(&creator)
        .await
        .expect("Creator never connected");
    wait_for_connected(&winner)
        .await
        .expect("Winner never connected");
}
