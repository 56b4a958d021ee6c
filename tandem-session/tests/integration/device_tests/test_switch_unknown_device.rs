use tandem_core::SessionError;
use tandem_core::model::ConnectionState;
use tandem_session::MediaKind;

use crate::integration::init_tracing;
use crate::utils::{connect_pair, test_source, test_store};

#[tokio::test]
async fn test_switch_unknown_device_keeps_the_old_track() {
    init_tracing();

    let store = test_store();
    let (creator, _joiner) = connect_pair(store, test_source())
        .await
        .expect("Failed to establish the call");

    let error = creator
        .switch_device(MediaKind::Audio, Some("no-such-mic"))
        .await
        .err()
        .expect("Switching to an unknown device must fail");
    assert!(matches!(error, SessionError::DeviceNotFound(_)));

    // The failed switch leaves the session running on the old device
    assert!(matches!(
        *creator.state().borrow(),
        ConnectionState::Connected
    ));
    creator
        .set_enabled(MediaKind::Audio, false)
        .await
        .expect("The original track must still be controllable");
}
