use std::sync::Arc;
use std::time::Duration;

use tandem_core::model::ConnectionState;
use tandem_session::{DeviceInfo, MediaKind, SyntheticSource};

use crate::integration::init_tracing;
use crate::utils::{connect_pair, test_store, wait_for_remote_media};

fn two_microphone_source() -> Arc<SyntheticSource> {
    Arc::new(SyntheticSource::with_devices(vec![
        DeviceInfo {
            id: "mic-0".to_owned(),
            label: "Microphone 0".to_owned(),
            kind: MediaKind::Audio,
        },
        DeviceInfo {
            id: "mic-1".to_owned(),
            label: "Microphone 1".to_owned(),
            kind: MediaKind::Audio,
        },
        DeviceInfo {
            id: "cam-0".to_owned(),
            label: "Camera 0".to_owned(),
            kind: MediaKind::Video,
        },
    ]))
}

#[tokio::test]
async fn test_switch_device_keeps_the_call() {
    init_tracing();

    let store = test_store();
    let (creator, joiner) = connect_pair(store, two_microphone_source())
        .await
        .expect("Failed to establish the call");
    wait_for_remote_media(&joiner)
        .await
        .expect("Joiner received no remote tracks");

    let device = creator
        .switch_device(MediaKind::Audio, Some("mic-1"))
        .await
        .expect("Switch failed");
    assert_eq!(device.id, "mic-1");

    // No renegotiation: the call never leaves Connected
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(
        *creator.state().borrow(),
        ConnectionState::Connected
    ));
    assert!(matches!(
        *joiner.state().borrow(),
        ConnectionState::Connected
    ));

    // Switching back works the same way
    let device = creator
        .switch_device(MediaKind::Audio, Some("mic-0"))
        .await
        .expect("Switch back failed");
    assert_eq!(device.id, "mic-0");
}
