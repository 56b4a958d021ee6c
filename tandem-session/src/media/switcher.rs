use crate::media::local::LocalMedia;
use crate::media::source::{DeviceInfo, MediaKind, MediaSource};
use crate::transport::IceTransport;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tandem_core::SessionError;
use tracing::info;
use webrtc::track::track_local::TrackLocal;

/// Горячая смена устройства захвата.
///
/// Новая дорожка уводится в уже существующий RTP-сендер через replace_track:
/// SDP не меняется, пере-негоциация не нужна, удаленная сторона продолжает
/// получать тот же медиапоток. Порядок строгий: сначала открыть новое
/// устройство, потом подменить сендер, и только после этого гасить старый
/// захват. Ошибка на любом шаге до подмены оставляет текущую дорожку как была.
pub async fn switch_device(
    transport: &IceTransport,
    media: &mut LocalMedia,
    source: &dyn MediaSource,
    kind: MediaKind,
    device_id: Option<&str>,
) -> Result<DeviceInfo, SessionError> {
    let fresh = source.capture(kind, device_id, media.stream_id()).await?;
    // Mute переезжает на новую дорожку вместе с устройством.
    fresh
        .enabled
        .store(media.is_enabled(kind), Ordering::Relaxed);

    let Some(sender) = transport.sender_for_kind(kind.to_codec_type()).await else {
        return Err(SessionError::Negotiation(format!(
            "no RTP sender carries a {kind:?} track"
        )));
    };

    let replacement: Arc<dyn TrackLocal + Send + Sync> = fresh.track.clone();
    sender.replace_track(Some(replacement)).await?;

    let device = fresh.device.clone();
    // Старый захват останавливается здесь, когда сендер уже переключен.
    drop(media.replace(kind, fresh));
    info!(?kind, device = %device.id, "capture device replaced");
    Ok(device)
}
