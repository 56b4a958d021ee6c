use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tandem_core::SessionError;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Вид дорожки.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn to_codec_type(self) -> RTPCodecType {
        match self {
            Self::Audio => RTPCodecType::Audio,
            Self::Video => RTPCodecType::Video,
        }
    }
}

/// Описание устройства захвата.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
    pub kind: MediaKind,
}

/// Запущенный захват: дорожка, в которую источник пишет семплы.
///
/// Флаг enabled выключает подачу семплов, не останавливая захват (mute).
/// Drop останавливает захват и освобождает устройство.
#[derive(Debug)]
pub struct CapturedTrack {
    pub track: Arc<TrackLocalStaticSample>,
    pub device: DeviceInfo,
    pub enabled: Arc<AtomicBool>,
    _stop: StopGuard,
}

impl CapturedTrack {
    pub fn new(
        track: Arc<TrackLocalStaticSample>,
        device: DeviceInfo,
        enabled: Arc<AtomicBool>,
        stop: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            track,
            device,
            enabled,
            _stop: StopGuard(Some(Box::new(stop))),
        }
    }
}

struct StopGuard(Option<Box<dyn FnOnce() + Send>>);

impl std::fmt::Debug for StopGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopGuard").finish_non_exhaustive()
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.0.take() {
            stop();
        }
    }
}

/// Источник локального медиа: перечисляет устройства и открывает захват.
///
/// Реализация отвечает за то, чтобы дорожка кормилась уже закодированными
/// семплами нужного кодека. stream_id всех дорожек одной сессии совпадает.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn list_devices(&self, kind: MediaKind) -> Result<Vec<DeviceInfo>, SessionError>;

    /// Открыть захват. device None означает устройство по умолчанию.
    async fn capture(
        &self,
        kind: MediaKind,
        device: Option<&str>,
        stream_id: &str,
    ) -> Result<CapturedTrack, SessionError>;
}
