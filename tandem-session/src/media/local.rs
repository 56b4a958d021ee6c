use crate::media::source::{CapturedTrack, MediaKind, MediaSource};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tandem_core::SessionError;
use tandem_core::model::ParticipantProfile;
use uuid::Uuid;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Локальный медиа-набор участника: по одной дорожке каждого вида,
/// собранные в общий media stream.
///
/// Дорожки создаются всегда, независимо от профиля. Флаги профиля задают
/// только стартовый mute: так включение камеры посреди звонка не требует
/// пере-негоциации.
pub struct LocalMedia {
    stream_id: String,
    audio: Option<CapturedTrack>,
    video: Option<CapturedTrack>,
}

impl LocalMedia {
    /// Открывает захват обеих дорожек. Ошибка любого захвата отменяет
    /// весь набор: уже открытые дорожки закрываются при раскрутке.
    pub async fn open(
        source: &dyn MediaSource,
        profile: &ParticipantProfile,
    ) -> Result<Self, SessionError> {
        let stream_id = format!("tandem-{}", Uuid::new_v4());

        let audio = source.capture(MediaKind::Audio, None, &stream_id).await?;
        audio.enabled.store(profile.audio, Ordering::Relaxed);

        let video = source.capture(MediaKind::Video, None, &stream_id).await?;
        video.enabled.store(profile.video, Ordering::Relaxed);

        Ok(Self {
            stream_id,
            audio: Some(audio),
            video: Some(video),
        })
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn track(&self, kind: MediaKind) -> Option<Arc<TrackLocalStaticSample>> {
        self.slot_ref(kind).map(|captured| captured.track.clone())
    }

    pub fn device_id(&self, kind: MediaKind) -> Option<&str> {
        self.slot_ref(kind).map(|captured| captured.device.id.as_str())
    }

    pub fn is_enabled(&self, kind: MediaKind) -> bool {
        self.slot_ref(kind)
            .map(|captured| captured.enabled.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Подменяет дорожку вида на новый захват и возвращает старый.
    /// Старый захват должен жить, пока замена не дошла до RTP-сендера.
    pub fn replace(&mut self, kind: MediaKind, captured: CapturedTrack) -> Option<CapturedTrack> {
        self.slot_mut(kind).replace(captured)
    }

    /// Ставит или снимает mute. Возвращает false, если дорожки вида нет.
    pub fn set_enabled(&mut self, kind: MediaKind, enabled: bool) -> bool {
        let Some(captured) = self.slot_ref(kind) else {
            return false;
        };
        captured.enabled.store(enabled, Ordering::Relaxed);
        true
    }

    /// Останавливает захват и отпускает устройства.
    pub fn release(&mut self) {
        self.audio = None;
        self.video = None;
    }

    fn slot_ref(&self, kind: MediaKind) -> Option<&CapturedTrack> {
        match kind {
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.video.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: MediaKind) -> &mut Option<CapturedTrack> {
        match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        }
    }
}
