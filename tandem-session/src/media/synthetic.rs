use crate::media::source::{CapturedTrack, DeviceInfo, MediaKind, MediaSource};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tandem_core::SessionError;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Opus-кадр тишины (TOC-байт + пустой фрейм).
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
/// Заглушечный VP8-пейлоад с сигнатурой keyframe.
const VP8_STUB: [u8; 8] = [0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a, 0x00, 0x00];

/// Синтетический источник: вместо настоящих устройств отдает дорожки,
/// которые кормятся тишиной и заглушечными кадрами. Используется в тестах
/// и в CLI, когда реального захвата нет.
pub struct SyntheticSource {
    devices: Vec<DeviceInfo>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_devices(vec![
            DeviceInfo {
                id: "synthetic-mic-0".to_owned(),
                label: "Synthetic Microphone".to_owned(),
                kind: MediaKind::Audio,
            },
            DeviceInfo {
                id: "synthetic-cam-0".to_owned(),
                label: "Synthetic Camera".to_owned(),
                kind: MediaKind::Video,
            },
        ])
    }

    /// Источник с заданным набором устройств (в тестах удобно иметь
    /// несколько микрофонов, чтобы было куда переключаться).
    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        Self { devices }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSource for SyntheticSource {
    async fn list_devices(&self, kind: MediaKind) -> Result<Vec<DeviceInfo>, SessionError> {
        Ok(self
            .devices
            .iter()
            .filter(|device| device.kind == kind)
            .cloned()
            .collect())
    }

    async fn capture(
        &self,
        kind: MediaKind,
        device: Option<&str>,
        stream_id: &str,
    ) -> Result<CapturedTrack, SessionError> {
        let device = match device {
            Some(id) => self
                .devices
                .iter()
                .find(|d| d.kind == kind && d.id == id)
                .cloned()
                .ok_or_else(|| SessionError::DeviceNotFound(id.to_owned()))?,
            None => self
                .devices
                .iter()
                .find(|d| d.kind == kind)
                .cloned()
                .ok_or_else(|| {
                    SessionError::MediaAccessDenied(format!("no {kind:?} device available"))
                })?,
        };

        let (codec, prefix) = match kind {
            MediaKind::Audio => (
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_owned(),
                    clock_rate: 48000,
                    channels: 2,
                    ..Default::default()
                },
                "audio",
            ),
            MediaKind::Video => (
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_owned(),
                    clock_rate: 90000,
                    ..Default::default()
                },
                "video",
            ),
        };

        let track = Arc::new(TrackLocalStaticSample::new(
            codec,
            format!("{}-{}", prefix, Uuid::new_v4()),
            stream_id.to_owned(),
        ));
        let enabled = Arc::new(AtomicBool::new(true));
        let pump = tokio::spawn(pump(track.clone(), enabled.clone(), kind));
        Ok(CapturedTrack::new(track, device, enabled, move || {
            pump.abort()
        }))
    }
}

/// Подача семплов в дорожку. Пока enabled снят, семплы не пишутся
/// (дорожка замьючена), но захват продолжает жить.
async fn pump(track: Arc<TrackLocalStaticSample>, enabled: Arc<AtomicBool>, kind: MediaKind) {
    let (payload, interval) = match kind {
        MediaKind::Audio => (Bytes::from_static(&OPUS_SILENCE), Duration::from_millis(20)),
        MediaKind::Video => (Bytes::from_static(&VP8_STUB), Duration::from_millis(33)),
    };
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !enabled.load(Ordering::Relaxed) {
            continue;
        }
        let sample = Sample {
            data: payload.clone(),
            duration: interval,
            ..Default::default()
        };
        if track.write_sample(&sample).await.is_err() {
            break;
        }
    }
}
