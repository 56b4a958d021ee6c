use crate::media::{DeviceInfo, MediaKind};
use crate::transport::TransportEvent;
use std::sync::Arc;
use tandem_core::SessionError;
use tandem_core::model::{IceCandidate, ParticipantRecord, RoomDocument};
use tokio::sync::oneshot;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// Команды владельца хэндла координатору.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Аккуратный выход из звонка.
    Leave,
    /// Горячая смена устройства захвата. Ответ уходит в done.
    SwitchDevice {
        kind: MediaKind,
        device_id: Option<String>,
        done: oneshot::Sender<Result<DeviceInfo, SessionError>>,
    },
    /// Mute или unmute локальной дорожки.
    SetEnabled { kind: MediaKind, enabled: bool },
}

/// Все внешние воздействия на сессию, слитые в одну очередь.
/// Координатор обрабатывает их строго по одному.
pub(crate) enum SessionEvent {
    Transport(TransportEvent),
    /// Очередной снапшот документа комнаты. None - документ удален.
    RoomSnapshot(Option<RoomDocument>),
    RoomWatchEnded,
    /// Полный снапшот списка участников.
    ParticipantsSnapshot(Vec<ParticipantRecord>),
    ParticipantsWatchEnded,
    /// Кандидат встречной стороны.
    RemoteCandidate(IceCandidate),
    CandidateWatchEnded,
}

/// Удаленные дорожки, которые сейчас приходят от собеседника.
#[derive(Clone, Default)]
pub struct RemoteMedia {
    pub audio: Option<Arc<TrackRemote>>,
    pub video: Option<Arc<TrackRemote>>,
}

impl RemoteMedia {
    pub(crate) fn attach(&mut self, track: Arc<TrackRemote>) {
        match track.kind() {
            RTPCodecType::Audio => self.audio = Some(track),
            RTPCodecType::Video => self.video = Some(track),
            RTPCodecType::Unspecified => {}
        }
    }
}
