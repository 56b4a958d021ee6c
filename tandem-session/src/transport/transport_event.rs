use std::sync::Arc;
use tandem_core::model::IceCandidate;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::track::track_remote::TrackRemote;

/// События, которые транспорт генерирует для цикла координатора.
pub enum TransportEvent {
    /// Изменилось состояние RTCPeerConnection.
    StateChanged(RTCPeerConnectionState),

    /// Сгенерирован локальный ICE-кандидат, его нужно опубликовать в сторе.
    CandidateGenerated(IceCandidate),

    /// Собеседник начал отдавать дорожку.
    TrackStarted(Arc<TrackRemote>),
}
