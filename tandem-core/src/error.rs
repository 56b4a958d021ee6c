use crate::model::RoomId;
use thiserror::Error;

/// Ошибки взаимодействия с документным стором.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected the operation: {0}")]
    Rejected(String),

    #[error("store request timed out")]
    Timeout,
}

/// Ошибки уровня сессии, которые видит владелец хэндла.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("media access denied: {0}")]
    MediaAccessDenied(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("room {0} already has two participants")]
    RoomFull(RoomId),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("signaling unavailable: {0}")]
    SignalingUnavailable(#[from] StoreError),

    #[error("transport failed: {0}")]
    TransportFailed(String),

    #[error("session already closed")]
    SessionClosed,
}

impl From<webrtc::Error> for SessionError {
    fn from(err: webrtc::Error) -> Self {
        Self::Negotiation(err.to_string())
    }
}
