use std::fmt;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Почему сессия завершилась.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CloseReason {
    /// Локальная сторона положила трубку.
    LocalLeave,
    /// Собеседник вышел из комнаты.
    PeerLeft,
    /// Документ комнаты удален из стора.
    RoomClosed,
    /// Транспорт перешел в failed и не восстановился.
    TransportFailed,
    /// Потеряна связь с документным стором.
    SignalingLost,
}

/// Состояние звонка, которое видит владелец хэндла.
///
/// Disconnected не терминально: ICE может восстановиться сам. Терминальны
/// только Failed и Closed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed(CloseReason),
}

impl ConnectionState {
    /// Отображение состояния RTCPeerConnection в состояние сессии.
    ///
    /// Closed со стороны транспорта не пробрасывается: его публикует сам
    /// координатор вместе с причиной.
    pub fn from_peer_state(state: RTCPeerConnectionState) -> Option<Self> {
        match state {
            RTCPeerConnectionState::New | RTCPeerConnectionState::Connecting => {
                Some(Self::Connecting)
            }
            RTCPeerConnectionState::Connected => Some(Self::Connected),
            RTCPeerConnectionState::Disconnected => Some(Self::Disconnected),
            RTCPeerConnectionState::Failed => Some(Self::Failed),
            RTCPeerConnectionState::Closed | RTCPeerConnectionState::Unspecified => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Failed => write!(f, "failed"),
            Self::Closed(reason) => write!(f, "closed ({:?})", reason),
        }
    }
}
