use crate::transport::TransportConfig;
use tandem_core::model::{ParticipantId, ParticipantProfile};

/// Параметры новой сессии.
#[derive(Clone)]
pub struct SessionConfig {
    /// Идентичность локального участника. Фиксируется при создании сессии
    /// и дальше не меняется.
    pub identity: ParticipantId,
    /// Имя, которое увидит собеседник.
    pub display_name: Option<String>,
    /// Стартовое состояние дорожек (включен ли микрофон и камера на входе).
    pub profile: ParticipantProfile,
    /// Настройки ICE (STUN-серверы).
    pub transport: TransportConfig,
}

impl SessionConfig {
    pub fn new(identity: ParticipantId) -> Self {
        Self {
            identity,
            display_name: None,
            profile: ParticipantProfile::default(),
            transport: TransportConfig::default(),
        }
    }
}
