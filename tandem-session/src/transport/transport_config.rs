use tandem_core::model::IceServerConfig;

/// Конфигурация ICE для WebRTC.
#[derive(Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![
                    "stun:stun.l.google.com:19302".to_owned(),
                    "stun:stun1.l.google.com:19302".to_owned(),
                ],
                username: None,
                credential: None,
            }],
        }
    }
}

impl TransportConfig {
    /// Без ICE серверов: только host-кандидаты. Годится для локальных тестов.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}
