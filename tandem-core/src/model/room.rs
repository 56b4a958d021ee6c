use crate::model::signaling::SessionDescription;
use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Длина генерируемого кода комнаты (буквы и цифры).
const ROOM_CODE_LEN: usize = 8;

/// Код комнаты. Пользователи вводят его руками, поэтому строка, а не Uuid.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new() -> Self {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ROOM_CODE_LEN)
            .map(char::from)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Корневой документ комнаты.
///
/// Слоты offer/answer заполняются по ходу переговоров, флаг disconnect
/// выставляет уходящая сторона, чтобы оставшаяся узнала о завершении звонка
/// даже без записи об участниках.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoomDocument {
    pub offer: Option<SessionDescription>,
    pub answer: Option<SessionDescription>,
    pub created_at: DateTime<Utc>,
    pub disconnect: bool,
}

impl RoomDocument {
    pub fn new() -> Self {
        Self {
            offer: None,
            answer: None,
            created_at: Utc::now(),
            disconnect: false,
        }
    }
}

impl Default for RoomDocument {
    fn default() -> Self {
        Self::new()
    }
}
