use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(Uuid::parse_str(s).unwrap())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(Uuid::parse_str(&s).unwrap())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Роль стороны в комнате. Создатель публикует Offer, второй участник - Answer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub enum PeerRole {
    Creator,
    Joiner,
}

impl PeerRole {
    /// Роль противоположной стороны.
    pub fn peer(self) -> Self {
        match self {
            Self::Creator => Self::Joiner,
            Self::Joiner => Self::Creator,
        }
    }
}

/// Какие дорожки участник сейчас отдает (микрофон/камера включены или нет).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub struct ParticipantProfile {
    pub audio: bool,
    pub video: bool,
}

impl Default for ParticipantProfile {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Запись участника в документном сторе (по одной на каждую сторону звонка).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub role: PeerRole,
    pub display_name: Option<String>,
    pub profile: ParticipantProfile,
    pub joined_at: DateTime<Utc>,
}

impl ParticipantRecord {
    pub fn new(id: ParticipantId, role: PeerRole, display_name: Option<String>) -> Self {
        Self {
            id,
            role,
            display_name,
            profile: ParticipantProfile::default(),
            joined_at: Utc::now(),
        }
    }
}
