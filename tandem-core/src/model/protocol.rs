use crate::model::peer::{ParticipantId, ParticipantRecord};
use crate::model::room::{RoomDocument, RoomId};
use crate::model::signaling::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct WatchId(pub Uuid);

impl WatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Полоса кандидатов: у каждой роли своя, читают всегда чужую.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub enum CandidateLane {
    Offer,
    Answer,
}

impl CandidateLane {
    /// Полоса, в которую пишет данная роль.
    pub fn for_role(role: crate::model::PeerRole) -> Self {
        match role {
            crate::model::PeerRole::Creator => Self::Offer,
            crate::model::PeerRole::Joiner => Self::Answer,
        }
    }
}

/// Итог попытки входа в комнату. Решение принимает стор, одной операцией,
/// чтобы два входящих не прошли по одному и тому же снапшоту.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Admission {
    Granted { document: RoomDocument },
    RoomMissing,
    RoomFull,
}

/// Запросы клиента к документному стору.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "op", content = "d")]
pub enum StoreRequest {
    CreateRoom {
        request: RequestId,
        room: RoomId,
        creator: ParticipantRecord,
    },
    Join {
        request: RequestId,
        room: RoomId,
        participant: ParticipantRecord,
    },
    PublishOffer {
        request: RequestId,
        room: RoomId,
        offer: SessionDescription,
    },
    PublishAnswer {
        request: RequestId,
        room: RoomId,
        answer: SessionDescription,
    },
    PublishCandidate {
        request: RequestId,
        room: RoomId,
        lane: CandidateLane,
        candidate: IceCandidate,
    },
    UpdateParticipant {
        request: RequestId,
        room: RoomId,
        participant: ParticipantRecord,
    },
    RemoveParticipant {
        request: RequestId,
        room: RoomId,
        participant: ParticipantId,
    },
    ListParticipants {
        request: RequestId,
        room: RoomId,
    },
    MarkDisconnected {
        request: RequestId,
        room: RoomId,
    },
    DeleteRoom {
        request: RequestId,
        room: RoomId,
    },
    WatchRoom {
        request: RequestId,
        room: RoomId,
        watch: WatchId,
    },
    WatchParticipants {
        request: RequestId,
        room: RoomId,
        watch: WatchId,
    },
    WatchCandidates {
        request: RequestId,
        room: RoomId,
        lane: CandidateLane,
        watch: WatchId,
    },
    Unwatch {
        request: RequestId,
        watch: WatchId,
    },
}

impl StoreRequest {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::CreateRoom { request, .. }
            | Self::Join { request, .. }
            | Self::PublishOffer { request, .. }
            | Self::PublishAnswer { request, .. }
            | Self::PublishCandidate { request, .. }
            | Self::UpdateParticipant { request, .. }
            | Self::RemoveParticipant { request, .. }
            | Self::ListParticipants { request, .. }
            | Self::MarkDisconnected { request, .. }
            | Self::DeleteRoom { request, .. }
            | Self::WatchRoom { request, .. }
            | Self::WatchParticipants { request, .. }
            | Self::WatchCandidates { request, .. }
            | Self::Unwatch { request, .. } => *request,
        }
    }
}

/// Ответы и push-события стора.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "op", content = "d")]
pub enum StoreReply {
    Ack {
        request: RequestId,
    },
    Admission {
        request: RequestId,
        outcome: Admission,
    },
    Participants {
        request: RequestId,
        participants: Vec<ParticipantRecord>,
    },
    Failed {
        request: RequestId,
        message: String,
    },
    Event {
        watch: WatchId,
        event: StoreEvent,
    },
}

impl StoreReply {
    /// Для push-событий возвращает None: они не привязаны к запросу.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Ack { request }
            | Self::Admission { request, .. }
            | Self::Participants { request, .. }
            | Self::Failed { request, .. } => Some(*request),
            Self::Event { .. } => None,
        }
    }
}

/// Что именно изменилось под активной подпиской.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "op", content = "d")]
pub enum StoreEvent {
    /// Снапшот документа комнаты. None означает, что документ удален.
    Room { document: Option<RoomDocument> },
    /// Полный снапшот списка участников.
    Participants { participants: Vec<ParticipantRecord> },
    /// Очередной кандидат из полосы.
    Candidate { candidate: IceCandidate },
}
