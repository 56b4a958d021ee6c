use crate::store::{SignalingStore, Subscription};
use std::sync::Arc;
use tandem_core::SessionError;
use tandem_core::model::{
    Admission, CandidateLane, IceCandidate, ParticipantId, ParticipantRecord, PeerRole,
    RoomDocument, RoomId, SessionDescription,
};

/// Типизированный взгляд сессии на документный стор.
///
/// Канал знает комнату и роль, и за счет этого - в какой слот документа
/// писать свой SDP и какую полосу кандидатов читать. Сторона никогда не
/// читает собственную полосу, поэтому эха своих кандидатов не бывает.
pub struct SignalingChannel {
    store: Arc<dyn SignalingStore>,
    room: RoomId,
    role: PeerRole,
}

impl SignalingChannel {
    pub fn new(store: Arc<dyn SignalingStore>, room: RoomId, role: PeerRole) -> Self {
        Self { store, room, role }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub async fn create_room(&self, creator: ParticipantRecord) -> Result<(), SessionError> {
        self.store.create_room(&self.room, creator).await?;
        Ok(())
    }

    /// Вход в существующую комнату. Отказ стора превращается в типизированную
    /// ошибку сессии.
    pub async fn admit(&self, participant: ParticipantRecord) -> Result<RoomDocument, SessionError> {
        match self.store.admit_participant(&self.room, participant).await? {
            Admission::Granted { document } => Ok(document),
            Admission::RoomMissing => Err(SessionError::RoomNotFound(self.room.clone())),
            Admission::RoomFull => Err(SessionError::RoomFull(self.room.clone())),
        }
    }

    /// Публикация локального SDP в слот своей роли.
    pub async fn publish_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), SessionError> {
        match self.role {
            PeerRole::Creator => self.store.publish_offer(&self.room, description).await?,
            PeerRole::Joiner => self.store.publish_answer(&self.room, description).await?,
        }
        Ok(())
    }

    pub async fn send_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError> {
        let lane = CandidateLane::for_role(self.role);
        self.store
            .publish_candidate(&self.room, lane, candidate)
            .await?;
        Ok(())
    }

    /// Слот встречной стороны в данном снапшоте документа.
    pub fn remote_description<'a>(
        &self,
        document: &'a RoomDocument,
    ) -> Option<&'a SessionDescription> {
        match self.role {
            PeerRole::Creator => document.answer.as_ref(),
            PeerRole::Joiner => document.offer.as_ref(),
        }
    }

    pub async fn watch_room(&self) -> Result<Subscription<Option<RoomDocument>>, SessionError> {
        Ok(self.store.watch_room(&self.room).await?)
    }

    pub async fn watch_participants(
        &self,
    ) -> Result<Subscription<Vec<ParticipantRecord>>, SessionError> {
        Ok(self.store.watch_participants(&self.room).await?)
    }

    pub async fn watch_remote_candidates(
        &self,
    ) -> Result<Subscription<IceCandidate>, SessionError> {
        let lane = CandidateLane::for_role(self.role.peer());
        Ok(self.store.watch_candidates(&self.room, lane).await?)
    }

    pub async fn update_participant(
        &self,
        participant: ParticipantRecord,
    ) -> Result<(), SessionError> {
        self.store
            .update_participant(&self.room, participant)
            .await?;
        Ok(())
    }

    pub async fn remove_participant(
        &self,
        participant: &ParticipantId,
    ) -> Result<(), SessionError> {
        self.store
            .remove_participant(&self.room, participant)
            .await?;
        Ok(())
    }

    pub async fn list_participants(&self) -> Result<Vec<ParticipantRecord>, SessionError> {
        Ok(self.store.list_participants(&self.room).await?)
    }

    pub async fn mark_disconnected(&self) -> Result<(), SessionError> {
        self.store.mark_disconnected(&self.room).await?;
        Ok(())
    }

    pub async fn delete_room(&self) -> Result<(), SessionError> {
        self.store.delete_room(&self.room).await?;
        Ok(())
    }
}
