use crate::store::{SignalingStore, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Mutex};
use tandem_core::StoreError;
use tandem_core::model::{
    Admission, CandidateLane, IceCandidate, ParticipantId, ParticipantRecord, RoomDocument, RoomId,
    SessionDescription,
};
use tokio::sync::{broadcast, mpsc};

const BROADCAST_CAPACITY: usize = 64;

/// Внутрипроцессный стор. Обе стороны звонка держат один и тот же экземпляр
/// (он дешево клонируется), поэтому удобен для тестов и локальных демо.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rooms: Arc<DashMap<RoomId, Arc<Mutex<RoomState>>>>,
}

/// Широковещательные каналы комнаты. При удалении комнаты структура
/// забирается из состояния и дропается, закрывая все подписки разом.
struct RoomChannels {
    room_tx: broadcast::Sender<Option<RoomDocument>>,
    participants_tx: broadcast::Sender<Vec<ParticipantRecord>>,
    offer_candidates_tx: broadcast::Sender<(usize, IceCandidate)>,
    answer_candidates_tx: broadcast::Sender<(usize, IceCandidate)>,
}

impl RoomChannels {
    fn new() -> Self {
        Self {
            room_tx: broadcast::channel(BROADCAST_CAPACITY).0,
            participants_tx: broadcast::channel(BROADCAST_CAPACITY).0,
            offer_candidates_tx: broadcast::channel(BROADCAST_CAPACITY).0,
            answer_candidates_tx: broadcast::channel(BROADCAST_CAPACITY).0,
        }
    }

    fn candidates_tx(&self, lane: CandidateLane) -> &broadcast::Sender<(usize, IceCandidate)> {
        match lane {
            CandidateLane::Offer => &self.offer_candidates_tx,
            CandidateLane::Answer => &self.answer_candidates_tx,
        }
    }
}

struct RoomState {
    document: RoomDocument,
    participants: Vec<ParticipantRecord>,
    offer_candidates: Vec<IceCandidate>,
    answer_candidates: Vec<IceCandidate>,
    channels: Option<RoomChannels>,
}

impl RoomState {
    fn new(creator: ParticipantRecord) -> Self {
        Self {
            document: RoomDocument::new(),
            participants: vec![creator],
            offer_candidates: Vec::new(),
            answer_candidates: Vec::new(),
            channels: Some(RoomChannels::new()),
        }
    }

    fn candidates(&self, lane: CandidateLane) -> &Vec<IceCandidate> {
        match lane {
            CandidateLane::Offer => &self.offer_candidates,
            CandidateLane::Answer => &self.answer_candidates,
        }
    }

    fn candidates_mut(&mut self, lane: CandidateLane) -> &mut Vec<IceCandidate> {
        match lane {
            CandidateLane::Offer => &mut self.offer_candidates,
            CandidateLane::Answer => &mut self.answer_candidates,
        }
    }

    fn channels(&self) -> Result<&RoomChannels, StoreError> {
        self.channels
            .as_ref()
            .ok_or_else(|| StoreError::Rejected("room deleted".to_owned()))
    }

    fn publish_document(&self) -> Result<(), StoreError> {
        let _ = self.channels()?.room_tx.send(Some(self.document.clone()));
        Ok(())
    }

    fn publish_participants(&self) -> Result<(), StoreError> {
        let _ = self
            .channels()?
            .participants_tx
            .send(self.participants.clone());
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn room(&self, room: &RoomId) -> Result<Arc<Mutex<RoomState>>, StoreError> {
        self.rooms
            .get(room)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::Rejected(format!("room {room} does not exist")))
    }
}

#[async_trait]
impl SignalingStore for MemoryStore {
    async fn create_room(
        &self,
        room: &RoomId,
        creator: ParticipantRecord,
    ) -> Result<(), StoreError> {
        match self.rooms.entry(room.clone()) {
            Entry::Occupied(_) => Err(StoreError::Rejected(format!(
                "room {room} already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(RoomState::new(creator))));
                Ok(())
            }
        }
    }

    async fn admit_participant(
        &self,
        room: &RoomId,
        participant: ParticipantRecord,
    ) -> Result<Admission, StoreError> {
        let Ok(state) = self.room(room) else {
            return Ok(Admission::RoomMissing);
        };
        let mut guard = state.lock().unwrap();
        // Комната могла быть удалена между чтением карты и взятием замка.
        if guard.channels.is_none() {
            return Ok(Admission::RoomMissing);
        }
        if guard.participants.len() >= 2 {
            return Ok(Admission::RoomFull);
        }
        guard.participants.push(participant);
        guard.publish_participants()?;
        Ok(Admission::Granted {
            document: guard.document.clone(),
        })
    }

    async fn publish_offer(
        &self,
        room: &RoomId,
        offer: SessionDescription,
    ) -> Result<(), StoreError> {
        let state = self.room(room)?;
        let mut guard = state.lock().unwrap();
        guard.document.offer = Some(offer);
        guard.publish_document()
    }

    async fn publish_answer(
        &self,
        room: &RoomId,
        answer: SessionDescription,
    ) -> Result<(), StoreError> {
        let state = self.room(room)?;
        let mut guard = state.lock().unwrap();
        guard.document.answer = Some(answer);
        guard.publish_document()
    }

    async fn publish_candidate(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        candidate: IceCandidate,
    ) -> Result<(), StoreError> {
        let state = self.room(room)?;
        let mut guard = state.lock().unwrap();
        let index = guard.candidates(lane).len();
        guard.candidates_mut(lane).push(candidate.clone());
        let _ = guard.channels()?.candidates_tx(lane).send((index, candidate));
        Ok(())
    }

    async fn update_participant(
        &self,
        room: &RoomId,
        participant: ParticipantRecord,
    ) -> Result<(), StoreError> {
        let state = self.room(room)?;
        let mut guard = state.lock().unwrap();
        let Some(slot) = guard
            .participants
            .iter_mut()
            .find(|record| record.id == participant.id)
        else {
            return Err(StoreError::Rejected(format!(
                "participant {} is not in room {room}",
                participant.id
            )));
        };
        *slot = participant;
        guard.publish_participants()
    }

    async fn remove_participant(
        &self,
        room: &RoomId,
        participant: &ParticipantId,
    ) -> Result<(), StoreError> {
        let state = self.room(room)?;
        let mut guard = state.lock().unwrap();
        guard.participants.retain(|record| record.id != *participant);
        guard.publish_participants()
    }

    async fn list_participants(&self, room: &RoomId) -> Result<Vec<ParticipantRecord>, StoreError> {
        let state = self.room(room)?;
        let guard = state.lock().unwrap();
        Ok(guard.participants.clone())
    }

    async fn mark_disconnected(&self, room: &RoomId) -> Result<(), StoreError> {
        let state = self.room(room)?;
        let mut guard = state.lock().unwrap();
        guard.document.disconnect = true;
        guard.publish_document()
    }

    async fn delete_room(&self, room: &RoomId) -> Result<(), StoreError> {
        // Удаление идемпотентно: повторный вызов просто ничего не делает.
        let Some((_, state)) = self.rooms.remove(room) else {
            return Ok(());
        };
        let mut guard = state.lock().unwrap();
        if let Some(channels) = guard.channels.take() {
            let _ = channels.room_tx.send(None);
        }
        Ok(())
    }

    async fn watch_room(
        &self,
        room: &RoomId,
    ) -> Result<Subscription<Option<RoomDocument>>, StoreError> {
        let state = self.room(room)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot, mut updates) = {
            let guard = state.lock().unwrap();
            (guard.document.clone(), guard.channels()?.room_tx.subscribe())
        };
        let forward = tokio::spawn(async move {
            if tx.send(Some(snapshot)).is_err() {
                return;
            }
            loop {
                match updates.recv().await {
                    Ok(document) => {
                        let deleted = document.is_none();
                        if tx.send(document).is_err() || deleted {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        Ok(Subscription::new(rx, move || forward.abort()))
    }

    async fn watch_participants(
        &self,
        room: &RoomId,
    ) -> Result<Subscription<Vec<ParticipantRecord>>, StoreError> {
        let state = self.room(room)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot, mut updates) = {
            let guard = state.lock().unwrap();
            (
                guard.participants.clone(),
                guard.channels()?.participants_tx.subscribe(),
            )
        };
        let forward = tokio::spawn(async move {
            if tx.send(snapshot).is_err() {
                return;
            }
            loop {
                match updates.recv().await {
                    Ok(participants) => {
                        if tx.send(participants).is_err() {
                            return;
                        }
                    }
                    // Снапшоты самодостаточны, пропуск промежуточных не страшен.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        Ok(Subscription::new(rx, move || forward.abort()))
    }

    async fn watch_candidates(
        &self,
        room: &RoomId,
        lane: CandidateLane,
    ) -> Result<Subscription<IceCandidate>, StoreError> {
        let state = self.room(room)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (backlog, mut updates) = {
            let guard = state.lock().unwrap();
            (
                guard.candidates(lane).clone(),
                guard.channels()?.candidates_tx(lane).subscribe(),
            )
        };
        let resync = state.clone();
        let forward = tokio::spawn(async move {
            let mut next_index = backlog.len();
            for candidate in backlog {
                if tx.send(candidate).is_err() {
                    return;
                }
            }
            loop {
                match updates.recv().await {
                    Ok((index, candidate)) => {
                        // Уже доставлен из снапшота.
                        if index < next_index {
                            continue;
                        }
                        next_index = index + 1;
                        if tx.send(candidate).is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Дольем пропущенное из состояния комнаты.
                        let missed: Vec<IceCandidate> = {
                            let guard = resync.lock().unwrap();
                            guard.candidates(lane)[next_index..].to_vec()
                        };
                        next_index += missed.len();
                        for candidate in missed {
                            if tx.send(candidate).is_err() {
                                return;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        Ok(Subscription::new(rx, move || forward.abort()))
    }
}
