use std::collections::{HashMap, HashSet};
use tandem_core::model::{ParticipantId, ParticipantRecord};

/// Изменение состава комнаты, выведенное из очередного снапшота.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    PeerJoined(ParticipantRecord),
    PeerUpdated(ParticipantRecord),
    PeerLeft(ParticipantId),
}

/// Превращает снапшоты списка участников в события присутствия.
///
/// Стор отдает список целиком, причем один и тот же снапшот может прийти
/// повторно. Трекер хранит последнее известное состояние и отдает только
/// фактические изменения. Собственная запись участника отфильтровывается.
pub struct PresenceTracker {
    self_id: ParticipantId,
    known: HashMap<ParticipantId, ParticipantRecord>,
}

impl PresenceTracker {
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            self_id,
            known: HashMap::new(),
        }
    }

    /// Применяет снапшот. Сначала отдаются появления и изменения,
    /// затем уходы.
    pub fn observe(&mut self, snapshot: &[ParticipantRecord]) -> Vec<PresenceEvent> {
        let mut events = Vec::new();

        for record in snapshot {
            if record.id == self.self_id {
                continue;
            }
            match self.known.get(&record.id) {
                None => {
                    events.push(PresenceEvent::PeerJoined(record.clone()));
                    self.known.insert(record.id.clone(), record.clone());
                }
                Some(previous) if previous != record => {
                    events.push(PresenceEvent::PeerUpdated(record.clone()));
                    self.known.insert(record.id.clone(), record.clone());
                }
                Some(_) => {}
            }
        }

        let present: HashSet<&ParticipantId> = snapshot.iter().map(|r| &r.id).collect();
        let gone: Vec<ParticipantId> = self
            .known
            .keys()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();
        for id in gone {
            self.known.remove(&id);
            events.push(PresenceEvent::PeerLeft(id));
        }
        events
    }

    /// Известный собеседник. В двухсторонней комнате их не бывает больше одного.
    pub fn peer(&self) -> Option<&ParticipantRecord> {
        self.known.values().next()
    }
}
