mod memory;
mod remote;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

use async_trait::async_trait;
use tandem_core::StoreError;
use tandem_core::model::{
    Admission, CandidateLane, IceCandidate, ParticipantId, ParticipantRecord, RoomDocument, RoomId,
    SessionDescription,
};
use tokio::sync::mpsc;

/// Документный стор, через который стороны обмениваются сигналингом.
///
/// Контракт по порядку доставки: снапшоты одного документа приходят в порядке
/// записи, кандидаты одной полосы приходят в порядке публикации. Порядок между
/// разными документами не гарантируется.
#[async_trait]
pub trait SignalingStore: Send + Sync {
    /// Зарегистрировать комнату и запись создателя одной операцией.
    async fn create_room(
        &self,
        room: &RoomId,
        creator: ParticipantRecord,
    ) -> Result<(), StoreError>;

    /// Попытка входа. Проверка наличия комнаты, подсчет участников и вставка
    /// записи выполняются атомарно на стороне стора.
    async fn admit_participant(
        &self,
        room: &RoomId,
        participant: ParticipantRecord,
    ) -> Result<Admission, StoreError>;

    async fn publish_offer(
        &self,
        room: &RoomId,
        offer: SessionDescription,
    ) -> Result<(), StoreError>;

    async fn publish_answer(
        &self,
        room: &RoomId,
        answer: SessionDescription,
    ) -> Result<(), StoreError>;

    async fn publish_candidate(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        candidate: IceCandidate,
    ) -> Result<(), StoreError>;

    async fn update_participant(
        &self,
        room: &RoomId,
        participant: ParticipantRecord,
    ) -> Result<(), StoreError>;

    async fn remove_participant(
        &self,
        room: &RoomId,
        participant: &ParticipantId,
    ) -> Result<(), StoreError>;

    /// Разовое чтение списка участников. Нужно уходящей стороне, чтобы
    /// решить, убирать за собой только свою запись или всю комнату.
    async fn list_participants(
        &self,
        room: &RoomId,
    ) -> Result<Vec<ParticipantRecord>, StoreError>;

    /// Пометить документ комнаты флагом disconnect, не удаляя его.
    async fn mark_disconnected(&self, room: &RoomId) -> Result<(), StoreError>;

    async fn delete_room(&self, room: &RoomId) -> Result<(), StoreError>;

    /// Наблюдение за документом комнаты. Первым элементом приходит текущий
    /// снапшот, None означает удаление документа.
    async fn watch_room(
        &self,
        room: &RoomId,
    ) -> Result<Subscription<Option<RoomDocument>>, StoreError>;

    /// Наблюдение за списком участников, каждый элемент - полный снапшот.
    async fn watch_participants(
        &self,
        room: &RoomId,
    ) -> Result<Subscription<Vec<ParticipantRecord>>, StoreError>;

    /// Наблюдение за полосой кандидатов: сперва уже накопленные, затем новые.
    async fn watch_candidates(
        &self,
        room: &RoomId,
        lane: CandidateLane,
    ) -> Result<Subscription<IceCandidate>, StoreError>;
}

/// Живая подписка на события стора. При Drop наблюдение снимается.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _guard: SubscriptionGuard,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<T>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            _guard: SubscriptionGuard {
                cancel: Some(Box::new(cancel)),
            },
        }
    }

    /// None означает, что источник подписки закрылся (документ удален или
    /// связь со стором потеряна).
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

struct SubscriptionGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
