use crate::store::{SignalingStore, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tandem_core::StoreError;
use tandem_core::model::{
    Admission, CandidateLane, IceCandidate, ParticipantId, ParticipantRecord, RequestId,
    RoomDocument, RoomId, SessionDescription, StoreEvent, StoreReply, StoreRequest, WatchId,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

enum WatchSink {
    Room(mpsc::UnboundedSender<Option<RoomDocument>>),
    Participants(mpsc::UnboundedSender<Vec<ParticipantRecord>>),
    Candidates(mpsc::UnboundedSender<IceCandidate>),
}

/// Клиент rendezvous-сервиса. Запросы коррелируются по RequestId, push-события
/// раскладываются по подпискам через WatchId, который генерирует клиент,
/// поэтому событие не может прийти раньше, чем зарегистрирован его маршрут.
pub struct RemoteStore {
    request_tx: mpsc::UnboundedSender<StoreRequest>,
    pending: Arc<DashMap<RequestId, oneshot::Sender<StoreReply>>>,
    watches: Arc<DashMap<WatchId, WatchSink>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RemoteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("websocket connect failed: {e}")))?;
        debug!("connected to store at {url}");
        let (mut ws_tx, mut ws_rx) = ws.split();

        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<StoreRequest>();
        let pending: Arc<DashMap<RequestId, oneshot::Sender<StoreReply>>> =
            Arc::new(DashMap::new());
        let watches: Arc<DashMap<WatchId, WatchSink>> = Arc::new(DashMap::new());

        let send_task = tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let Ok(text) = serde_json::to_string(&request) else {
                    continue;
                };
                if ws_tx.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_watches = watches.clone();
        let recv_task = tokio::spawn(async move {
            while let Some(message) = ws_rx.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        route_message(&text, &reader_pending, &reader_watches);
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            // Сокет умер: подвисшие запросы и подписки закрываются разом.
            reader_pending.clear();
            reader_watches.clear();
            debug!("store connection closed");
        });

        Ok(Self {
            request_tx,
            pending,
            watches,
            tasks: Mutex::new(vec![send_task, recv_task]),
        })
    }

    async fn request(&self, request: StoreRequest) -> Result<StoreReply, StoreError> {
        let id = request.request_id();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        if self.request_tx.send(request).is_err() {
            self.pending.remove(&id);
            return Err(StoreError::Unavailable("store connection closed".into()));
        }
        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(StoreError::Unavailable("store connection closed".into())),
            Err(_) => {
                self.pending.remove(&id);
                Err(StoreError::Timeout)
            }
        }
    }

    async fn request_ack(&self, request: StoreRequest) -> Result<(), StoreError> {
        expect_ack(self.request(request).await?)
    }

    async fn open_watch(
        &self,
        watch: WatchId,
        sink: WatchSink,
        request: StoreRequest,
    ) -> Result<(), StoreError> {
        // Маршрут регистрируется до запроса, иначе первое событие может
        // обогнать Ack и потеряться.
        self.watches.insert(watch, sink);
        if let Err(e) = self.request_ack(request).await {
            self.watches.remove(&watch);
            return Err(e);
        }
        Ok(())
    }

    fn watch_canceller(&self, watch: WatchId) -> impl FnOnce() + Send + 'static {
        let watches = self.watches.clone();
        let request_tx = self.request_tx.clone();
        move || {
            watches.remove(&watch);
            let _ = request_tx.send(StoreRequest::Unwatch {
                request: RequestId::new(),
                watch,
            });
        }
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}

fn route_message(
    text: &str,
    pending: &DashMap<RequestId, oneshot::Sender<StoreReply>>,
    watches: &DashMap<WatchId, WatchSink>,
) {
    let reply = match serde_json::from_str::<StoreReply>(text) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("malformed store message: {e}");
            return;
        }
    };
    match reply {
        StoreReply::Event { watch, event } => {
            let Some(sink) = watches.get(&watch) else {
                debug!("event for unknown watch {:?}", watch);
                return;
            };
            deliver(sink.value(), event);
        }
        reply => {
            let Some(id) = reply.request_id() else { return };
            let Some((_, tx)) = pending.remove(&id) else {
                // Ack на fire-and-forget Unwatch попадает сюда.
                debug!("reply for unknown request {:?}", id);
                return;
            };
            let _ = tx.send(reply);
        }
    }
}

fn deliver(sink: &WatchSink, event: StoreEvent) {
    match (sink, event) {
        (WatchSink::Room(tx), StoreEvent::Room { document }) => {
            let _ = tx.send(document);
        }
        (WatchSink::Participants(tx), StoreEvent::Participants { participants }) => {
            let _ = tx.send(participants);
        }
        (WatchSink::Candidates(tx), StoreEvent::Candidate { candidate }) => {
            let _ = tx.send(candidate);
        }
        _ => warn!("store event kind does not match the watch"),
    }
}

fn expect_ack(reply: StoreReply) -> Result<(), StoreError> {
    match reply {
        StoreReply::Ack { .. } => Ok(()),
        StoreReply::Failed { message, .. } => Err(StoreError::Rejected(message)),
        other => Err(StoreError::Rejected(format!(
            "unexpected reply: {other:?}"
        ))),
    }
}

#[async_trait]
impl SignalingStore for RemoteStore {
    async fn create_room(
        &self,
        room: &RoomId,
        creator: ParticipantRecord,
    ) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::CreateRoom {
            request: RequestId::new(),
            room: room.clone(),
            creator,
        })
        .await
    }

    async fn admit_participant(
        &self,
        room: &RoomId,
        participant: ParticipantRecord,
    ) -> Result<Admission, StoreError> {
        let reply = self
            .request(StoreRequest::Join {
                request: RequestId::new(),
                room: room.clone(),
                participant,
            })
            .await?;
        match reply {
            StoreReply::Admission { outcome, .. } => Ok(outcome),
            StoreReply::Failed { message, .. } => Err(StoreError::Rejected(message)),
            other => Err(StoreError::Rejected(format!(
                "unexpected reply: {other:?}"
            ))),
        }
    }

    async fn publish_offer(
        &self,
        room: &RoomId,
        offer: SessionDescription,
    ) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::PublishOffer {
            request: RequestId::new(),
            room: room.clone(),
            offer,
        })
        .await
    }

    async fn publish_answer(
        &self,
        room: &RoomId,
        answer: SessionDescription,
    ) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::PublishAnswer {
            request: RequestId::new(),
            room: room.clone(),
            answer,
        })
        .await
    }

    async fn publish_candidate(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        candidate: IceCandidate,
    ) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::PublishCandidate {
            request: RequestId::new(),
            room: room.clone(),
            lane,
            candidate,
        })
        .await
    }

    async fn update_participant(
        &self,
        room: &RoomId,
        participant: ParticipantRecord,
    ) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::UpdateParticipant {
            request: RequestId::new(),
            room: room.clone(),
            participant,
        })
        .await
    }

    async fn remove_participant(
        &self,
        room: &RoomId,
        participant: &ParticipantId,
    ) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::RemoveParticipant {
            request: RequestId::new(),
            room: room.clone(),
            participant: participant.clone(),
        })
        .await
    }

    async fn list_participants(&self, room: &RoomId) -> Result<Vec<ParticipantRecord>, StoreError> {
        let reply = self
            .request(StoreRequest::ListParticipants {
                request: RequestId::new(),
                room: room.clone(),
            })
            .await?;
        match reply {
            StoreReply::Participants { participants, .. } => Ok(participants),
            StoreReply::Failed { message, .. } => Err(StoreError::Rejected(message)),
            other => Err(StoreError::Rejected(format!(
                "unexpected reply: {other:?}"
            ))),
        }
    }

    async fn mark_disconnected(&self, room: &RoomId) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::MarkDisconnected {
            request: RequestId::new(),
            room: room.clone(),
        })
        .await
    }

    async fn delete_room(&self, room: &RoomId) -> Result<(), StoreError> {
        self.request_ack(StoreRequest::DeleteRoom {
            request: RequestId::new(),
            room: room.clone(),
        })
        .await
    }

    async fn watch_room(
        &self,
        room: &RoomId,
    ) -> Result<Subscription<Option<RoomDocument>>, StoreError> {
        let watch = WatchId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.open_watch(
            watch,
            WatchSink::Room(tx),
            StoreRequest::WatchRoom {
                request: RequestId::new(),
                room: room.clone(),
                watch,
            },
        )
        .await?;
        Ok(Subscription::new(rx, self.watch_canceller(watch)))
    }

    async fn watch_participants(
        &self,
        room: &RoomId,
    ) -> Result<Subscription<Vec<ParticipantRecord>>, StoreError> {
        let watch = WatchId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.open_watch(
            watch,
            WatchSink::Participants(tx),
            StoreRequest::WatchParticipants {
                request: RequestId::new(),
                room: room.clone(),
                watch,
            },
        )
        .await?;
        Ok(Subscription::new(rx, self.watch_canceller(watch)))
    }

    async fn watch_candidates(
        &self,
        room: &RoomId,
        lane: CandidateLane,
    ) -> Result<Subscription<IceCandidate>, StoreError> {
        let watch = WatchId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.open_watch(
            watch,
            WatchSink::Candidates(tx),
            StoreRequest::WatchCandidates {
                request: RequestId::new(),
                room: room.clone(),
                lane,
                watch,
            },
        )
        .await?;
        Ok(Subscription::new(rx, self.watch_canceller(watch)))
    }
}
