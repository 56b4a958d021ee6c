use crate::service::RendezvousService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use tandem_core::StoreError;
use tandem_core::model::{StoreEvent, StoreReply, StoreRequest, WatchId};
use tandem_session::{SignalingStore, Subscription};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub(crate) async fn store_handler(
    ws: WebSocketUpgrade,
    State(service): State<RendezvousService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RendezvousService) {
    info!("store client connected");

    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<StoreReply>();

    let mut send_task = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            let Ok(json) = serde_json::to_string(&reply) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        // Сессия живет в задаче чтения; ее Drop снимает все наблюдения.
        let mut session = ClientSession::new(service, reply_tx);
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => session.handle_text(&text).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    info!("store client disconnected");
}

/// Один подключенный клиент стора: его исходящий канал и активные
/// наблюдения. Форвардер каждого наблюдения помечает события WatchId,
/// который выбрал сам клиент.
struct ClientSession {
    service: RendezvousService,
    reply_tx: mpsc::UnboundedSender<StoreReply>,
    watches: HashMap<WatchId, JoinHandle<()>>,
}

impl ClientSession {
    fn new(service: RendezvousService, reply_tx: mpsc::UnboundedSender<StoreReply>) -> Self {
        Self {
            service,
            reply_tx,
            watches: HashMap::new(),
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let request = match serde_json::from_str::<StoreRequest>(text) {
            Ok(request) => request,
            Err(e) => {
                warn!("malformed store request: {e}");
                return;
            }
        };

        let id = request.request_id();
        let reply = match self.apply(request).await {
            Ok(reply) => reply,
            Err(e) => StoreReply::Failed {
                request: id,
                message: e.to_string(),
            },
        };
        let _ = self.reply_tx.send(reply);
    }

    async fn apply(&mut self, request: StoreRequest) -> Result<StoreReply, StoreError> {
        let store = self.service.store();
        match request {
            StoreRequest::CreateRoom {
                request,
                room,
                creator,
            } => {
                store.create_room(&room, creator).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::Join {
                request,
                room,
                participant,
            } => {
                let outcome = store.admit_participant(&room, participant).await?;
                Ok(StoreReply::Admission { request, outcome })
            }

            StoreRequest::PublishOffer {
                request,
                room,
                offer,
            } => {
                store.publish_offer(&room, offer).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::PublishAnswer {
                request,
                room,
                answer,
            } => {
                store.publish_answer(&room, answer).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::PublishCandidate {
                request,
                room,
                lane,
                candidate,
            } => {
                store.publish_candidate(&room, lane, candidate).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::UpdateParticipant {
                request,
                room,
                participant,
            } => {
                store.update_participant(&room, participant).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::RemoveParticipant {
                request,
                room,
                participant,
            } => {
                store.remove_participant(&room, &participant).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::ListParticipants { request, room } => {
                let participants = store.list_participants(&room).await?;
                Ok(StoreReply::Participants {
                    request,
                    participants,
                })
            }

            StoreRequest::MarkDisconnected { request, room } => {
                store.mark_disconnected(&room).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::DeleteRoom { request, room } => {
                store.delete_room(&room).await?;
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::WatchRoom {
                request,
                room,
                watch,
            } => {
                let subscription = store.watch_room(&room).await?;
                self.register_watch(watch, subscription, |document| StoreEvent::Room {
                    document,
                });
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::WatchParticipants {
                request,
                room,
                watch,
            } => {
                let subscription = store.watch_participants(&room).await?;
                self.register_watch(watch, subscription, |participants| {
                    StoreEvent::Participants { participants }
                });
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::WatchCandidates {
                request,
                room,
                lane,
                watch,
            } => {
                let subscription = store.watch_candidates(&room, lane).await?;
                self.register_watch(watch, subscription, |candidate| StoreEvent::Candidate {
                    candidate,
                });
                Ok(StoreReply::Ack { request })
            }

            StoreRequest::Unwatch { request, watch } => {
                if let Some(task) = self.watches.remove(&watch) {
                    task.abort();
                }
                Ok(StoreReply::Ack { request })
            }
        }
    }

    /// Поднимает форвардер подписки. Подписка живет внутри задачи, abort
    /// задачи роняет и ее, снимая наблюдение в сторе.
    fn register_watch<T, F>(&mut self, watch: WatchId, mut subscription: Subscription<T>, wrap: F)
    where
        T: Send + 'static,
        F: Fn(T) -> StoreEvent + Send + 'static,
    {
        let reply_tx = self.reply_tx.clone();
        let task = tokio::spawn(async move {
            while let Some(item) = subscription.recv().await {
                let reply = StoreReply::Event {
                    watch,
                    event: wrap(item),
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
        });
        if let Some(previous) = self.watches.insert(watch, task) {
            previous.abort();
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        for (_, task) in self.watches.drain() {
            task.abort();
        }
    }
}
