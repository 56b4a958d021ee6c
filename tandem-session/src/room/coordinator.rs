use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

use crate::media::{LocalMedia, MediaKind, MediaSource, switch_device};
use crate::presence::{PresenceEvent, PresenceTracker};
use crate::room::config::SessionConfig;
use crate::room::event::{RemoteMedia, SessionCommand, SessionEvent};
use crate::room::handle::SessionHandle;
use crate::signaling::SignalingChannel;
use crate::store::{SignalingStore, Subscription};
use crate::transport::{IceTransport, TransportEvent};
use tandem_core::SessionError;
use tandem_core::model::{
    CloseReason, ConnectionState, IceCandidate, ParticipantRecord, PeerRole, RoomDocument, RoomId,
    SessionDescription,
};

/// Актор одной сессии звонка.
///
/// Команды хэндла, события транспорта и снапшоты стора сливаются в общий
/// цикл и обрабатываются строго по одному, поэтому внутри координатора нет
/// ни замков, ни гонок между источниками.
pub struct RoomCoordinator {
    /// Типизированный доступ к документному стору.
    channel: SignalingChannel,

    /// WebRTC соединение сессии.
    transport: IceTransport,

    /// Локальные дорожки (микрофон и камера).
    media: LocalMedia,

    /// Источник захвата, нужен для горячей смены устройств.
    source: Arc<dyn MediaSource>,

    /// Выводит события присутствия из снапшотов списка участников.
    presence: PresenceTracker,

    /// Собственная запись участника в сторе.
    record: ParticipantRecord,

    /// Канал для приема команд от хэндла.
    command_rx: mpsc::Receiver<SessionCommand>,

    /// Общая очередь событий транспорта и стора.
    event_rx: mpsc::Receiver<SessionEvent>,

    /// Наблюдаемые состояния для владельца хэндла.
    state_tx: watch::Sender<ConnectionState>,
    remote_tx: watch::Sender<RemoteMedia>,
    peer_tx: watch::Sender<Option<ParticipantRecord>>,

    /// Задачи, которые кормят общую очередь событий.
    forwarders: Vec<JoinHandle<()>>,

    /// Удаленный SDP применяется не более одного раза за сессию.
    remote_applied: bool,

    /// Защита от повторной уборки.
    torn_down: bool,
}

impl RoomCoordinator {
    /// Создает новую комнату и запускает сессию создателя.
    /// Код комнаты доступен через хэндл, его передают второй стороне.
    pub async fn create(
        store: Arc<dyn SignalingStore>,
        source: Arc<dyn MediaSource>,
        config: SessionConfig,
    ) -> Result<SessionHandle, SessionError> {
        Self::start(store, source, config, RoomId::new(), PeerRole::Creator).await
    }

    /// Входит в существующую комнату по коду.
    pub async fn join(
        store: Arc<dyn SignalingStore>,
        source: Arc<dyn MediaSource>,
        room: RoomId,
        config: SessionConfig,
    ) -> Result<SessionHandle, SessionError> {
        Self::start(store, source, config, room, PeerRole::Joiner).await
    }

    async fn start(
        store: Arc<dyn SignalingStore>,
        source: Arc<dyn MediaSource>,
        config: SessionConfig,
        room: RoomId,
        role: PeerRole,
    ) -> Result<SessionHandle, SessionError> {
        // 1. Медиа открывается до любых записей в стор: если устройств нет
        //    или доступ запрещен, комната не должна появиться вовсе.
        let media = LocalMedia::open(source.as_ref(), &config.profile).await?;

        let mut record =
            ParticipantRecord::new(config.identity.clone(), role, config.display_name.clone());
        record.profile = config.profile;

        let channel = SignalingChannel::new(store, room.clone(), role);

        // 2. Регистрация в сторе. Создатель заводит документ комнаты, второй
        //    участник проходит атомарный въезд и получает текущий снапшот.
        let admitted = match role {
            PeerRole::Creator => {
                channel.create_room(record.clone()).await?;
                None
            }
            PeerRole::Joiner => Some(channel.admit(record.clone()).await?),
        };

        // 3. Транспорт и подписки стора. События обоих заворачиваются в одну
        //    очередь. С этого места ошибка setup обязана прибрать за собой.
        let (event_tx, event_rx) = mpsc::channel(256);
        let (transport_tx, transport_rx) = mpsc::channel(256);

        let prepared: Result<(IceTransport, Vec<JoinHandle<()>>), SessionError> = async {
            let transport = IceTransport::new(config.transport.clone(), transport_tx).await?;
            // Локальные дорожки встают в SDP до первого Offer/Answer.
            for kind in [MediaKind::Audio, MediaKind::Video] {
                if let Some(track) = media.track(kind) {
                    transport.add_local_track(track).await?;
                }
            }

            let room_watch = channel.watch_room().await?;
            let participants_watch = channel.watch_participants().await?;
            let candidates_watch = channel.watch_remote_candidates().await?;

            let forwarders = vec![
                forward_transport(transport_rx, event_tx.clone()),
                forward_room(room_watch, event_tx.clone()),
                forward_participants(participants_watch, event_tx.clone()),
                forward_candidates(candidates_watch, event_tx.clone()),
            ];
            Ok((transport, forwarders))
        }
        .await;

        let (transport, forwarders) = match prepared {
            Ok(parts) => parts,
            Err(e) => {
                warn!("session setup failed: {e}");
                clean_room(&channel, &record, role == PeerRole::Joiner).await;
                return Err(e);
            }
        };

        // 4. Начальные переговоры по роли. Создатель публикует Offer сразу;
        //    второй участник отвечает на Offer из снапшота при въезде, а если
        //    Offer туда еще не записан - дождется его из наблюдения за комнатой.
        let mut remote_applied = false;
        let negotiated: Result<(), SessionError> = async {
            match role {
                PeerRole::Creator => {
                    let offer = transport.create_offer().await?;
                    channel.publish_description(offer).await?;
                }
                PeerRole::Joiner => {
                    let offer = admitted
                        .as_ref()
                        .and_then(|document| channel.remote_description(document));
                    if let Some(offer) = offer {
                        transport.apply_remote_description(offer).await?;
                        remote_applied = true;
                        let answer = transport.create_answer().await?;
                        channel.publish_description(answer).await?;
                    }
                }
            }
            Ok(())
        }
        .await;

        if let Err(e) = negotiated {
            error!("initial negotiation failed: {e}");
            for forwarder in &forwarders {
                forwarder.abort();
            }
            let _ = transport.close().await;
            clean_room(&channel, &record, role == PeerRole::Joiner).await;
            return Err(e);
        }

        // 5. Хэндл и цикл сессии.
        let (command_tx, command_rx) = mpsc::channel(100);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (remote_tx, remote_rx) = watch::channel(RemoteMedia::default());
        let (peer_tx, peer_rx) = watch::channel(None);

        let identity = record.id.clone();
        let presence = PresenceTracker::new(identity.clone());

        let coordinator = RoomCoordinator {
            channel,
            transport,
            media,
            source,
            presence,
            record,
            command_rx,
            event_rx,
            state_tx,
            remote_tx,
            peer_tx,
            forwarders,
            remote_applied,
            torn_down: false,
        };
        tokio::spawn(coordinator.run());

        info!(room = %room, role = ?role, "session started");
        Ok(SessionHandle::new(
            room, identity, role, command_tx, state_rx, remote_rx, peer_rx,
        ))
    }

    /// Главный цикл сессии. Завершается вместе со звонком.
    async fn run(mut self) {
        info!(room = %self.channel.room(), "session loop started");

        loop {
            tokio::select! {
                // 1. Команды владельца хэндла.
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            // Хэндл уронили без leave: убираем за собой так же.
                            info!("session handle dropped, closing");
                            self.teardown(CloseReason::LocalLeave).await;
                            break;
                        }
                    }
                }

                // 2. События транспорта и стора из общей очереди.
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => {
                            if self.handle_event(event).await {
                                break;
                            }
                        }
                        None => {
                            // Недостижимо, пока живы форвардеры.
                            warn!("event queue closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        info!(room = %self.channel.room(), "session loop finished");
    }

    /// Обработка команды. true означает завершение цикла.
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Leave => {
                self.teardown(CloseReason::LocalLeave).await;
                true
            }

            SessionCommand::SwitchDevice {
                kind,
                device_id,
                done,
            } => {
                let result = switch_device(
                    &self.transport,
                    &mut self.media,
                    self.source.as_ref(),
                    kind,
                    device_id.as_deref(),
                )
                .await;
                let _ = done.send(result);
                false
            }

            SessionCommand::SetEnabled { kind, enabled } => {
                if !self.media.set_enabled(kind, enabled) {
                    warn!(?kind, "no local track of this kind to toggle");
                    return false;
                }
                // Профиль в сторе отражает фактическое состояние дорожек,
                // собеседник видит mute через запись участника.
                match kind {
                    MediaKind::Audio => self.record.profile.audio = enabled,
                    MediaKind::Video => self.record.profile.video = enabled,
                }
                if let Err(e) = self.channel.update_participant(self.record.clone()).await {
                    warn!("failed to publish profile update: {e}");
                }
                false
            }
        }
    }

    /// Обработка события из общей очереди. true означает завершение цикла.
    async fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Transport(TransportEvent::StateChanged(state)) => {
                self.on_transport_state(state).await
            }

            SessionEvent::Transport(TransportEvent::CandidateGenerated(candidate)) => {
                if let Err(e) = self.channel.send_candidate(candidate).await {
                    warn!("failed to publish local candidate: {e}");
                }
                false
            }

            SessionEvent::Transport(TransportEvent::TrackStarted(track)) => {
                self.remote_tx.send_modify(|remote| remote.attach(track));
                false
            }

            SessionEvent::RoomSnapshot(Some(document)) => self.on_room_snapshot(document).await,

            SessionEvent::RoomSnapshot(None) => {
                // Документ удален: комнату закрыли целиком.
                info!("room document deleted");
                self.teardown(CloseReason::RoomClosed).await;
                true
            }

            SessionEvent::RoomWatchEnded => {
                error!("room watch ended unexpectedly");
                self.teardown(CloseReason::SignalingLost).await;
                true
            }

            SessionEvent::ParticipantsSnapshot(participants) => {
                self.on_participants(participants).await
            }

            SessionEvent::ParticipantsWatchEnded | SessionEvent::CandidateWatchEnded => {
                // Вторичные подписки: решающим остается наблюдение за документом.
                debug!("auxiliary store watch ended");
                false
            }

            SessionEvent::RemoteCandidate(candidate) => {
                if let Err(e) = self.transport.add_remote_candidate(candidate).await {
                    warn!("failed to apply remote candidate: {e}");
                }
                false
            }
        }
    }

    async fn on_transport_state(&mut self, state: RTCPeerConnectionState) -> bool {
        let Some(mapped) = ConnectionState::from_peer_state(state) else {
            return false;
        };
        if mapped == ConnectionState::Failed {
            error!("transport failed");
            self.state_tx.send_replace(ConnectionState::Failed);
            self.teardown(CloseReason::TransportFailed).await;
            return true;
        }
        // Disconnected не терминально: ICE может восстановиться сам,
        // поэтому состояние лишь публикуется.
        self.state_tx.send_replace(mapped);
        false
    }

    async fn on_room_snapshot(&mut self, document: RoomDocument) -> bool {
        // 1. Флаг disconnect ставит уходящая сторона. Увидевший его
        //    завершает звонок и удаляет документ комнаты.
        if document.disconnect {
            info!("peer marked the room disconnected");
            self.teardown(CloseReason::PeerLeft).await;
            return true;
        }

        // 2. SDP встречной стороны применяется один раз, как только появился.
        if self.remote_applied {
            return false;
        }
        let Some(remote) = self.channel.remote_description(&document) else {
            return false;
        };
        self.remote_applied = true;
        if let Err(e) = self.complete_negotiation(remote).await {
            error!("negotiation failed: {e}");
            self.teardown(CloseReason::TransportFailed).await;
            return true;
        }
        false
    }

    /// Применяет удаленный SDP; отвечающая сторона сразу публикует Answer.
    async fn complete_negotiation(
        &mut self,
        remote: &SessionDescription,
    ) -> Result<(), SessionError> {
        self.transport.apply_remote_description(remote).await?;
        if self.channel.role() == PeerRole::Joiner {
            let answer = self.transport.create_answer().await?;
            self.channel.publish_description(answer).await?;
        }
        Ok(())
    }

    async fn on_participants(&mut self, participants: Vec<ParticipantRecord>) -> bool {
        for event in self.presence.observe(&participants) {
            match event {
                PresenceEvent::PeerJoined(record) => {
                    info!(peer = %record.id, "peer joined the room");
                    self.peer_tx.send_replace(Some(record));
                }
                PresenceEvent::PeerUpdated(record) => {
                    self.peer_tx.send_replace(Some(record));
                }
                PresenceEvent::PeerLeft(id) => {
                    info!(peer = %id, "peer left the room");
                    self.peer_tx.send_replace(None);
                    self.teardown(CloseReason::PeerLeft).await;
                    return true;
                }
            }
        }
        false
    }

    /// Завершение сессии: уборка в сторе, остановка медиа и транспорта,
    /// публикация терминального состояния. Повторный вызов безопасен.
    async fn teardown(&mut self, reason: CloseReason) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!(reason = ?reason, "tearing down session");

        // 1. Прощание со стором. При потере связи со стором писать некуда,
        //    при удаленном документе - нечего.
        match reason {
            CloseReason::LocalLeave | CloseReason::TransportFailed => {
                let others_hint = self.presence.peer().is_some();
                clean_room(&self.channel, &self.record, others_hint).await;
            }
            CloseReason::PeerLeft => {
                // Собеседник попрощался; оставшийся удаляет документ комнаты.
                if let Err(e) = self.channel.delete_room().await {
                    warn!("failed to delete room after peer left: {e}");
                }
            }
            CloseReason::RoomClosed | CloseReason::SignalingLost => {}
        }

        // 2. Медиа и транспорт.
        self.media.release();
        if let Err(e) = self.transport.close().await {
            warn!("failed to close transport: {e}");
        }

        // 3. Форвардеры: после терминального состояния событий не будет.
        for forwarder in &self.forwarders {
            forwarder.abort();
        }

        // 4. Терминальное состояние публикуется последним.
        self.state_tx.send_replace(ConnectionState::Closed(reason));
    }
}

/// Уборка собственных следов в сторе при выходе. Пока в комнате есть
/// кто-то еще, удаляется только своя запись и ставится флаг disconnect;
/// последний уходящий удаляет комнату целиком.
async fn clean_room(channel: &SignalingChannel, record: &ParticipantRecord, others_hint: bool) {
    let others = match channel.list_participants().await {
        Ok(participants) => participants.iter().any(|p| p.id != record.id),
        Err(e) => {
            warn!("participant list unavailable during cleanup: {e}");
            others_hint
        }
    };

    if others {
        if let Err(e) = channel.remove_participant(&record.id).await {
            warn!("failed to remove own participant record: {e}");
        }
        if let Err(e) = channel.mark_disconnected().await {
            warn!("failed to mark room disconnected: {e}");
        }
    } else if let Err(e) = channel.delete_room().await {
        warn!("failed to delete room: {e}");
    }
}

fn forward_transport(
    mut transport_rx: mpsc::Receiver<TransportEvent>,
    event_tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = transport_rx.recv().await {
            if event_tx.send(SessionEvent::Transport(event)).await.is_err() {
                break;
            }
        }
    })
}

fn forward_room(
    mut watch: Subscription<Option<RoomDocument>>,
    event_tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = watch.recv().await {
            if event_tx
                .send(SessionEvent::RoomSnapshot(snapshot))
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = event_tx.send(SessionEvent::RoomWatchEnded).await;
    })
}

fn forward_participants(
    mut watch: Subscription<Vec<ParticipantRecord>>,
    event_tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = watch.recv().await {
            if event_tx
                .send(SessionEvent::ParticipantsSnapshot(snapshot))
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = event_tx.send(SessionEvent::ParticipantsWatchEnded).await;
    })
}

fn forward_candidates(
    mut watch: Subscription<IceCandidate>,
    event_tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(candidate) = watch.recv().await {
            if event_tx
                .send(SessionEvent::RemoteCandidate(candidate))
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = event_tx.send(SessionEvent::CandidateWatchEnded).await;
    })
}
