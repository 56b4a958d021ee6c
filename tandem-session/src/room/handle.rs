use crate::media::{DeviceInfo, MediaKind};
use crate::room::event::{RemoteMedia, SessionCommand};
use tandem_core::SessionError;
use tandem_core::model::{ConnectionState, ParticipantId, ParticipantRecord, PeerRole, RoomId};
use tokio::sync::{mpsc, oneshot, watch};

/// Хэндл живой сессии звонка.
///
/// Наблюдаемые стороны сессии (состояние соединения, удаленные дорожки,
/// собеседник) отдаются как watch-каналы: подписчик всегда видит последнее
/// значение и пропуски промежуточных ему не страшны.
///
/// Drop хэндла без leave() тоже завершает сессию: координатор заметит
/// закрытие командного канала и приберет за собой в сторе.
pub struct SessionHandle {
    room: RoomId,
    identity: ParticipantId,
    role: PeerRole,
    command_tx: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    remote_rx: watch::Receiver<RemoteMedia>,
    peer_rx: watch::Receiver<Option<ParticipantRecord>>,
}

impl SessionHandle {
    pub(crate) fn new(
        room: RoomId,
        identity: ParticipantId,
        role: PeerRole,
        command_tx: mpsc::Sender<SessionCommand>,
        state_rx: watch::Receiver<ConnectionState>,
        remote_rx: watch::Receiver<RemoteMedia>,
        peer_rx: watch::Receiver<Option<ParticipantRecord>>,
    ) -> Self {
        Self {
            room,
            identity,
            role,
            command_tx,
            state_rx,
            remote_rx,
            peer_rx,
        }
    }

    /// Код комнаты. Создатель передает его второй стороне вне системы.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn identity(&self) -> &ParticipantId {
        &self.identity
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Состояние звонка. Терминальное значение - Closed с причиной.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Дорожки собеседника по мере их появления.
    pub fn remote_media(&self) -> watch::Receiver<RemoteMedia> {
        self.remote_rx.clone()
    }

    /// Запись собеседника: None, пока второй стороны нет.
    pub fn peer(&self) -> watch::Receiver<Option<ParticipantRecord>> {
        self.peer_rx.clone()
    }

    /// Аккуратный выход: прощание со стором и ожидание терминального
    /// состояния сессии.
    pub async fn leave(self) {
        let _ = self.command_tx.send(SessionCommand::Leave).await;
        let mut state = self.state_rx.clone();
        loop {
            let terminal = state.borrow().is_terminal();
            if terminal {
                break;
            }
            if state.changed().await.is_err() {
                break;
            }
        }
    }

    /// Смена устройства захвата без пере-негоциации. None выбирает
    /// устройство по умолчанию.
    pub async fn switch_device(
        &self,
        kind: MediaKind,
        device_id: Option<&str>,
    ) -> Result<DeviceInfo, SessionError> {
        let (done, result) = oneshot::channel();
        self.command_tx
            .send(SessionCommand::SwitchDevice {
                kind,
                device_id: device_id.map(str::to_owned),
                done,
            })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        result.await.map_err(|_| SessionError::SessionClosed)?
    }

    /// Mute или unmute локальной дорожки. Изменение видно собеседнику
    /// через его запись участника.
    pub async fn set_enabled(&self, kind: MediaKind, enabled: bool) -> Result<(), SessionError> {
        self.command_tx
            .send(SessionCommand::SetEnabled { kind, enabled })
            .await
            .map_err(|_| SessionError::SessionClosed)
    }
}
