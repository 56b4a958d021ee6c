use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::TransportEvent;
use std::sync::{Arc, Mutex};
use tandem_core::SessionError;
use tandem_core::model::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;
use tracing::{info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;

/// Кандидаты, пришедшие до удаленного SDP, копятся здесь и доливаются
/// после commit строго в порядке прихода.
struct NegotiationState {
    remote_committed: bool,
    pending: Vec<IceCandidate>,
}

/// Обертка над RTCPeerConnection для одной сессии.
/// События соединения уходят в общий канал координатора.
pub struct IceTransport {
    peer_connection: Arc<RTCPeerConnection>,
    negotiation: Mutex<NegotiationState>,
}

impl IceTransport {
    /// Инициализация нового WebRTC соединения.
    /// event_tx - канал, в который транспорт складывает события для цикла сессии.
    pub async fn new(
        config: TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, SessionError> {
        // 1. Настройка MediaEngine (кодеки по умолчанию: Opus, VP8/VP9, H264)
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;

        // 2. Регистрация интерцепторов (RTCP отчеты, NACK и прочее)
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        // 3. Создание API объекта
        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        // 4. Конфигурация ICE серверов
        let rtc_config = RTCConfiguration {
            ice_servers: config.ice_servers.iter().map(|s| s.to_rtc()).collect(),
            ..Default::default()
        };

        // 5. Создание PeerConnection
        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        // A. Мониторинг состояния соединения. Транспорт ничего не решает сам,
        // все состояния уходят наверх как есть.
        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("peer connection state changed: {s}");
                    let _ = tx.send(TransportEvent::StateChanged(s)).await;
                })
            },
        ));

        // B. Trickle ICE: каждый локальный кандидат сразу уходит на публикацию.
        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                // None означает конец сбора кандидатов.
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    warn!("failed to serialize local ICE candidate");
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(IceCandidate::from_rtc(
                        init,
                    )))
                    .await;
            })
        }));

        // C. Удаленные дорожки отдаем наверх, координатор разложит их по виду.
        let track_tx = event_tx.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            Box::pin(async move {
                info!("remote track started: kind={}, ssrc={}", track.kind(), track.ssrc());
                let _ = tx.send(TransportEvent::TrackStarted(track)).await;
            })
        }));

        Ok(Self {
            peer_connection,
            negotiation: Mutex::new(NegotiationState {
                remote_committed: false,
                pending: Vec::new(),
            }),
        })
    }

    /// Добавить локальную дорожку до начала переговоров.
    pub async fn add_local_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<Arc<RTCRtpSender>, SessionError> {
        Ok(self.peer_connection.add_track(track).await?)
    }

    /// Создать SDP Offer и установить его как LocalDescription.
    pub async fn create_offer(&self) -> Result<SessionDescription, SessionError> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    /// Создать SDP Answer и установить его как LocalDescription.
    /// Вызывается только после применения удаленного Offer.
    pub async fn create_answer(&self) -> Result<SessionDescription, SessionError> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    /// Применить удаленный SDP. Допускается ровно один раз за сессию; после
    /// применения буфер кандидатов доливается в порядке прихода.
    pub async fn apply_remote_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), SessionError> {
        if self.negotiation.lock().unwrap().remote_committed {
            return Err(SessionError::Negotiation(
                "remote description already committed".to_owned(),
            ));
        }
        let desc = description.to_rtc()?;
        self.peer_connection.set_remote_description(desc).await?;

        let buffered = {
            let mut guard = self.negotiation.lock().unwrap();
            guard.remote_committed = true;
            std::mem::take(&mut guard.pending)
        };
        for candidate in buffered {
            self.peer_connection
                .add_ice_candidate(candidate.to_rtc())
                .await?;
        }
        Ok(())
    }

    /// Добавить удаленного ICE-кандидата (Trickle ICE).
    /// До применения удаленного SDP кандидаты буферизуются.
    pub async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError> {
        {
            let mut guard = self.negotiation.lock().unwrap();
            if !guard.remote_committed {
                guard.pending.push(candidate);
                return Ok(());
            }
        }
        self.peer_connection
            .add_ice_candidate(candidate.to_rtc())
            .await?;
        Ok(())
    }

    /// RTP-отправитель, который сейчас везет дорожку данного вида.
    pub async fn sender_for_kind(&self, kind: RTPCodecType) -> Option<Arc<RTCRtpSender>> {
        for sender in self.peer_connection.get_senders().await {
            if let Some(track) = sender.track().await {
                if track.kind() == kind {
                    return Some(sender);
                }
            }
        }
        None
    }

    pub fn state(&self) -> RTCPeerConnectionState {
        self.peer_connection.connection_state()
    }

    /// Закрыть WebRTC соединение.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
