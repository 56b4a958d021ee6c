use crate::ws;
use axum::Router;
use axum::routing::get;
use std::io;
use tandem_session::MemoryStore;
use tokio::net::TcpListener;
use tracing::info;

/// Rendezvous-узел: встроенная база документов, отданная клиентам по
/// WebSocket. Комнатной логики здесь нет, узел остается просто стором;
/// все решения принимают сессии на клиентах.
#[derive(Clone, Default)]
pub struct RendezvousService {
    store: MemoryStore,
}

impl RendezvousService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Прямой доступ к стору. Сессии того же процесса могут работать с ним
    /// напрямую, минуя сокет.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/store", get(ws::store_handler))
            .with_state(self.clone())
    }

    /// Обслуживает клиентов на уже открытом листенере.
    /// Листенер открывает вызывающая сторона, так тесты получают
    /// эфемерный порт без гонок.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        info!("rendezvous node listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }
}
