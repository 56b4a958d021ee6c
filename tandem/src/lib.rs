pub use tandem_core::model::{ParticipantId, RoomId};
pub use tandem_core::{SessionError, StoreError};
pub use tandem_session::{
    DeviceInfo, LocalMedia, MediaKind, MediaSource, MemoryStore, RemoteMedia, RemoteStore,
    RoomCoordinator, SessionConfig, SessionHandle, SignalingStore, Subscription, SyntheticSource,
    TransportConfig,
};

pub mod model {
    pub use tandem_core::model::*;
}

#[cfg(feature = "rendezvous")]
pub mod rendezvous {
    pub use tandem_rendezvous::*;
}
