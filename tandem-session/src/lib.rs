pub mod media;
pub mod presence;
pub mod room;
pub mod signaling;
pub mod store;
pub mod transport;

pub use media::{DeviceInfo, LocalMedia, MediaKind, MediaSource, SyntheticSource};
pub use room::{RemoteMedia, RoomCoordinator, SessionConfig, SessionHandle};
pub use store::{MemoryStore, RemoteStore, SignalingStore, Subscription};
pub use transport::TransportConfig;
