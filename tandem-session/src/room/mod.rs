mod config;
mod coordinator;
mod event;
mod handle;

pub use config::SessionConfig;
pub use coordinator::RoomCoordinator;
pub use event::RemoteMedia;
pub use handle::SessionHandle;
