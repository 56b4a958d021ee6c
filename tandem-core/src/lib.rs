pub mod error;
pub mod model;

pub use error::{SessionError, StoreError};
pub use model::{ParticipantId, RoomId};
