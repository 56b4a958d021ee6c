mod connection;
mod peer;
mod protocol;
mod room;
mod signaling;

pub use connection::{CloseReason, ConnectionState};
pub use peer::{ParticipantId, ParticipantProfile, ParticipantRecord, PeerRole};
pub use protocol::{
    Admission, CandidateLane, RequestId, StoreEvent, StoreReply, StoreRequest, WatchId,
};
pub use room::{RoomDocument, RoomId};
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
