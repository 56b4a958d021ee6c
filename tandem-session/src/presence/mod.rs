mod tracker;

pub use tracker::{PresenceEvent, PresenceTracker};
