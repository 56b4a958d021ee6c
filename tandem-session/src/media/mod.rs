mod local;
mod source;
mod switcher;
mod synthetic;

pub use local::LocalMedia;
pub use source::{CapturedTrack, DeviceInfo, MediaKind, MediaSource};
pub use switcher::switch_device;
pub use synthetic::SyntheticSource;
