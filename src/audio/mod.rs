pub mod device;
pub mod events;
pub mod hub;
pub mod playback;
pub mod watcher;

pub use device::{AudioDevice, DeviceType};
pub use events::{AudioEvent, EventKind, EventSink};
pub use hub::{EventHub, Subscription};
pub use playback::{PlaybackConfiguration, PlayerState};
pub use watcher::PlaybackWatcher;
