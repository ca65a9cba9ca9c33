use tokio::sync::mpsc;

use super::device::AudioDevice;
use super::playback::PlaybackConfiguration;

/// Notifications emitted by the host audio stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    PlaybackConfigChanged(Vec<PlaybackConfiguration>),
    DevicesAdded(Vec<AudioDevice>),
    DevicesRemoved(Vec<AudioDevice>),
}

/// The two notification streams a subscriber can attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Playback,
    DeviceTopology,
}

/// Where a subscription delivers its events; each event is sent by value
pub type EventSink = mpsc::UnboundedSender<AudioEvent>;

impl AudioEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AudioEvent::PlaybackConfigChanged(_) => EventKind::Playback,
            AudioEvent::DevicesAdded(_) | AudioEvent::DevicesRemoved(_) => {
                EventKind::DeviceTopology
            }
        }
    }
}
