use anyhow::Result;
use tracing::debug;

use crate::system::AudioSystemInterface;

use super::events::{AudioEvent, EventKind, EventSink};
use super::hub::Subscription;
use super::playback::any_started;

struct Registration {
    playback: Subscription,
    devices: Subscription,
}

/// Keeps the playback and device-topology subscriptions in step with the
/// global enhancement switch.
pub struct PlaybackWatcher {
    sink: EventSink,
    registration: Option<Registration>,
}

impl PlaybackWatcher {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            registration: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Subscribe or unsubscribe both streams together. Calls that would not
    /// change the current registration state do nothing.
    pub fn set_registered<A: AudioSystemInterface>(
        &mut self,
        audio_system: &A,
        register: bool,
    ) -> Result<()> {
        debug!(
            "set_registered({}) registered={}",
            register,
            self.is_registered()
        );

        match (register, self.registration.is_some()) {
            (true, false) => {
                let playback = audio_system.subscribe(EventKind::Playback, self.sink.clone())?;
                let devices =
                    audio_system.subscribe(EventKind::DeviceTopology, self.sink.clone())?;
                self.registration = Some(Registration { playback, devices });
            }
            (false, true) => {
                if let Some(registration) = self.registration.take() {
                    registration.playback.cancel();
                    registration.devices.cancel();
                }
            }
            _ => {}
        }

        Ok(())
    }
}

/// Whether an event should cause the current profile to be re-applied.
///
/// Playback changes only count when some session has started; any device
/// addition or removal counts regardless of device type.
pub fn should_reapply(event: &AudioEvent) -> bool {
    match event {
        AudioEvent::PlaybackConfigChanged(configs) => {
            let is_playing = any_started(configs);
            debug!("onPlaybackConfigChanged is_playing={}", is_playing);
            is_playing
        }
        AudioEvent::DevicesAdded(devices) => {
            debug!("onAudioDevicesAdded count={}", devices.len());
            true
        }
        AudioEvent::DevicesRemoved(devices) => {
            debug!("onAudioDevicesRemoved count={}", devices.len());
            true
        }
    }
}
