//! Test utility builders for controllers wired to mock collaborators
//!
//! Individual methods may not be used by all tests, so dead code warnings are suppressed.

#![allow(dead_code)]

use dolby_control::audio::{
    AudioDevice, AudioEvent, DeviceType, EventKind, PlaybackConfiguration, PlayerState,
};
use dolby_control::effect::{ControllerSettings, ProfileEntry, ProfileTable};
use dolby_control::service::{EventReceiver, event_channel};
use dolby_control::{
    MockAudioSystem, MockEffectFactory, MockPreferenceStore, ProfileController,
};

pub type MockController = ProfileController<MockEffectFactory, MockAudioSystem, MockPreferenceStore>;

/// Builder for a [`ProfileController`] backed by mocks
pub struct ControllerBuilder {
    media_output: Option<AudioDevice>,
    stored_profile: Option<String>,
    ds_on: bool,
    speaker_virtualizer: bool,
    profiles: Option<Vec<ProfileEntry>>,
    priority: Option<i32>,
    attach: bool,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self {
            media_output: Some(AudioDeviceBuilder::new().build()),
            stored_profile: None,
            ds_on: false,
            speaker_virtualizer: false,
            profiles: None,
            priority: None,
            attach: false,
        }
    }

    pub fn media_output(mut self, device: Option<AudioDevice>) -> Self {
        self.media_output = device;
        self
    }

    pub fn stored_profile(mut self, value: &str) -> Self {
        self.stored_profile = Some(value.to_string());
        self
    }

    /// Engine reports enhancement as on before the controller touches it
    pub fn ds_on(mut self) -> Self {
        self.ds_on = true;
        self
    }

    /// Engine reports the speaker virtualizer as on
    pub fn speaker_virtualizer_on(mut self) -> Self {
        self.speaker_virtualizer = true;
        self
    }

    pub fn profiles(mut self, profiles: Vec<ProfileEntry>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Open the effect without claiming control
    pub fn attached(mut self) -> Self {
        self.attach = true;
        self
    }

    pub fn build(self) -> ControllerFixture {
        let factory = MockEffectFactory::new();
        factory.force_ds_on(self.ds_on);
        if self.speaker_virtualizer {
            factory.force_param(
                dolby_control::effect::DsParam::SpeakerVirtualizer,
                true.into(),
            );
        }

        let audio_system = MockAudioSystem::new();
        audio_system.set_media_output(self.media_output);

        let preferences = MockPreferenceStore::new();
        if let Some(value) = &self.stored_profile {
            preferences.put("dolby_profile", value);
        }

        let mut settings = ControllerSettings::default();
        if let Some(profiles) = self.profiles {
            settings.profiles = ProfileTable::new(profiles);
        }
        if let Some(priority) = self.priority {
            settings.priority = priority;
        }

        let (sink, events) = event_channel();
        let controller = if self.attach {
            ProfileController::attach(
                factory.clone(),
                audio_system.clone(),
                preferences.clone(),
                settings,
                sink,
            )
        } else {
            ProfileController::new(
                factory.clone(),
                audio_system.clone(),
                preferences.clone(),
                settings,
                sink,
            )
        }
        .expect("Failed to build controller");

        ControllerFixture {
            controller,
            factory,
            audio_system,
            preferences,
            events,
        }
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller plus handles onto every mock it was built with
pub struct ControllerFixture {
    pub controller: MockController,
    pub factory: MockEffectFactory,
    pub audio_system: MockAudioSystem,
    pub preferences: MockPreferenceStore,
    pub events: EventReceiver,
}

impl ControllerFixture {
    /// Feed every queued notification to the controller, as the service loop would
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.controller
                .handle_event(event)
                .expect("Failed to handle event");
            handled += 1;
        }
        handled
    }

    pub fn playback_subscribers(&self) -> usize {
        self.audio_system.subscriber_count(EventKind::Playback)
    }

    pub fn device_subscribers(&self) -> usize {
        self.audio_system.subscriber_count(EventKind::DeviceTopology)
    }
}

/// Builder for creating test AudioDevice instances
pub struct AudioDeviceBuilder {
    id: u32,
    name: String,
    device_type: DeviceType,
}

impl AudioDeviceBuilder {
    pub fn new() -> Self {
        Self {
            id: 2,
            name: "Speaker".to_string(),
            device_type: DeviceType::BuiltinSpeaker,
        }
    }

    pub fn id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn headphones(mut self) -> Self {
        self.device_type = DeviceType::WiredHeadphones;
        self.name = "Headphones".to_string();
        self
    }

    pub fn bluetooth(mut self) -> Self {
        self.device_type = DeviceType::BluetoothA2dp;
        self.name = "Bluetooth".to_string();
        self
    }

    pub fn build(self) -> AudioDevice {
        AudioDevice::new(self.id, self.name, self.device_type)
    }
}

impl Default for AudioDeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn playback_event(states: &[PlayerState]) -> AudioEvent {
    AudioEvent::PlaybackConfigChanged(
        states
            .iter()
            .enumerate()
            .map(|(i, state)| PlaybackConfiguration::new(i as u32 + 1, *state))
            .collect(),
    )
}

pub fn device_added_event(device: AudioDevice) -> AudioEvent {
    AudioEvent::DevicesAdded(vec![device])
}

pub fn device_removed_event(device: AudioDevice) -> AudioEvent {
    AudioEvent::DevicesRemoved(vec![device])
}
