use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::audio::{AudioEvent, EventSink, PlaybackWatcher, watcher};
use crate::config::Config;
use crate::system::{AudioSystemInterface, EffectEngine, EffectEngineFactory, PreferenceStore};

use super::composite::{CompositeParam, DialogueEnhancer, VolumeLeveler};
use super::params::DsParam;
use super::profiles::ProfileTable;

pub const EFFECT_PRIORITY: i32 = 100;
pub const AUDIO_SESSION: i32 = 0;
pub const PREF_PROFILE: &str = "dolby_profile";
/// "Dynamic"
pub const DEFAULT_PROFILE: &str = "0";

/// Construction-time settings for [`ProfileController`]
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub priority: i32,
    pub audio_session: i32,
    pub profile_key: String,
    pub default_profile: String,
    pub profiles: ProfileTable,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            priority: EFFECT_PRIORITY,
            audio_session: AUDIO_SESSION,
            profile_key: PREF_PROFILE.to_string(),
            default_profile: DEFAULT_PROFILE.to_string(),
            profiles: ProfileTable::default(),
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            priority: config.engine.priority,
            audio_session: config.engine.audio_session,
            profile_key: config.preferences.profile_key.clone(),
            default_profile: config.preferences.default_profile.clone(),
            profiles: ProfileTable::new(config.profiles.clone()),
        }
    }
}

/// Owns the effect handle and keeps the selected profile applied across
/// playback starts and output device changes.
pub struct ProfileController<F, A, P>
where
    F: EffectEngineFactory,
    A: AudioSystemInterface,
    P: PreferenceStore,
{
    factory: F,
    engine: F::Engine,
    audio_system: A,
    preferences: P,
    settings: ControllerSettings,
    watcher: PlaybackWatcher,
}

impl<F, A, P> ProfileController<F, A, P>
where
    F: EffectEngineFactory,
    A: AudioSystemInterface,
    P: PreferenceStore,
{
    pub fn new(
        factory: F,
        audio_system: A,
        preferences: P,
        settings: ControllerSettings,
        events: EventSink,
    ) -> Result<Self> {
        let engine = factory
            .create(settings.priority, settings.audio_session)
            .context("Failed to create effect")?;
        debug!("initialized");

        Ok(Self::assemble(
            factory,
            engine,
            audio_system,
            preferences,
            settings,
            events,
        ))
    }

    /// Open the effect without claiming it. Reads work straight away; the
    /// first write goes through the control check and claims the effect.
    pub fn attach(
        factory: F,
        audio_system: A,
        preferences: P,
        settings: ControllerSettings,
        events: EventSink,
    ) -> Result<Self> {
        let engine = factory
            .attach(settings.priority, settings.audio_session)
            .context("Failed to attach to effect")?;
        debug!("attached");

        Ok(Self::assemble(
            factory,
            engine,
            audio_system,
            preferences,
            settings,
            events,
        ))
    }

    fn assemble(
        factory: F,
        engine: F::Engine,
        audio_system: A,
        preferences: P,
        settings: ControllerSettings,
        events: EventSink,
    ) -> Self {
        Self {
            factory,
            engine,
            audio_system,
            preferences,
            settings,
            watcher: PlaybackWatcher::new(events),
        }
    }

    /// Restore state after the system has finished booting
    pub fn on_boot_completed(&mut self) -> Result<()> {
        debug!("onBootCompleted");

        // Restore current profile now and on certain audio changes
        let ds_on = self.ds_on()?;
        self.engine.set_enabled(ds_on)?;
        self.register_callbacks(ds_on)?;
        if ds_on {
            self.apply_current_profile()?;
        }

        // The speaker virtualizer reads as on after boot but the DSP chain
        // is not actually running it until the flag is toggled
        let is_on_speaker = self
            .audio_system
            .media_output_device()?
            .is_some_and(|device| device.is_builtin_speaker());
        let spk_virt_enabled = self.speaker_virtualizer_enabled()?;
        debug!(
            "is_on_speaker={} spk_virt_enabled={}",
            is_on_speaker, spk_virt_enabled
        );
        if is_on_speaker && spk_virt_enabled {
            self.set_speaker_virtualizer_enabled(false)?;
            self.set_speaker_virtualizer_enabled(true)?;
            info!("Re-enabled speaker virtualizer");
        }

        Ok(())
    }

    /// Replace the effect handle if another client has taken control of it
    fn check_effect(&mut self) -> Result<()> {
        if !self.engine.has_control()? {
            warn!("Lost control, recreating effect");
            if let Err(e) = self.engine.release() {
                warn!("Failed to release effect: {}", e);
            }
            self.engine = self
                .factory
                .create(self.settings.priority, self.settings.audio_session)
                .context("Failed to recreate effect")?;
        }
        Ok(())
    }

    /// Re-apply the persisted profile, unless enhancement is switched off
    pub fn apply_current_profile(&mut self) -> Result<()> {
        if !self.ds_on()? {
            debug!("apply_current_profile: skip, dolby is off");
            return Ok(());
        }

        let key = &self.settings.profile_key;
        let value = self
            .preferences
            .get_string(key)?
            .unwrap_or_else(|| self.settings.default_profile.clone());
        let profile: i32 = value
            .parse()
            .with_context(|| format!("Invalid profile preference {key}={value:?}"))?;

        self.set_profile(profile)
    }

    /// React to a playback or device notification
    pub fn handle_event(&mut self, event: AudioEvent) -> Result<()> {
        if watcher::should_reapply(&event) {
            self.apply_current_profile()?;
        }
        Ok(())
    }

    /// Match the callback registration to the engine's ds-on flag, then
    /// re-apply the profile. Another client may have switched enhancement
    /// since this controller last did.
    pub fn sync_with_engine(&mut self) -> Result<()> {
        let ds_on = self.ds_on()?;
        debug!("sync_with_engine: ds_on={}", ds_on);
        self.register_callbacks(ds_on)?;
        self.apply_current_profile()
    }

    fn register_callbacks(&mut self, register: bool) -> Result<()> {
        self.watcher.set_registered(&self.audio_system, register)
    }

    pub fn is_callbacks_registered(&self) -> bool {
        self.watcher.is_registered()
    }

    pub fn set_ds_on(&mut self, on: bool) -> Result<()> {
        self.check_effect()?;
        debug!("set_ds_on: {}", on);
        self.engine.set_ds_on(on)?;
        self.register_callbacks(on)?;
        if on {
            self.apply_current_profile()?;
        }
        Ok(())
    }

    pub fn ds_on(&self) -> Result<bool> {
        let on = self.engine.ds_on()?;
        debug!("ds_on: {}", on);
        Ok(on)
    }

    pub fn set_profile(&mut self, index: i32) -> Result<()> {
        self.check_effect()?;
        debug!("set_profile: {}", index);
        self.engine.set_profile(index)
    }

    pub fn profile(&self) -> Result<i32> {
        let profile = self.engine.profile()?;
        debug!("profile: {}", profile);
        Ok(profile)
    }

    /// Display name of the active profile; `None` if it is not in the table
    pub fn profile_name(&self) -> Result<Option<String>> {
        let profile = self.engine.profile()?;
        let index = self.settings.profiles.position_of(profile);
        debug!("profile_name: profile={} index={:?}", profile, index);
        Ok(self.settings.profiles.name_of(profile).map(str::to_string))
    }

    pub fn reset_profile_specific_settings(&mut self) -> Result<()> {
        self.check_effect()?;
        debug!("reset_profile_specific_settings");
        self.engine.reset_profile_specific_settings()
    }

    pub fn set_headphone_virtualizer_enabled(&mut self, enable: bool) -> Result<()> {
        self.check_effect()?;
        debug!("set_headphone_virtualizer_enabled: {}", enable);
        self.engine.set_param_bool(DsParam::HeadphoneVirtualizer, enable)
    }

    pub fn headphone_virtualizer_enabled(&self) -> Result<bool> {
        let enabled = self.engine.get_param_bool(DsParam::HeadphoneVirtualizer)?;
        debug!("headphone_virtualizer_enabled: {}", enabled);
        Ok(enabled)
    }

    pub fn set_speaker_virtualizer_enabled(&mut self, enable: bool) -> Result<()> {
        self.check_effect()?;
        debug!("set_speaker_virtualizer_enabled: {}", enable);
        self.engine.set_param_bool(DsParam::SpeakerVirtualizer, enable)
    }

    pub fn speaker_virtualizer_enabled(&self) -> Result<bool> {
        let enabled = self.engine.get_param_bool(DsParam::SpeakerVirtualizer)?;
        debug!("speaker_virtualizer_enabled: {}", enabled);
        Ok(enabled)
    }

    pub fn set_stereo_widening_amount(&mut self, amount: i32) -> Result<()> {
        self.check_effect()?;
        debug!("set_stereo_widening_amount: {}", amount);
        self.engine.set_param_int(DsParam::StereoWideningAmount, amount)
    }

    pub fn stereo_widening_amount(&self) -> Result<i32> {
        let amount = self.engine.get_param_int(DsParam::StereoWideningAmount)?;
        debug!("stereo_widening_amount: {}", amount);
        Ok(amount)
    }

    pub fn set_dialogue_enhancer_amount(&mut self, amount: i32) -> Result<()> {
        self.check_effect()?;
        debug!("set_dialogue_enhancer_amount: {}", amount);
        self.write_composite::<DialogueEnhancer>(amount)
    }

    pub fn dialogue_enhancer_amount(&self) -> Result<i32> {
        let amount = self.read_composite::<DialogueEnhancer>()?;
        debug!("dialogue_enhancer_amount: {}", amount);
        Ok(amount)
    }

    pub fn set_bass_enhancer_enabled(&mut self, enable: bool) -> Result<()> {
        self.check_effect()?;
        debug!("set_bass_enhancer_enabled: {}", enable);
        self.engine.set_param_bool(DsParam::BassEnhancerEnable, enable)
    }

    pub fn bass_enhancer_enabled(&self) -> Result<bool> {
        let enabled = self.engine.get_param_bool(DsParam::BassEnhancerEnable)?;
        debug!("bass_enhancer_enabled: {}", enabled);
        Ok(enabled)
    }

    pub fn set_volume_leveler_enabled(&mut self, enable: bool) -> Result<()> {
        self.check_effect()?;
        debug!("set_volume_leveler_enabled: {}", enable);
        self.write_composite::<VolumeLeveler>(enable)
    }

    pub fn volume_leveler_enabled(&self) -> Result<bool> {
        let enabled = self.read_composite::<VolumeLeveler>()?;
        debug!("volume_leveler_enabled: {}", enabled);
        Ok(enabled)
    }

    fn write_composite<C: CompositeParam>(&mut self, value: C::Value) -> Result<()> {
        let (enable, amount) = C::encode(value);
        self.engine.set_param_bool(C::ENABLE, enable)?;
        self.engine.set_param_int(C::AMOUNT, amount)
    }

    fn read_composite<C: CompositeParam>(&self) -> Result<C::Value> {
        let enabled = self.engine.get_param_bool(C::ENABLE)?;
        let amount = self.engine.get_param_int(C::AMOUNT)?;
        debug!("{}={} {}={}", C::ENABLE, enabled, C::AMOUNT, amount);
        Ok(C::decode(enabled, amount))
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.settings.profiles
    }

    pub fn preferences(&self) -> &P {
        &self.preferences
    }

    /// Mutable access for the settings front end, which owns the preference schema
    pub fn preferences_mut(&mut self) -> &mut P {
        &mut self.preferences
    }
}
