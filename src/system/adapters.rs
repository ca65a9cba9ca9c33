use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::audio::{
    AudioDevice, AudioEvent, DeviceType, EventHub, EventKind, EventSink, PlaybackConfiguration,
    PlayerState, Subscription,
};
use crate::effect::{DsParam, ParamKind, ParamValue};
use crate::system::traits::{
    AudioSystemInterface, EffectEngine, EffectEngineFactory, FileSystemInterface, PreferenceStore,
};

/// Production implementation of FileSystemInterface using std::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFileSystem;

impl FileSystemInterface for StandardFileSystem {
    fn read_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write file: {}", path.display()))
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))
    }
}

fn read_toml<F, T>(file_system: &F, path: &Path) -> Result<T>
where
    F: FileSystemInterface,
    T: Default + for<'de> Deserialize<'de>,
{
    if !file_system.file_exists(path) {
        return Ok(T::default());
    }
    let content = file_system.read_file(path)?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_toml<F, T>(file_system: &F, path: &Path, value: &T) -> Result<()>
where
    F: FileSystemInterface,
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        file_system.create_dir(parent)?;
    }
    let content = toml::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    file_system.write_file(path, &content)
}

/// Preference store persisted as a flat TOML table of strings
pub struct FilePreferenceStore<F: FileSystemInterface> {
    file_system: F,
    path: PathBuf,
}

impl<F: FileSystemInterface> FilePreferenceStore<F> {
    pub fn new(file_system: F, path: PathBuf) -> Self {
        Self { file_system, path }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        read_toml(&self.file_system, &self.path)
    }
}

impl<F: FileSystemInterface + Send> PreferenceStore for FilePreferenceStore<F> {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        let mut prefs = self.load()?;
        prefs.insert(key.to_string(), value.to_string());
        write_toml(&self.file_system, &self.path, &prefs)?;
        debug!("Stored preference {}={}", key, value);
        Ok(())
    }
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// On-disk state of the software effect engine
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct EngineState {
    owner: Option<String>,
    owner_priority: i32,
    enabled: bool,
    ds_on: bool,
    profile: i32,
    /// Parameter values keyed by profile, then by parameter name
    params: BTreeMap<String, BTreeMap<String, i32>>,
}

/// Software stand-in for the Dolby effect that keeps its state in a TOML
/// file. Several processes may open it; the most recent claim with an equal
/// or higher priority owns it and the others lose control.
pub struct StateFileEngine<F: FileSystemInterface> {
    file_system: F,
    path: PathBuf,
    token: String,
}

impl<F: FileSystemInterface> StateFileEngine<F> {
    fn load(&self) -> Result<EngineState> {
        read_toml(&self.file_system, &self.path)
    }

    fn store(&self, state: &EngineState) -> Result<()> {
        write_toml(&self.file_system, &self.path, state)
    }

    /// Apply a mutation, failing if another handle has taken control
    fn modify(&self, apply: impl FnOnce(&mut EngineState)) -> Result<()> {
        let mut state = self.load()?;
        if state.owner.as_deref() != Some(self.token.as_str()) {
            bail!("Effect handle {} is not in control", self.token);
        }
        apply(&mut state);
        self.store(&state)
    }
}

impl<F: FileSystemInterface + Send> EffectEngine for StateFileEngine<F> {
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.modify(|state| state.enabled = enabled)
    }

    fn has_control(&self) -> Result<bool> {
        Ok(self.load()?.owner.as_deref() == Some(self.token.as_str()))
    }

    fn release(&mut self) -> Result<()> {
        let mut state = self.load()?;
        if state.owner.as_deref() == Some(self.token.as_str()) {
            state.owner = None;
            state.owner_priority = 0;
            self.store(&state)?;
        }
        debug!("Released effect handle {}", self.token);
        Ok(())
    }

    fn set_ds_on(&mut self, on: bool) -> Result<()> {
        self.modify(|state| {
            state.ds_on = on;
            state.enabled = on;
        })
    }

    fn ds_on(&self) -> Result<bool> {
        Ok(self.load()?.ds_on)
    }

    fn set_profile(&mut self, profile: i32) -> Result<()> {
        self.modify(|state| state.profile = profile)
    }

    fn profile(&self) -> Result<i32> {
        Ok(self.load()?.profile)
    }

    fn reset_profile_specific_settings(&mut self) -> Result<()> {
        self.modify(|state| {
            let profile = state.profile.to_string();
            state.params.remove(&profile);
        })
    }

    fn get_param(&self, param: DsParam) -> Result<ParamValue> {
        let state = self.load()?;
        let raw = state
            .params
            .get(&state.profile.to_string())
            .and_then(|values| values.get(param.name()))
            .copied();

        Ok(match (param.kind(), raw) {
            (kind, None) => ParamValue::zero(kind),
            (ParamKind::Bool, Some(n)) => ParamValue::Bool(n != 0),
            (ParamKind::Int, Some(n)) => ParamValue::Int(n),
        })
    }

    fn set_param(&mut self, param: DsParam, value: ParamValue) -> Result<()> {
        if value.kind() != param.kind() {
            bail!("{} expects a {:?} value, got {}", param, param.kind(), value);
        }
        self.modify(|state| {
            state
                .params
                .entry(state.profile.to_string())
                .or_default()
                .insert(param.name().to_string(), value.as_int());
        })
    }
}

/// Opens [`StateFileEngine`] handles on one state file
#[derive(Clone)]
pub struct StateFileEngineFactory<F: FileSystemInterface + Clone> {
    file_system: F,
    path: PathBuf,
}

impl<F: FileSystemInterface + Clone> StateFileEngineFactory<F> {
    pub fn new(file_system: F, path: PathBuf) -> Self {
        Self { file_system, path }
    }
}

impl StateFileEngineFactory<StandardFileSystem> {
    pub fn new_production(path: PathBuf) -> Self {
        Self::new(StandardFileSystem, path)
    }
}

impl<F: FileSystemInterface + Clone> StateFileEngineFactory<F> {
    fn new_handle(&self) -> StateFileEngine<F> {
        let token = format!(
            "{}:{}",
            std::process::id(),
            NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
        );
        StateFileEngine {
            file_system: self.file_system.clone(),
            path: self.path.clone(),
            token,
        }
    }
}

impl<F: FileSystemInterface + Clone + Send> EffectEngineFactory for StateFileEngineFactory<F> {
    type Engine = StateFileEngine<F>;

    fn create(&self, priority: i32, audio_session: i32) -> Result<Self::Engine> {
        let engine = self.new_handle();

        let mut state = engine.load()?;
        if state.owner.is_none() || priority >= state.owner_priority {
            state.owner = Some(engine.token.clone());
            state.owner_priority = priority;
            engine.store(&state)?;
            info!(
                "Opened effect handle {} (priority {}, session {})",
                engine.token, priority, audio_session
            );
        } else {
            warn!(
                "Effect is held at priority {}, handle {} starts without control",
                state.owner_priority, engine.token
            );
        }

        Ok(engine)
    }

    fn attach(&self, _priority: i32, audio_session: i32) -> Result<Self::Engine> {
        let engine = self.new_handle();
        debug!(
            "Attached effect handle {} (session {}) without claiming control",
            engine.token, audio_session
        );
        Ok(engine)
    }
}

/// Audio system whose media route comes from configuration and whose
/// notifications are published explicitly (e.g. from signal handlers)
#[derive(Clone)]
pub struct SimulatedAudioSystem {
    hub: EventHub,
    media_output: AudioDevice,
}

impl SimulatedAudioSystem {
    pub fn new(media_output: DeviceType) -> Self {
        Self {
            hub: EventHub::new(),
            media_output: AudioDevice::new(1, media_output.to_string(), media_output),
        }
    }

    pub fn publish_playback_started(&self) -> usize {
        self.hub
            .publish(AudioEvent::PlaybackConfigChanged(vec![
                PlaybackConfiguration::new(1, PlayerState::Started),
            ]))
    }

    pub fn publish_devices_changed(&self) -> usize {
        self.hub
            .publish(AudioEvent::DevicesAdded(vec![self.media_output.clone()]))
    }
}

impl AudioSystemInterface for SimulatedAudioSystem {
    fn media_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(Some(self.media_output.clone()))
    }

    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Result<Subscription> {
        Ok(self.hub.subscribe(kind, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn factory(dir: &TempDir) -> StateFileEngineFactory<StandardFileSystem> {
        StateFileEngineFactory::new_production(dir.path().join("state/engine.toml"))
    }

    #[test]
    fn test_preferences_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut prefs =
            FilePreferenceStore::new(StandardFileSystem, dir.path().join("prefs.toml"));

        assert_eq!(prefs.get_string("dolby_profile").unwrap(), None);
        prefs.set_string("dolby_profile", "2").unwrap();
        assert_eq!(
            prefs.get_string("dolby_profile").unwrap(),
            Some("2".to_string())
        );
    }

    #[test]
    fn test_engine_persists_per_profile_params() {
        let dir = TempDir::new().unwrap();
        let mut engine = factory(&dir).create(100, 0).unwrap();

        engine.set_profile(1).unwrap();
        engine.set_param_int(DsParam::StereoWideningAmount, 40).unwrap();
        engine.set_param_bool(DsParam::BassEnhancerEnable, true).unwrap();
        assert_eq!(engine.get_param_int(DsParam::StereoWideningAmount).unwrap(), 40);
        assert!(engine.get_param_bool(DsParam::BassEnhancerEnable).unwrap());

        engine.set_profile(2).unwrap();
        assert_eq!(engine.get_param_int(DsParam::StereoWideningAmount).unwrap(), 0);

        engine.set_profile(1).unwrap();
        engine.reset_profile_specific_settings().unwrap();
        assert_eq!(engine.get_param_int(DsParam::StereoWideningAmount).unwrap(), 0);
    }

    #[test]
    fn test_engine_rejects_mismatched_value_kind() {
        let dir = TempDir::new().unwrap();
        let mut engine = factory(&dir).create(100, 0).unwrap();

        assert!(
            engine
                .set_param(DsParam::HeadphoneVirtualizer, ParamValue::Int(1))
                .is_err()
        );
    }

    #[test]
    fn test_newer_claim_takes_control() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);

        let mut first = factory.create(100, 0).unwrap();
        assert!(first.has_control().unwrap());

        let second = factory.create(100, 0).unwrap();
        assert!(second.has_control().unwrap());
        assert!(!first.has_control().unwrap());
        assert!(first.set_ds_on(true).is_err());

        // Releasing a handle that lost control leaves the owner untouched
        first.release().unwrap();
        assert!(second.has_control().unwrap());
    }

    #[test]
    fn test_lower_priority_does_not_take_control() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);

        let owner = factory.create(100, 0).unwrap();
        let weaker = factory.create(10, 0).unwrap();

        assert!(owner.has_control().unwrap());
        assert!(!weaker.has_control().unwrap());
    }

    #[test]
    fn test_attach_reads_without_claiming() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);

        let mut owner = factory.create(100, 0).unwrap();
        owner.set_profile(2).unwrap();

        let mut reader = factory.attach(100, 0).unwrap();
        assert!(owner.has_control().unwrap());
        assert!(!reader.has_control().unwrap());
        assert_eq!(reader.profile().unwrap(), 2);
        assert!(reader.set_profile(1).is_err());
    }

    #[test]
    fn test_simulated_audio_system_publishes_to_subscribers() {
        let audio = SimulatedAudioSystem::new(DeviceType::BuiltinSpeaker);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _subscription = audio.subscribe(EventKind::Playback, tx).unwrap();

        assert_eq!(audio.publish_playback_started(), 1);
        assert_eq!(audio.publish_devices_changed(), 0);
        assert!(matches!(
            rx.try_recv().unwrap(),
            AudioEvent::PlaybackConfigChanged(_)
        ));
        assert!(
            audio
                .media_output_device()
                .unwrap()
                .unwrap()
                .is_builtin_speaker()
        );
    }
}
