use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::{AudioDevice, AudioEvent, EventHub, EventKind, EventSink, Subscription};
use crate::effect::{DsParam, ParamValue};
use crate::system::traits::{
    AudioSystemInterface, EffectEngine, EffectEngineFactory, FileSystemInterface, PreferenceStore,
};

/// Mutating call received by a mock effect handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    SetEnabled(bool),
    SetDsOn(bool),
    SetProfile(i32),
    ResetProfileSpecificSettings,
    SetParam(DsParam, ParamValue),
    Release,
}

/// Engine state shared by every handle a [`MockEffectFactory`] creates
#[derive(Debug, Default)]
pub struct MockEngineState {
    pub enabled: bool,
    pub ds_on: bool,
    pub profile: i32,
    pub params: HashMap<DsParam, ParamValue>,
    /// Handle currently in control, by creation number
    pub controller: Option<usize>,
    pub created: usize,
    /// Handles opened without claiming control
    pub attached: usize,
    pub calls: Vec<EngineCall>,
}

/// Mock effect factory for testing - engine stores exactly what it is given
#[derive(Clone, Default)]
pub struct MockEffectFactory {
    pub state: Arc<Mutex<MockEngineState>>,
    pub priorities: Arc<Mutex<Vec<i32>>>,
    pub should_fail_create: Arc<AtomicBool>,
}

impl MockEffectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all mutating calls made against any handle
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn profile_calls(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::SetProfile(profile) => Some(profile),
                _ => None,
            })
            .collect()
    }

    pub fn param_writes(&self, param: DsParam) -> Vec<ParamValue> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::SetParam(p, value) if p == param => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of handles created so far
    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn attached_count(&self) -> usize {
        self.state.lock().unwrap().attached
    }

    /// Whether the most recently opened handle holds control
    pub fn latest_has_control(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.controller.is_some() && state.controller == Some(state.created)
    }

    /// Priorities passed to each create call
    pub fn requested_priorities(&self) -> Vec<i32> {
        self.priorities.lock().unwrap().clone()
    }

    /// Simulate another client taking the effect away
    pub fn revoke_control(&self) {
        self.state.lock().unwrap().controller = None;
    }

    /// Change a value behind the controller's back, without recording a call
    pub fn force_param(&self, param: DsParam, value: ParamValue) {
        self.state.lock().unwrap().params.insert(param, value);
    }

    pub fn force_ds_on(&self, on: bool) {
        self.state.lock().unwrap().ds_on = on;
    }

    pub fn param(&self, param: DsParam) -> Option<ParamValue> {
        self.state.lock().unwrap().params.get(&param).copied()
    }

    pub fn ds_on(&self) -> bool {
        self.state.lock().unwrap().ds_on
    }

    pub fn enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    pub fn profile(&self) -> i32 {
        self.state.lock().unwrap().profile
    }

    pub fn set_create_failure(&self, should_fail: bool) {
        self.should_fail_create.store(should_fail, Ordering::Relaxed);
    }
}

impl EffectEngineFactory for MockEffectFactory {
    type Engine = MockEffectEngine;

    fn create(&self, priority: i32, _audio_session: i32) -> Result<MockEffectEngine> {
        if self.should_fail_create.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock effect creation failure"));
        }

        self.priorities.lock().unwrap().push(priority);
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let id = state.created;
        state.controller = Some(id);

        Ok(MockEffectEngine {
            id,
            state: Arc::clone(&self.state),
        })
    }

    fn attach(&self, _priority: i32, _audio_session: i32) -> Result<MockEffectEngine> {
        if self.should_fail_create.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock effect creation failure"));
        }

        let mut state = self.state.lock().unwrap();
        state.created += 1;
        state.attached += 1;

        Ok(MockEffectEngine {
            id: state.created,
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle created by [`MockEffectFactory`]
pub struct MockEffectEngine {
    id: usize,
    state: Arc<Mutex<MockEngineState>>,
}

impl MockEffectEngine {
    pub fn id(&self) -> usize {
        self.id
    }

    fn record(&self, call: EngineCall) -> std::sync::MutexGuard<'_, MockEngineState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

impl EffectEngine for MockEffectEngine {
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.record(EngineCall::SetEnabled(enabled)).enabled = enabled;
        Ok(())
    }

    fn has_control(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().controller == Some(self.id))
    }

    fn release(&mut self) -> Result<()> {
        let mut state = self.record(EngineCall::Release);
        if state.controller == Some(self.id) {
            state.controller = None;
        }
        Ok(())
    }

    fn set_ds_on(&mut self, on: bool) -> Result<()> {
        self.record(EngineCall::SetDsOn(on)).ds_on = on;
        Ok(())
    }

    fn ds_on(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().ds_on)
    }

    fn set_profile(&mut self, profile: i32) -> Result<()> {
        self.record(EngineCall::SetProfile(profile)).profile = profile;
        Ok(())
    }

    fn profile(&self) -> Result<i32> {
        Ok(self.state.lock().unwrap().profile)
    }

    fn reset_profile_specific_settings(&mut self) -> Result<()> {
        self.record(EngineCall::ResetProfileSpecificSettings)
            .params
            .clear();
        Ok(())
    }

    fn get_param(&self, param: DsParam) -> Result<ParamValue> {
        let state = self.state.lock().unwrap();
        Ok(state
            .params
            .get(&param)
            .copied()
            .unwrap_or_else(|| ParamValue::zero(param.kind())))
    }

    fn set_param(&mut self, param: DsParam, value: ParamValue) -> Result<()> {
        self.record(EngineCall::SetParam(param, value))
            .params
            .insert(param, value);
        Ok(())
    }
}

/// Mock audio system for testing - controllable route and notifications
#[derive(Clone, Default)]
pub struct MockAudioSystem {
    pub hub: EventHub,
    pub media_output: Arc<Mutex<Option<AudioDevice>>>,
    pub subscribe_calls: Arc<AtomicUsize>,
    pub should_fail_route: Arc<AtomicBool>,
}

impl MockAudioSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_media_output(&self, device: Option<AudioDevice>) {
        *self.media_output.lock().unwrap() = device;
    }

    /// Deliver an event to current subscribers; returns how many received it
    pub fn emit(&self, event: AudioEvent) -> usize {
        self.hub.publish(event)
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.hub.subscriber_count(kind)
    }

    pub fn subscribe_call_count(&self) -> usize {
        self.subscribe_calls.load(Ordering::Relaxed)
    }

    pub fn set_route_failure(&self, should_fail: bool) {
        self.should_fail_route.store(should_fail, Ordering::Relaxed);
    }
}

impl AudioSystemInterface for MockAudioSystem {
    fn media_output_device(&self) -> Result<Option<AudioDevice>> {
        if self.should_fail_route.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock route query failure"));
        }
        Ok(self.media_output.lock().unwrap().clone())
    }

    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Result<Subscription> {
        self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.hub.subscribe(kind, sink))
    }
}

/// Mock preference store for testing - in-memory string map
#[derive(Clone, Default)]
pub struct MockPreferenceStore {
    pub values: Arc<Mutex<HashMap<String, String>>>,
}

impl MockPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.put(key, value);
        store
    }

    pub fn put(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

impl PreferenceStore for MockPreferenceStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key, value);
        Ok(())
    }
}

/// Mock file system for testing - provides controllable file operations
#[derive(Clone, Default)]
pub struct MockFileSystem {
    pub files: Arc<Mutex<HashMap<PathBuf, String>>>,
    pub read_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub write_calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub directory_creation_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub should_fail_read: Arc<AtomicBool>,
    pub should_fail_write: Arc<AtomicBool>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the mock file system
    pub fn add_file<P: AsRef<Path>>(&self, path: P, content: String) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content);
    }

    pub fn contents<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn get_read_calls(&self) -> Vec<PathBuf> {
        self.read_calls.lock().unwrap().clone()
    }

    pub fn get_write_calls(&self) -> Vec<(PathBuf, String)> {
        self.write_calls.lock().unwrap().clone()
    }

    pub fn get_directory_creation_calls(&self) -> Vec<PathBuf> {
        self.directory_creation_calls.lock().unwrap().clone()
    }

    pub fn set_read_failure(&self, should_fail: bool) {
        self.should_fail_read.store(should_fail, Ordering::Relaxed);
    }

    pub fn set_write_failure(&self, should_fail: bool) {
        self.should_fail_write.store(should_fail, Ordering::Relaxed);
    }
}

impl FileSystemInterface for MockFileSystem {
    fn read_file(&self, path: &Path) -> Result<String> {
        self.read_calls.lock().unwrap().push(path.to_path_buf());

        if self.should_fail_read.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock read failure"));
        }

        self.contents(path)
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), content.to_string()));

        if self.should_fail_write.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock write failure"));
        }

        self.add_file(path, content.to_string());
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        self.directory_creation_calls
            .lock()
            .unwrap()
            .push(path.to_path_buf());
        Ok(())
    }
}
