use anyhow::Result;
use std::path::Path;

use crate::audio::{AudioDevice, EventKind, EventSink, Subscription};
use crate::effect::{DsParam, ParamValue};

/// Trait for the Dolby effect instance - abstracts the vendor audio effect
pub trait EffectEngine: Send {
    /// Enable or disable the effect in the audio chain
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Whether this handle still holds control of the effect instance
    fn has_control(&self) -> Result<bool>;

    /// Give up the effect instance
    fn release(&mut self) -> Result<()>;

    /// Toggle the whole enhancement subsystem
    fn set_ds_on(&mut self, on: bool) -> Result<()>;

    fn ds_on(&self) -> Result<bool>;

    fn set_profile(&mut self, profile: i32) -> Result<()>;

    fn profile(&self) -> Result<i32>;

    /// Restore the current profile's parameters to their defaults
    fn reset_profile_specific_settings(&mut self) -> Result<()>;

    fn get_param(&self, param: DsParam) -> Result<ParamValue>;

    fn set_param(&mut self, param: DsParam, value: ParamValue) -> Result<()>;

    fn get_param_bool(&self, param: DsParam) -> Result<bool> {
        Ok(self.get_param(param)?.as_bool())
    }

    fn get_param_int(&self, param: DsParam) -> Result<i32> {
        Ok(self.get_param(param)?.as_int())
    }

    fn set_param_bool(&mut self, param: DsParam, value: bool) -> Result<()> {
        self.set_param(param, ParamValue::Bool(value))
    }

    fn set_param_int(&mut self, param: DsParam, value: i32) -> Result<()> {
        self.set_param(param, ParamValue::Int(value))
    }
}

/// Creates effect handles; used again whenever control has been lost
pub trait EffectEngineFactory: Send {
    type Engine: EffectEngine;

    fn create(&self, priority: i32, audio_session: i32) -> Result<Self::Engine>;

    /// Open a handle without taking control from the current owner.
    /// Engines without shared ownership simply create.
    fn attach(&self, priority: i32, audio_session: i32) -> Result<Self::Engine> {
        self.create(priority, audio_session)
    }
}

/// Trait for persisted user preferences - a string key-value store
pub trait PreferenceStore: Send {
    fn get_string(&self, key: &str) -> Result<Option<String>>;

    fn set_string(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Trait for host audio stack operations - routing queries and notifications
pub trait AudioSystemInterface: Send {
    /// Device currently used for media playback, if any
    fn media_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Attach a sink to one notification stream.
    /// Dropping the returned handle detaches it again.
    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Result<Subscription>;
}

/// Trait for file system operations - abstracts std::fs for testability
pub trait FileSystemInterface {
    /// Read the entire contents of a file
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Write content to a file, replacing it
    fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    fn file_exists(&self, path: &Path) -> bool;

    /// Create the directory structure for a file
    fn create_dir(&self, path: &Path) -> Result<()>;
}
