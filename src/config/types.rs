use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::audio::DeviceType;
use crate::effect::controller::{AUDIO_SESSION, DEFAULT_PROFILE, EFFECT_PRIORITY, PREF_PROFILE};
use crate::effect::profiles::{ProfileEntry, default_profiles};

use super::loader::ConfigLoader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default = "default_profiles")]
    pub profiles: Vec<ProfileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub json_logs: bool,
    /// Where the daemon records its pid for `enable`/`disable` to signal
    pub pid_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub priority: i32,
    pub audio_session: i32,
    /// Where the software engine keeps its state
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub path: Option<PathBuf>,
    pub profile_key: String,
    pub default_profile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Device type reported as the media route by the simulated audio system
    pub media_output: DeviceType,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            json_logs: false,
            pid_file: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            priority: EFFECT_PRIORITY,
            audio_session: AUDIO_SESSION,
            state_file: None,
        }
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: None,
            profile_key: PREF_PROFILE.to_string(),
            default_profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            media_output: DeviceType::BuiltinSpeaker,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            engine: EngineConfig::default(),
            preferences: PreferencesConfig::default(),
            routing: RoutingConfig::default(),
            profiles: default_profiles(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let loader = match config_path {
            Some(path) => ConfigLoader::new_production(PathBuf::from(path)),
            None => ConfigLoader::new_with_default_path()?,
        };
        loader.load_config()
    }

    /// Check the invariants the controller relies on
    pub fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            bail!("At least one profile must be configured");
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if profile.name.trim().is_empty() {
                bail!("Profile {} has an empty name", profile.value);
            }
            if !seen.insert(profile.value) {
                bail!("Profile value {} is listed more than once", profile.value);
            }
        }

        if self.preferences.profile_key.trim().is_empty() {
            bail!("Preference key for the profile must not be empty");
        }

        self.preferences
            .default_profile
            .parse::<i32>()
            .with_context(|| {
                format!(
                    "Default profile {:?} is not a number",
                    self.preferences.default_profile
                )
            })?;

        Ok(())
    }

    pub fn state_file_path(&self) -> Result<PathBuf> {
        match &self.engine.state_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("engine.toml")),
        }
    }

    pub fn pid_file_path(&self) -> Result<PathBuf> {
        match &self.general.pid_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("daemon.pid")),
        }
    }

    pub fn preferences_path(&self) -> Result<PathBuf> {
        match &self.preferences.path {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigLoader::default_config_dir()?.join("preferences.toml")),
        }
    }
}

/// `~/.local/share/dolby-control`
pub fn data_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home_dir.join(".local/share/dolby-control"))
}
