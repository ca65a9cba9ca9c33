use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::system::{FileSystemInterface, StandardFileSystem};

use super::types::Config;

/// Reads and writes `config.toml` through a [`FileSystemInterface`], so the
/// tests never touch the real home directory.
pub struct ConfigLoader<F: FileSystemInterface> {
    file_system: F,
    config_path: PathBuf,
}

impl<F: FileSystemInterface> ConfigLoader<F> {
    pub fn new(file_system: F, config_path: PathBuf) -> Self {
        Self {
            file_system,
            config_path,
        }
    }

    /// Parse the config file. A missing file yields the defaults, which are
    /// written back when the location is writable.
    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path.as_path();
        if !self.file_system.file_exists(path) {
            info!("No config at {}, using defaults", path.display());
            return Ok(self.write_defaults());
        }

        debug!("Reading config from {}", path.display());
        let raw = self
            .file_system
            .read_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Write `config` as pretty TOML, creating the parent directory first
    pub fn save_config(&self, config: &Config) -> Result<()> {
        let path = self.config_path.as_path();
        if let Some(dir) = path.parent() {
            self.file_system
                .create_dir(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let raw = toml::to_string_pretty(config).context("Failed to serialize config")?;
        self.file_system
            .write_file(path, &raw)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_exists(&self) -> bool {
        self.file_system.file_exists(&self.config_path)
    }

    fn write_defaults(&self) -> Config {
        let config = Config::default();
        match self.save_config(&config) {
            Ok(()) => info!("Wrote default config to {}", self.config_path.display()),
            Err(e) => warn!(
                "Running with defaults, could not write {}: {:#}",
                self.config_path.display(),
                e
            ),
        }
        config
    }
}

impl ConfigLoader<StandardFileSystem> {
    pub fn new_production(config_path: PathBuf) -> Self {
        Self::new(StandardFileSystem, config_path)
    }

    /// Loader for `~/.config/dolby-control/config.toml`
    pub fn new_with_default_path() -> Result<Self> {
        Ok(Self::new_production(Self::default_config_path()?))
    }

    /// `~/.config/dolby-control`; the preference store lives here too
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".config").join("dolby-control"))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::DeviceType;
    use crate::system::MockFileSystem;
    use std::path::PathBuf;

    #[test]
    fn test_missing_config_writes_defaults() {
        let mock_fs = MockFileSystem::new();
        let config_path = PathBuf::from("/test/config.toml");
        let loader = ConfigLoader::new(mock_fs.clone(), config_path.clone());

        let config = loader.load_config().unwrap();

        assert_eq!(config, Config::default());
        assert!(mock_fs.file_exists(&config_path));
    }

    #[test]
    fn test_profiles_and_routing_from_toml() {
        let mock_fs = MockFileSystem::new();
        let config_path = PathBuf::from("/test/config.toml");

        let config_content = r#"
[general]
log_level = "debug"

[engine]
priority = 50

[routing]
media_output = "wired_headphones"

[[profiles]]
value = 0
name = "Dynamic"

[[profiles]]
value = 8
name = "Voice"
"#;
        mock_fs.add_file(&config_path, config_content.to_string());

        let loader = ConfigLoader::new(mock_fs, config_path);
        let config = loader.load_config().unwrap();

        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.engine.priority, 50);
        assert_eq!(config.engine.audio_session, 0);
        assert_eq!(config.routing.media_output, DeviceType::WiredHeadphones);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles[1].name, "Voice");
        assert_eq!(config.preferences.profile_key, "dolby_profile");
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let mock_fs = MockFileSystem::new();
        let config_path = PathBuf::from("/test/config.toml");
        let loader = ConfigLoader::new(mock_fs.clone(), config_path.clone());

        loader.save_config(&Config::default()).unwrap();

        let write_calls = mock_fs.get_write_calls();
        assert_eq!(write_calls.len(), 1);
        assert_eq!(write_calls[0].0, config_path);

        let dir_calls = mock_fs.get_directory_creation_calls();
        assert_eq!(dir_calls, vec![PathBuf::from("/test")]);
    }

    #[test]
    fn test_unwritable_location_still_yields_defaults() {
        let mock_fs = MockFileSystem::new();
        mock_fs.set_write_failure(true);
        let loader = ConfigLoader::new(mock_fs, PathBuf::from("/readonly/config.toml"));

        let config = loader.load_config().unwrap();
        assert_eq!(config.engine.priority, 100);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mock_fs = MockFileSystem::new();
        let config_path = PathBuf::from("/test/config.toml");
        mock_fs.add_file(&config_path, "[engine\npriority = ".to_string());

        let loader = ConfigLoader::new(mock_fs, config_path);
        assert!(loader.load_config().is_err());
    }

    #[test]
    fn test_exists_tracks_file() {
        let mock_fs = MockFileSystem::new();
        let config_path = PathBuf::from("/test/config.toml");
        let loader = ConfigLoader::new(mock_fs.clone(), config_path.clone());

        assert!(!loader.config_exists());

        mock_fs.add_file(&config_path, "[general]\n".to_string());
        assert!(loader.config_exists());
    }
}
