use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::enhancement::{EnhancementService, event_channel};
use super::signals::{SignalHandler, SignalType};
use crate::audio::EventSink;
use crate::config::Config;
use crate::effect::{ControllerSettings, ProfileController};
use crate::system::{
    FilePreferenceStore, SimulatedAudioSystem, StandardFileSystem, StateFileEngineFactory,
};

/// Controller wired to the file-backed engine and preference store
pub type ProductionController = ProfileController<
    StateFileEngineFactory<StandardFileSystem>,
    SimulatedAudioSystem,
    FilePreferenceStore<StandardFileSystem>,
>;

fn production_parts(
    config: &Config,
) -> Result<(
    StateFileEngineFactory<StandardFileSystem>,
    FilePreferenceStore<StandardFileSystem>,
)> {
    let factory = StateFileEngineFactory::new_production(config.state_file_path()?);
    let preferences = FilePreferenceStore::new(StandardFileSystem, config.preferences_path()?);
    Ok((factory, preferences))
}

/// Build a controller that claims the effect, as the daemon does at boot
pub fn build_production_controller(
    config: &Config,
    audio_system: SimulatedAudioSystem,
    events: EventSink,
) -> Result<ProductionController> {
    let (factory, preferences) = production_parts(config)?;
    ProfileController::new(
        factory,
        audio_system,
        preferences,
        ControllerSettings::from_config(config),
        events,
    )
}

/// Build a controller that leaves a running daemon in control until the
/// first write
pub fn attach_production_controller(
    config: &Config,
    audio_system: SimulatedAudioSystem,
    events: EventSink,
) -> Result<ProductionController> {
    let (factory, preferences) = production_parts(config)?;
    ProfileController::attach(
        factory,
        audio_system,
        preferences,
        ControllerSettings::from_config(config),
        events,
    )
}

/// Records the daemon's pid for the lifetime of the service
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, std::process::id().to_string())
            .with_context(|| format!("Failed to write pid file {}", path.display()))?;
        debug!("Wrote pid file {}", path.display());
        Ok(Self { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove pid file {}: {}", self.path.display(), e);
        }
    }
}

/// Pid recorded by a running daemon, if any
pub fn read_daemon_pid(path: &Path) -> Result<Option<i32>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pid file {}", path.display()))?;
    let pid = content
        .trim()
        .parse::<i32>()
        .with_context(|| format!("Invalid pid file {}: {:?}", path.display(), content))?;
    if pid <= 0 {
        bail!("Invalid pid {} in {}", pid, path.display());
    }
    Ok(Some(pid))
}

/// Ask a running daemon to re-read the enhancement switch and re-apply the
/// profile. Returns false when no daemon is running.
pub fn notify_daemon(config: &Config) -> Result<bool> {
    let path = config.pid_file_path()?;
    let Some(pid) = read_daemon_pid(&path)? else {
        debug!("No daemon pid file at {}", path.display());
        return Ok(false);
    };
    if pid as u32 == std::process::id() {
        return Ok(false);
    }

    // SAFETY: kill(2) has no memory-safety preconditions
    let result = unsafe { libc::kill(pid, libc::SIGHUP) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            warn!("Stale pid file {} (pid {} is gone)", path.display(), pid);
            return Ok(false);
        }
        return Err(err).with_context(|| format!("Failed to signal daemon pid {}", pid));
    }

    info!("Signalled daemon pid {} to resync", pid);
    Ok(true)
}

/// Manages the background service lifecycle
pub struct ServiceManager {
    config: Config,
}

impl ServiceManager {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Boot the controller and serve audio notifications until a shutdown signal
    pub async fn start(&self) -> Result<()> {
        info!("Starting Dolby control service");

        let audio_system = SimulatedAudioSystem::new(self.config.routing.media_output);
        let (sink, events) = event_channel();
        let controller = build_production_controller(&self.config, audio_system.clone(), sink)?;
        let (service, handle) = EnhancementService::new(controller, events);
        let service_task = tokio::spawn(service.run());

        if let Err(e) = handle.boot_completed().await {
            error!("Boot sequence failed: {:#}", e);
        }

        let _pid_file = PidFile::create(self.config.pid_file_path()?)?;

        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel::<SignalType>();
        let signal_handler = SignalHandler::with_sender(signal_tx);
        tokio::spawn(async move {
            if let Err(e) = signal_handler.listen_for_signals().await {
                error!("Signal handler error: {}", e);
            }
        });

        info!("Service started successfully, entering main loop");

        loop {
            match signal_rx.recv().await {
                Some(SignalType::Shutdown) => {
                    info!("Shutdown signal received, stopping service");
                    break;
                }
                Some(SignalType::Resync) => {
                    if let Err(e) = handle.sync_with_engine().await {
                        error!("Failed to resync with engine: {:#}", e);
                    }
                }
                Some(SignalType::PlaybackStarted) => {
                    let delivered = audio_system.publish_playback_started();
                    info!("Simulated playback start ({} subscribers)", delivered);
                }
                Some(SignalType::DevicesChanged) => {
                    let delivered = audio_system.publish_devices_changed();
                    info!("Simulated device change ({} subscribers)", delivered);
                }
                None => {
                    warn!("Signal channel closed");
                    break;
                }
            }
        }

        handle.shutdown()?;
        service_task.await??;

        info!("Service shutdown completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pid_file_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run/daemon.pid");

        let pid_file = PidFile::create(path.clone()).unwrap();
        assert_eq!(
            read_daemon_pid(&path).unwrap(),
            Some(std::process::id() as i32)
        );

        drop(pid_file);
        assert!(!path.exists());
        assert_eq!(read_daemon_pid(&path).unwrap(), None);
    }

    #[test]
    fn test_corrupt_pid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");

        std::fs::write(&path, "dolby").unwrap();
        assert!(read_daemon_pid(&path).is_err());

        std::fs::write(&path, "0").unwrap();
        assert!(read_daemon_pid(&path).is_err());
    }

    #[test]
    fn test_notify_without_daemon() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.general.pid_file = Some(dir.path().join("daemon.pid"));

        assert!(!notify_daemon(&config).unwrap());
    }

    #[test]
    fn test_notify_skips_own_pid() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        let path = dir.path().join("daemon.pid");
        config.general.pid_file = Some(path.clone());
        std::fs::write(&path, std::process::id().to_string()).unwrap();

        assert!(!notify_daemon(&config).unwrap());
    }
}
