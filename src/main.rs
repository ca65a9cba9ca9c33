use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dolby_control::audio::DeviceType;
use dolby_control::config::{Config, ConfigLoader};
use dolby_control::effect::Setting;
use dolby_control::logging::{self, LoggingConfig};
use dolby_control::service::{
    ProductionController, ServiceManager, attach_production_controller,
    build_production_controller, event_channel, notify_daemon,
};
use dolby_control::system::{PreferenceStore, SimulatedAudioSystem};

#[derive(Parser)]
#[command(name = "dolby-control")]
#[command(about = "Dolby audio effect controller with profile restore on playback and device changes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the enhancement state and every setting
    Status,
    /// Run the boot-completed sequence
    Boot,
    /// Switch enhancement on and re-apply the selected profile
    Enable,
    /// Switch enhancement off
    Disable,
    /// Show or select the active profile
    Profile {
        /// Profile value to select and persist
        #[arg(short, long)]
        set: Option<i32>,
    },
    /// List configured profiles
    Profiles,
    /// Reset the active profile's settings to defaults
    Reset,
    /// Read one setting
    Get {
        #[arg(value_enum)]
        setting: Setting,
    },
    /// Change one setting (on/off for switches, integers for amounts)
    Set {
        #[arg(value_enum)]
        setting: Setting,
        value: String,
    },
    /// Validate configuration file
    CheckConfig,
    /// Run in daemon mode
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let is_daemon = matches!(cli.command, Some(Commands::Daemon) | None);

    let (_guard, log_dir) = logging::initialize_logging(LoggingConfig::from_general(
        &config.general,
        cli.verbose,
        is_daemon,
    ))?;
    if let Some(dir) = log_dir {
        info!("Writing logs to {}", dir.display());
        logging::cleanup_old_logs(&dir, 7)?;
    }

    match cli.command {
        Some(Commands::Status) => show_status(&open_controller(&config)?)?,
        Some(Commands::Boot) => {
            let (sink, _events) = event_channel();
            let audio_system = SimulatedAudioSystem::new(config.routing.media_output);
            build_production_controller(&config, audio_system, sink)?.on_boot_completed()?;
            println!("Boot sequence completed");
        }
        Some(Commands::Enable) => {
            open_controller(&config)?.set_ds_on(true)?;
            println!("Dolby enabled");
            resync_daemon(&config);
        }
        Some(Commands::Disable) => {
            open_controller(&config)?.set_ds_on(false)?;
            println!("Dolby disabled");
            resync_daemon(&config);
        }
        Some(Commands::Profile { set }) => profile(&config, set)?,
        Some(Commands::Profiles) => list_profiles(&config),
        Some(Commands::Reset) => {
            open_controller(&config)?.reset_profile_specific_settings()?;
            println!("Profile settings reset");
        }
        Some(Commands::Get { setting }) => {
            let controller = open_controller(&config)?;
            println!("{}: {}", setting, setting.read(&controller)?);
        }
        Some(Commands::Set { setting, value }) => {
            let mut controller = open_controller(&config)?;
            setting.write(&mut controller, &value)?;
            println!("{}: {}", setting, setting.read(&controller)?);
        }
        Some(Commands::CheckConfig) => check_config(&config, cli.config.as_deref())?,
        Some(Commands::Daemon) => run_daemon(config).await?,
        None => {
            info!("No command specified, running in daemon mode");
            run_daemon(config).await?;
        }
    }

    Ok(())
}

/// Controller for a single command; audio notifications are not consumed.
/// Reads leave a running daemon in control, writes claim the effect.
fn open_controller(config: &Config) -> Result<ProductionController> {
    let (sink, _events) = event_channel();
    let audio_system = SimulatedAudioSystem::new(config.routing.media_output);
    attach_production_controller(config, audio_system, sink)
}

/// The daemon keeps its own callback registration; let it catch up
fn resync_daemon(config: &Config) {
    match notify_daemon(config) {
        Ok(true) => println!("Daemon notified"),
        Ok(false) => {}
        Err(e) => eprintln!("Warning: could not notify daemon: {:#}", e),
    }
}

fn show_status(controller: &ProductionController) -> Result<()> {
    let profile = controller.profile()?;
    let name = controller
        .profile_name()?
        .unwrap_or_else(|| "<unknown>".to_string());

    println!("Dolby: {}", if controller.ds_on()? { "on" } else { "off" });
    println!("Profile: {} ({})", name, profile);
    for setting in Setting::ALL {
        println!("  {}: {}", setting, setting.read(controller)?);
    }
    Ok(())
}

fn profile(config: &Config, set: Option<i32>) -> Result<()> {
    let mut controller = open_controller(config)?;

    if let Some(index) = set {
        if controller.profiles().name_of(index).is_none() {
            anyhow::bail!("Profile {} is not configured", index);
        }
        let key = controller.settings().profile_key.clone();
        controller
            .preferences_mut()
            .set_string(&key, &index.to_string())
            .context("Failed to persist profile selection")?;
        controller.set_profile(index)?;
        resync_daemon(config);
    }

    let name = controller
        .profile_name()?
        .unwrap_or_else(|| "<unknown>".to_string());
    println!("Profile: {} ({})", name, controller.profile()?);
    Ok(())
}

fn list_profiles(config: &Config) {
    println!("Configured profiles:");
    for (i, entry) in config.profiles.iter().enumerate() {
        println!("  {}. {} (value {})", i + 1, entry.name, entry.value);
    }
}

fn check_config(config: &Config, config_path: Option<&str>) -> Result<()> {
    info!("Validating configuration");

    let loader = match config_path {
        Some(path) => ConfigLoader::new_production(path.into()),
        None => ConfigLoader::new_with_default_path()?,
    };

    config.validate()?;

    println!(
        "Configuration validation ({}):",
        loader.get_config_path().display()
    );
    if loader.config_exists() {
        println!("  ✓ Configuration file parsed successfully");
    } else {
        println!("  ✓ No configuration file, using defaults");
    }
    println!("  ✓ Profiles: {}", config.profiles.len());
    println!("  ✓ Effect priority: {}", config.engine.priority);
    println!("  ✓ Engine state: {}", config.state_file_path()?.display());
    println!("  ✓ Preferences: {}", config.preferences_path()?.display());
    println!("  ✓ Daemon pid file: {}", config.pid_file_path()?.display());
    if config.routing.media_output != DeviceType::BuiltinSpeaker {
        println!("  ✓ Media route: {}", config.routing.media_output);
    }

    Ok(())
}

async fn run_daemon(config: Config) -> Result<()> {
    info!("Starting daemon mode");
    config.validate()?;

    println!("Dolby control daemon started (pid {})", std::process::id());
    println!("  SIGUSR1: playback started, SIGUSR2: device change");
    println!("  SIGHUP: resync with engine and re-apply profile");
    println!("  Press Ctrl+C to stop");

    ServiceManager::new(config).start().await?;

    println!("Daemon stopped");
    Ok(())
}
