use anyhow::Result;
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{info, warn};

/// What a received signal asks the daemon to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    /// SIGTERM / SIGINT
    Shutdown,
    /// SIGHUP
    Resync,
    /// SIGUSR1
    PlaybackStarted,
    /// SIGUSR2
    DevicesChanged,
}

impl SignalType {
    pub fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            SIGTERM | SIGINT => Some(SignalType::Shutdown),
            SIGHUP => Some(SignalType::Resync),
            SIGUSR1 => Some(SignalType::PlaybackStarted),
            SIGUSR2 => Some(SignalType::DevicesChanged),
            _ => None,
        }
    }
}

/// Forwards process signals to the daemon loop
#[derive(Clone)]
pub struct SignalHandler {
    signal_sender: mpsc::UnboundedSender<SignalType>,
}

impl SignalHandler {
    pub fn with_sender(signal_sender: mpsc::UnboundedSender<SignalType>) -> Self {
        Self { signal_sender }
    }

    /// Listen until a shutdown signal arrives or the receiver goes away
    pub async fn listen_for_signals(&self) -> Result<()> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGHUP, SIGUSR1, SIGUSR2])?;

        info!("Signal handler initialized, listening for SIGTERM, SIGINT, SIGHUP, SIGUSR1, SIGUSR2");

        while let Some(signal) = signals.next().await {
            let Some(signal_type) = SignalType::from_signal(signal) else {
                warn!("Received unexpected signal: {}", signal);
                continue;
            };

            info!("Received signal {} ({:?})", signal, signal_type);
            if self.signal_sender.send(signal_type).is_err() {
                warn!("Signal receiver closed, stopping signal handler");
                break;
            }
            if signal_type == SignalType::Shutdown {
                break;
            }
        }

        Ok(())
    }
}
