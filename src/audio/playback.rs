use std::fmt;

/// Player state as reported in a playback configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Started,
    Paused,
    Stopped,
    Released,
}

/// One active playback session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfiguration {
    pub session_id: u32,
    pub state: PlayerState,
}

impl PlaybackConfiguration {
    pub fn new(session_id: u32, state: PlayerState) -> Self {
        Self { session_id, state }
    }

    pub fn is_started(&self) -> bool {
        self.state == PlayerState::Started
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Idle => "idle",
            PlayerState::Started => "started",
            PlayerState::Paused => "paused",
            PlayerState::Stopped => "stopped",
            PlayerState::Released => "released",
        };
        f.write_str(name)
    }
}

/// True when at least one session is currently playing
pub fn any_started(configs: &[PlaybackConfiguration]) -> bool {
    configs.iter().any(PlaybackConfiguration::is_started)
}
