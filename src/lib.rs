pub mod audio;
pub mod config;
pub mod effect;
pub mod logging;
pub mod service;
pub mod system;

pub use config::Config;
pub use effect::{ControllerSettings, ProfileController};
pub use service::{ControllerHandle, EnhancementService};
pub use system::{AudioSystemInterface, EffectEngine, EffectEngineFactory, PreferenceStore};

#[cfg(any(test, feature = "test-mocks"))]
pub use system::{
    EngineCall, MockAudioSystem, MockEffectEngine, MockEffectFactory, MockFileSystem,
    MockPreferenceStore,
};
