use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use std::fmt;

use crate::system::{AudioSystemInterface, EffectEngineFactory, PreferenceStore};

use super::controller::ProfileController;

/// User-facing enhancement settings, addressed by name from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Setting {
    HeadphoneVirtualizer,
    SpeakerVirtualizer,
    StereoWidening,
    DialogueEnhancer,
    BassEnhancer,
    VolumeLeveler,
}

impl Setting {
    pub const ALL: [Setting; 6] = [
        Setting::HeadphoneVirtualizer,
        Setting::SpeakerVirtualizer,
        Setting::StereoWidening,
        Setting::DialogueEnhancer,
        Setting::BassEnhancer,
        Setting::VolumeLeveler,
    ];

    /// Read the live value from the engine, formatted for display
    pub fn read<F, A, P>(self, controller: &ProfileController<F, A, P>) -> Result<String>
    where
        F: EffectEngineFactory,
        A: AudioSystemInterface,
        P: PreferenceStore,
    {
        let value = match self {
            Setting::HeadphoneVirtualizer => {
                on_off(controller.headphone_virtualizer_enabled()?).to_string()
            }
            Setting::SpeakerVirtualizer => {
                on_off(controller.speaker_virtualizer_enabled()?).to_string()
            }
            Setting::StereoWidening => controller.stereo_widening_amount()?.to_string(),
            Setting::DialogueEnhancer => controller.dialogue_enhancer_amount()?.to_string(),
            Setting::BassEnhancer => on_off(controller.bass_enhancer_enabled()?).to_string(),
            Setting::VolumeLeveler => on_off(controller.volume_leveler_enabled()?).to_string(),
        };
        Ok(value)
    }

    /// Parse `raw` for this setting and write it through the controller
    pub fn write<F, A, P>(self, controller: &mut ProfileController<F, A, P>, raw: &str) -> Result<()>
    where
        F: EffectEngineFactory,
        A: AudioSystemInterface,
        P: PreferenceStore,
    {
        match self {
            Setting::HeadphoneVirtualizer => {
                controller.set_headphone_virtualizer_enabled(parse_switch(raw)?)
            }
            Setting::SpeakerVirtualizer => {
                controller.set_speaker_virtualizer_enabled(parse_switch(raw)?)
            }
            Setting::StereoWidening => controller.set_stereo_widening_amount(parse_amount(raw)?),
            Setting::DialogueEnhancer => {
                controller.set_dialogue_enhancer_amount(parse_amount(raw)?)
            }
            Setting::BassEnhancer => controller.set_bass_enhancer_enabled(parse_switch(raw)?),
            Setting::VolumeLeveler => controller.set_volume_leveler_enabled(parse_switch(raw)?),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Setting::HeadphoneVirtualizer => "Headphone virtualizer",
            Setting::SpeakerVirtualizer => "Speaker virtualizer",
            Setting::StereoWidening => "Stereo widening",
            Setting::DialogueEnhancer => "Dialogue enhancer",
            Setting::BassEnhancer => "Bass enhancer",
            Setting::VolumeLeveler => "Volume leveler",
        };
        f.write_str(name)
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Accepts on/off, true/false, yes/no and 1/0
pub fn parse_switch(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => bail!("Expected on/off, got {other:?}"),
    }
}

pub fn parse_amount(raw: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .with_context(|| format!("Expected an integer amount, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_switch() {
        assert!(parse_switch("on").unwrap());
        assert!(parse_switch(" TRUE ").unwrap());
        assert!(!parse_switch("0").unwrap());
        assert!(parse_switch("maybe").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("6").unwrap(), 6);
        assert_eq!(parse_amount(" 0 ").unwrap(), 0);
        assert!(parse_amount("loud").is_err());
    }
}
