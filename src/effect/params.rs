use serde::{Deserialize, Serialize};
use std::fmt;

/// Value kind of an engine knob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
}

/// Independently addressable knobs on the Dolby audio processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsParam {
    HeadphoneVirtualizer,
    SpeakerVirtualizer,
    VolumeLevelerEnable,
    DialogueEnhancerEnable,
    DialogueEnhancerAmount,
    BassEnhancerEnable,
    StereoWideningAmount,
    VolumeLevelerAmount,
}

impl DsParam {
    /// DAP parameter id understood by the effect
    pub fn id(self) -> u32 {
        match self {
            DsParam::HeadphoneVirtualizer => 101,
            DsParam::SpeakerVirtualizer => 102,
            DsParam::VolumeLevelerEnable => 103,
            DsParam::DialogueEnhancerEnable => 105,
            DsParam::DialogueEnhancerAmount => 108,
            DsParam::BassEnhancerEnable => 111,
            DsParam::StereoWideningAmount => 113,
            DsParam::VolumeLevelerAmount => 116,
        }
    }

    pub fn kind(self) -> ParamKind {
        match self {
            DsParam::HeadphoneVirtualizer
            | DsParam::SpeakerVirtualizer
            | DsParam::VolumeLevelerEnable
            | DsParam::DialogueEnhancerEnable
            | DsParam::BassEnhancerEnable => ParamKind::Bool,
            DsParam::DialogueEnhancerAmount
            | DsParam::StereoWideningAmount
            | DsParam::VolumeLevelerAmount => ParamKind::Int,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DsParam::HeadphoneVirtualizer => "headphone_virtualizer",
            DsParam::SpeakerVirtualizer => "speaker_virtualizer",
            DsParam::VolumeLevelerEnable => "volume_leveler_enable",
            DsParam::DialogueEnhancerEnable => "dialogue_enhancer_enable",
            DsParam::DialogueEnhancerAmount => "dialogue_enhancer_amount",
            DsParam::BassEnhancerEnable => "bass_enhancer_enable",
            DsParam::StereoWideningAmount => "stereo_widening_amount",
            DsParam::VolumeLevelerAmount => "volume_leveler_amount",
        }
    }
}

impl fmt::Display for DsParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}

/// A typed value read from or written to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
}

impl ParamValue {
    pub fn as_bool(self) -> bool {
        match self {
            ParamValue::Bool(b) => b,
            ParamValue::Int(n) => n != 0,
        }
    }

    pub fn as_int(self) -> i32 {
        match self {
            ParamValue::Bool(b) => i32::from(b),
            ParamValue::Int(n) => n,
        }
    }

    /// Zero value of the given kind, used for knobs that were never written
    pub fn zero(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Bool => ParamValue::Bool(false),
            ParamKind::Int => ParamValue::Int(0),
        }
    }

    pub fn kind(self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(n) => write!(f, "{n}"),
        }
    }
}
