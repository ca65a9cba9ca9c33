use serde::{Deserialize, Serialize};
use std::fmt;

/// Output route types reported by the host audio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    BuiltinSpeaker,
    BuiltinEarpiece,
    WiredHeadphones,
    WiredHeadset,
    BluetoothA2dp,
    UsbHeadset,
    Hdmi,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub id: u32,
    pub name: String,
    pub device_type: DeviceType,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::BuiltinSpeaker => write!(f, "Built-in speaker"),
            DeviceType::BuiltinEarpiece => write!(f, "Built-in earpiece"),
            DeviceType::WiredHeadphones => write!(f, "Wired headphones"),
            DeviceType::WiredHeadset => write!(f, "Wired headset"),
            DeviceType::BluetoothA2dp => write!(f, "Bluetooth A2DP"),
            DeviceType::UsbHeadset => write!(f, "USB headset"),
            DeviceType::Hdmi => write!(f, "HDMI"),
            DeviceType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) #{}", self.name, self.device_type, self.id)
    }
}

impl AudioDevice {
    pub fn new(id: u32, name: String, device_type: DeviceType) -> Self {
        Self {
            id,
            name,
            device_type,
        }
    }

    pub fn is_builtin_speaker(&self) -> bool {
        self.device_type == DeviceType::BuiltinSpeaker
    }
}
