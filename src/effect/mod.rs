pub mod composite;
pub mod controller;
pub mod params;
pub mod profiles;
pub mod settings;

pub use composite::{CompositeParam, DialogueEnhancer, VOLUME_LEVELER_AMOUNT, VolumeLeveler};
pub use controller::{ControllerSettings, ProfileController};
pub use params::{DsParam, ParamKind, ParamValue};
pub use profiles::{ProfileEntry, ProfileTable};
pub use settings::Setting;
