//! Logical settings that the engine stores as an enable flag plus an amount.

use super::params::DsParam;

/// Amount the volume leveler must carry to be reported as enabled
pub const VOLUME_LEVELER_AMOUNT: i32 = 2;

/// Mapping between one logical setting and its two physical knobs
pub trait CompositeParam {
    type Value;

    const ENABLE: DsParam;
    const AMOUNT: DsParam;

    /// Physical `(enable, amount)` pair to write for a logical value
    fn encode(value: Self::Value) -> (bool, i32);

    /// Logical value for a physical `(enable, amount)` pair
    fn decode(enabled: bool, amount: i32) -> Self::Value;
}

/// Dialogue enhancer: the amount doubles as the on/off switch, and the
/// enable flag is authoritative when reading back.
pub struct DialogueEnhancer;

impl CompositeParam for DialogueEnhancer {
    type Value = i32;

    const ENABLE: DsParam = DsParam::DialogueEnhancerEnable;
    const AMOUNT: DsParam = DsParam::DialogueEnhancerAmount;

    fn encode(amount: i32) -> (bool, i32) {
        (amount > 0, amount)
    }

    fn decode(enabled: bool, amount: i32) -> i32 {
        if enabled { amount } else { 0 }
    }
}

/// Volume leveler: only reads as enabled when both knobs agree.
pub struct VolumeLeveler;

impl CompositeParam for VolumeLeveler {
    type Value = bool;

    const ENABLE: DsParam = DsParam::VolumeLevelerEnable;
    const AMOUNT: DsParam = DsParam::VolumeLevelerAmount;

    fn encode(enabled: bool) -> (bool, i32) {
        (enabled, if enabled { VOLUME_LEVELER_AMOUNT } else { 0 })
    }

    fn decode(enabled: bool, amount: i32) -> bool {
        enabled && amount == VOLUME_LEVELER_AMOUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialogue_enhancer_encode() {
        assert_eq!(DialogueEnhancer::encode(0), (false, 0));
        assert_eq!(DialogueEnhancer::encode(5), (true, 5));
    }

    #[test]
    fn test_dialogue_enhancer_enable_flag_is_authoritative() {
        assert_eq!(DialogueEnhancer::decode(true, 5), 5);
        assert_eq!(DialogueEnhancer::decode(false, 5), 0);
        assert_eq!(DialogueEnhancer::decode(false, 0), 0);
    }

    #[test]
    fn test_volume_leveler_encode() {
        assert_eq!(VolumeLeveler::encode(true), (true, VOLUME_LEVELER_AMOUNT));
        assert_eq!(VolumeLeveler::encode(false), (false, 0));
    }

    #[test]
    fn test_volume_leveler_requires_exact_amount() {
        assert!(VolumeLeveler::decode(true, VOLUME_LEVELER_AMOUNT));
        assert!(!VolumeLeveler::decode(true, 7));
        assert!(!VolumeLeveler::decode(true, 0));
        assert!(!VolumeLeveler::decode(false, VOLUME_LEVELER_AMOUNT));
    }
}
