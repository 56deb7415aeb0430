// Pure mapping from wire state to `SemanticState`.

use inception_api::RawAreaState;

use super::flags::AreaStateFlags;
use super::state::SemanticState;

/// Decode a status word.
///
/// Rules are checked lowest precedence first and later matches overwrite
/// earlier ones: away (`ARMED` or `AWAY_ARMED`), stay, night, alarm.
/// No match means disarmed.
pub fn decode(mask: u32) -> SemanticState {
    let flags = AreaStateFlags::from_bits_retain(mask);
    let mut state = SemanticState::Disarmed;

    if flags.intersects(AreaStateFlags::ARMED | AreaStateFlags::AWAY_ARMED) {
        state = SemanticState::AwayArmed;
    }
    if flags.contains(AreaStateFlags::STAY_ARMED) {
        state = SemanticState::StayArmed;
    }
    if flags.contains(AreaStateFlags::SLEEP_ARMED) {
        state = SemanticState::NightArmed;
    }
    if flags.contains(AreaStateFlags::ALARM) {
        state = SemanticState::AlarmTriggered;
    }

    state
}

/// Decode the boolean shape. Stay and night cannot be told apart from away.
pub fn decode_bool(armed: bool) -> SemanticState {
    if armed {
        SemanticState::AwayArmed
    } else {
        SemanticState::Disarmed
    }
}

pub fn decode_raw(raw: RawAreaState) -> SemanticState {
    match raw {
        RawAreaState::Bitmask(mask) => decode(mask),
        RawAreaState::Armed(armed) => decode_bool(armed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_beats_every_arm_mode() {
        assert_eq!(decode(0x002 | 0x200), SemanticState::AlarmTriggered);
        assert_eq!(decode(0x002 | 0x001 | 0x400), SemanticState::AlarmTriggered);
        assert_eq!(decode(0x002), SemanticState::AlarmTriggered);
    }

    #[test]
    fn night_beats_stay_beats_away() {
        assert_eq!(decode(0x200 | 0x400), SemanticState::NightArmed);
        assert_eq!(decode(0x100 | 0x200), SemanticState::StayArmed);
        assert_eq!(decode(0x001 | 0x400), SemanticState::NightArmed);
    }

    #[test]
    fn away_from_either_bit() {
        assert_eq!(decode(0x100), SemanticState::AwayArmed);
        assert_eq!(decode(0x001), SemanticState::AwayArmed);
    }

    #[test]
    fn auxiliary_bits_never_decide() {
        assert_eq!(decode(0), SemanticState::Disarmed);
        assert_eq!(decode(0x004), SemanticState::Disarmed);
        assert_eq!(decode(0x800 | 0x1000 | 0x008 | 0x010), SemanticState::Disarmed);
        assert_eq!(decode(0x100 | 0x004 | 0x080), SemanticState::AwayArmed);
    }

    #[test]
    fn decode_is_deterministic() {
        for mask in [0, 1, 2, 0x100, 0x200, 0x400, 0x602, 0x1fff, u32::MAX] {
            assert_eq!(decode(mask), decode(mask));
        }
    }

    #[test]
    fn boolean_shape() {
        assert_eq!(decode_bool(true), SemanticState::AwayArmed);
        assert_eq!(decode_bool(false), SemanticState::Disarmed);
        assert_eq!(decode_raw(RawAreaState::Armed(true)), SemanticState::AwayArmed);
        assert_eq!(decode_raw(RawAreaState::Bitmask(0x400)), SemanticState::NightArmed);
    }
}
