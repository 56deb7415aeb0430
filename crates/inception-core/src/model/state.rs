use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use inception_api::AreaControl;

/// Security state of an area as exposed to the accessory layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SemanticState {
    Disarmed,
    AwayArmed,
    StayArmed,
    NightArmed,
    AlarmTriggered,
}

impl SemanticState {
    pub fn is_armed(self) -> bool {
        matches!(self, Self::AwayArmed | Self::StayArmed | Self::NightArmed)
    }
}

/// State the accessory layer asks an area to move to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TargetState {
    Away,
    Stay,
    Night,
    Off,
}

impl TargetState {
    /// The observed state this target settles into once the panel obeys.
    pub fn settled(self) -> SemanticState {
        match self {
            Self::Away => SemanticState::AwayArmed,
            Self::Stay => SemanticState::StayArmed,
            Self::Night => SemanticState::NightArmed,
            Self::Off => SemanticState::Disarmed,
        }
    }
}

impl From<TargetState> for AreaControl {
    fn from(target: TargetState) -> Self {
        match target {
            TargetState::Away => Self::AwayArm,
            TargetState::Stay => Self::StayArm,
            TargetState::Night => Self::NightArm,
            TargetState::Off => Self::Disarm,
        }
    }
}
