use serde::{Deserialize, Serialize};

use crate::models::{AreaControl, AreaId};

/// Which revision of the panel's REST API the bridge is talking to.
///
/// Determines endpoint paths, the wire shape of area state, the control
/// vocabulary, and which update transports are available. Everything that
/// varies between API revisions is answered here so the rest of the code
/// never branches on ad hoc flags.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApiDialect {
    /// Current API: bitmask area state, `control/area` endpoints,
    /// long-poll `monitor-updates` and a WebSocket update stream.
    #[default]
    V1,
    /// Older firmware: boolean `Armed` flag, `areas` endpoints, polling only.
    Legacy,
}

impl ApiDialect {
    /// The login endpoint path.
    pub fn login_path(self) -> &'static str {
        "authentication/login"
    }

    /// The area list endpoint path.
    pub fn areas_path(self) -> &'static str {
        match self {
            Self::V1 => "control/area",
            Self::Legacy => "areas",
        }
    }

    /// The single-area state endpoint path.
    pub fn area_state_path(self, id: &AreaId) -> String {
        match self {
            Self::V1 => format!("control/area/{id}/state"),
            Self::Legacy => format!("areas/{id}"),
        }
    }

    /// The area command endpoint path.
    pub fn area_activity_path(self, id: &AreaId) -> String {
        match self {
            Self::V1 => format!("control/area/{id}/activity"),
            Self::Legacy => format!("areas/{id}/activity"),
        }
    }

    /// The long-poll endpoint path.
    ///
    /// Returns `None` for [`Legacy`](Self::Legacy), which has no
    /// server-side blocking update call.
    pub fn monitor_path(self) -> Option<&'static str> {
        match self {
            Self::V1 => Some("monitor-updates"),
            Self::Legacy => None,
        }
    }

    /// The WebSocket update stream path.
    ///
    /// Returns `None` for [`Legacy`](Self::Legacy).
    pub fn stream_path(self) -> Option<&'static str> {
        match self {
            Self::V1 => Some("updates/stream"),
            Self::Legacy => None,
        }
    }

    /// The `AreaControlType` token for a control request.
    ///
    /// Total and one-to-one for every dialect.
    pub fn control_token(self, control: AreaControl) -> &'static str {
        match (self, control) {
            (Self::V1, AreaControl::AwayArm) => "AwayArm",
            (Self::Legacy, AreaControl::AwayArm) => "Arm",
            (_, AreaControl::StayArm) => "StayArm",
            (Self::V1, AreaControl::NightArm) => "SleepArm",
            (Self::Legacy, AreaControl::NightArm) => "NightArm",
            (_, AreaControl::Disarm) => "Disarm",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use super::*;

    const CONTROLS: [AreaControl; 4] = [
        AreaControl::AwayArm,
        AreaControl::StayArm,
        AreaControl::NightArm,
        AreaControl::Disarm,
    ];

    #[test]
    fn control_vocabulary_is_one_to_one() {
        for dialect in [ApiDialect::V1, ApiDialect::Legacy] {
            let tokens: HashSet<_> = CONTROLS.iter().map(|c| dialect.control_token(*c)).collect();
            assert_eq!(tokens.len(), CONTROLS.len(), "{dialect} maps two controls to one token");
        }
    }

    #[test]
    fn v1_vocabulary() {
        assert_eq!(ApiDialect::V1.control_token(AreaControl::AwayArm), "AwayArm");
        assert_eq!(ApiDialect::V1.control_token(AreaControl::NightArm), "SleepArm");
        assert_eq!(ApiDialect::Legacy.control_token(AreaControl::AwayArm), "Arm");
        assert_eq!(ApiDialect::Legacy.control_token(AreaControl::NightArm), "NightArm");
    }

    #[test]
    fn paths_embed_area_id() {
        let id = AreaId::from("a1b2");
        assert_eq!(ApiDialect::V1.area_activity_path(&id), "control/area/a1b2/activity");
        assert_eq!(ApiDialect::Legacy.area_state_path(&id), "areas/a1b2");
    }

    #[test]
    fn legacy_has_no_blocking_transports() {
        assert!(ApiDialect::Legacy.monitor_path().is_none());
        assert!(ApiDialect::Legacy.stream_path().is_none());
    }

    #[test]
    fn parses_from_config_strings() {
        assert_eq!(ApiDialect::from_str("v1").unwrap(), ApiDialect::V1);
        assert_eq!(ApiDialect::from_str("Legacy").unwrap(), ApiDialect::Legacy);
        assert!(ApiDialect::from_str("v9").is_err());
    }
}
