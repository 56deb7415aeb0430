// Wire types for the panel REST API.
//
// Field names follow the panel's PascalCase JSON; everything here is a
// faithful mirror of the payloads. Domain meaning (what a bitmask *is*)
// lives in inception-core.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ── AreaId ──────────────────────────────────────────────────────────

/// Stable identifier of a panel area.
///
/// The panel sends GUID strings on current firmware and small integers on
/// older firmware; both are kept as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AreaId(String);

impl AreaId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AreaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AreaId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<u64> for AreaId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for AreaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self::from(n),
        })
    }
}

// ── Area state ──────────────────────────────────────────────────────

/// Area state as delivered on the wire, before decoding.
///
/// Two incompatible shapes exist across API revisions; both are normalized
/// into this enum before anything else looks at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawAreaState {
    /// Status word with one bit per condition.
    Bitmask(u32),
    /// Plain armed/disarmed flag.
    Armed(bool),
}

/// State fields that may appear on any area-bearing payload.
///
/// Each name is kept as its own field because current firmware sends
/// `stateValue` and `PublicState` side by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaStateFields {
    #[serde(rename = "State", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u32>,
    #[serde(rename = "stateValue", default, skip_serializing_if = "Option::is_none")]
    pub state_value: Option<u32>,
    #[serde(rename = "PublicState", default, skip_serializing_if = "Option::is_none")]
    pub public_state: Option<u32>,
    #[serde(rename = "Armed", default, skip_serializing_if = "Option::is_none")]
    pub armed: Option<bool>,
}

impl AreaStateFields {
    /// Normalize into a [`RawAreaState`].
    ///
    /// A bitmask wins over the boolean flag when both are present; the
    /// first bitmask field found in `State`, `stateValue`, `PublicState`
    /// order is used.
    pub fn raw(&self) -> Option<RawAreaState> {
        self.state
            .or(self.state_value)
            .or(self.public_state)
            .map(RawAreaState::Bitmask)
            .or_else(|| self.armed.map(RawAreaState::Armed))
    }
}

/// One entry of the area list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSummary {
    #[serde(rename = "ID")]
    pub id: AreaId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(flatten)]
    pub state: AreaStateFields,
}

/// Body of the single-area state endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AreaStateBody {
    #[serde(rename = "ID", default)]
    #[allow(dead_code)]
    pub id: Option<AreaId>,
    #[serde(flatten)]
    pub state: AreaStateFields,
}

// ── Updates (long-poll + stream) ────────────────────────────────────

/// A single area update inside a long-poll or stream batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaUpdate {
    #[serde(rename = "ID", alias = "AreaId")]
    pub id: AreaId,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub state: AreaStateFields,
}

/// A batch of updates plus the panel's cursor for the next request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBatch {
    #[serde(rename = "updateTime", default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<u64>,
    #[serde(rename = "stateData", default)]
    pub updates: Vec<AreaUpdate>,
}

impl UpdateBatch {
    /// The most recent update for `area`, if the batch carries one.
    ///
    /// Batches are ordered oldest first, so the last match wins.
    pub fn latest_for(&self, area: &AreaId) -> Option<&AreaUpdate> {
        self.updates.iter().rev().find(|u| &u.id == area)
    }
}

/// Envelope returned by the long-poll endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct MonitorResponse {
    #[serde(rename = "ID", default)]
    #[allow(dead_code)]
    pub id: Option<String>,
    #[serde(rename = "Result")]
    pub result: UpdateBatch,
}

/// Request item for the long-poll endpoint and the stream subscription.
#[derive(Debug, Serialize)]
pub(crate) struct MonitorRequest {
    #[serde(rename = "ID")]
    pub id: &'static str,
    #[serde(rename = "RequestType")]
    pub request_type: &'static str,
    #[serde(rename = "InputData")]
    pub input: MonitorInput,
}

#[derive(Debug, Serialize)]
pub(crate) struct MonitorInput {
    #[serde(rename = "stateType")]
    pub state_type: &'static str,
    #[serde(rename = "timeSinceUpdate")]
    pub time_since_update: String,
}

impl MonitorRequest {
    /// Subscription for area state changes newer than `cursor`.
    pub(crate) fn area_state(cursor: u64) -> Vec<Self> {
        vec![Self {
            id: "AreaStateRequest",
            request_type: "AreaState",
            input: MonitorInput {
                state_type: "AreaState",
                time_since_update: cursor.to_string(),
            },
        }]
    }
}

// ── Control ─────────────────────────────────────────────────────────

/// Panel-neutral area command. The dialect maps it to its own token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaControl {
    AwayArm,
    StayArm,
    NightArm,
    Disarm,
}

/// Body of an area command request.
#[derive(Debug, Serialize)]
pub(crate) struct ControlRequest {
    #[serde(rename = "Type")]
    pub kind: &'static str,
    #[serde(rename = "AreaControlType")]
    pub control: &'static str,
}

/// `{"Result": "Success", "Message": "..."}` status block.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseStatus {
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

impl ResponseStatus {
    pub(crate) fn is_success(&self) -> bool {
        self.result.eq_ignore_ascii_case("success")
    }
}

/// Status indicators the panel uses on command and login responses.
///
/// Different firmware revisions report success differently; any one of
/// the three indicators is accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StatusIndicators {
    #[serde(rename = "Response", default)]
    pub response: Option<ResponseStatus>,
    #[serde(rename = "Result", default)]
    pub result: Option<serde_json::Value>,
    #[serde(rename = "Success", default)]
    pub success: Option<bool>,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

impl StatusIndicators {
    /// `Some(Ok(()))` on an explicit success indicator, `Some(Err(msg))` on
    /// an explicit failure, `None` when the body carries no indicator.
    pub(crate) fn outcome(&self) -> Option<Result<(), String>> {
        let failure = |fallback: &str| {
            self.message
                .clone()
                .unwrap_or_else(|| fallback.to_owned())
        };

        if let Some(ref status) = self.response {
            return Some(if status.is_success() {
                Ok(())
            } else {
                Err(status
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Result={}", status.result)))
            });
        }

        if let Some(serde_json::Value::String(ref result)) = self.result {
            return Some(if result.eq_ignore_ascii_case("success") {
                Ok(())
            } else {
                Err(failure(&format!("Result={result}")))
            });
        }

        self.success
            .map(|ok| if ok { Ok(()) } else { Err(failure("Success=false")) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn area_id_accepts_strings_and_numbers() {
        let a: AreaId = serde_json::from_value(json!("9d1c-77")).unwrap();
        let b: AreaId = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(a.as_str(), "9d1c-77");
        assert_eq!(b, AreaId::from("7"));
    }

    #[test]
    fn area_summary_with_bitmask() {
        let area: AreaSummary =
            serde_json::from_value(json!({"ID": "x1", "Name": "Home", "State": 257})).unwrap();
        assert_eq!(area.name, "Home");
        assert_eq!(area.state.raw(), Some(RawAreaState::Bitmask(257)));
    }

    #[test]
    fn area_summary_with_boolean() {
        let area: AreaSummary =
            serde_json::from_value(json!({"ID": 3, "Name": "Office", "Armed": true})).unwrap();
        assert_eq!(area.id, AreaId::from(3));
        assert_eq!(area.state.raw(), Some(RawAreaState::Armed(true)));
    }

    #[test]
    fn bitmask_wins_over_boolean() {
        let fields = AreaStateFields {
            public_state: Some(2),
            armed: Some(false),
            ..AreaStateFields::default()
        };
        assert_eq!(fields.raw(), Some(RawAreaState::Bitmask(2)));
    }

    #[test]
    fn missing_state_is_none() {
        assert_eq!(AreaStateFields::default().raw(), None);
    }

    #[test]
    fn update_with_both_state_fields() {
        let update: AreaUpdate = serde_json::from_value(json!({
            "ID": "a",
            "stateValue": 1024,
            "PublicState": 4
        }))
        .unwrap();
        assert_eq!(update.state.raw(), Some(RawAreaState::Bitmask(1024)));
    }

    #[test]
    fn latest_update_for_area_wins() {
        let batch: UpdateBatch = serde_json::from_value(json!({
            "updateTime": 88,
            "stateData": [
                {"ID": "a", "stateValue": 1},
                {"ID": "b", "stateValue": 2},
                {"ID": "a", "stateValue": 2048}
            ]
        }))
        .unwrap();
        let latest = batch.latest_for(&AreaId::from("a")).unwrap();
        assert_eq!(latest.state.raw(), Some(RawAreaState::Bitmask(2048)));
        assert!(batch.latest_for(&AreaId::from("z")).is_none());
    }

    #[test]
    fn monitor_request_shape() {
        let body = serde_json::to_value(MonitorRequest::area_state(42)).unwrap();
        assert_eq!(
            body,
            json!([{
                "ID": "AreaStateRequest",
                "RequestType": "AreaState",
                "InputData": {"stateType": "AreaState", "timeSinceUpdate": "42"}
            }])
        );
    }

    #[test]
    fn status_indicator_variants() {
        let nested: StatusIndicators =
            serde_json::from_value(json!({"Response": {"Result": "Success", "Message": "OK"}}))
                .unwrap();
        assert_eq!(nested.outcome(), Some(Ok(())));

        let nested_fail: StatusIndicators = serde_json::from_value(
            json!({"Response": {"Result": "Failure", "Message": "Area not ready"}}),
        )
        .unwrap();
        assert_eq!(nested_fail.outcome(), Some(Err("Area not ready".into())));

        let flat: StatusIndicators =
            serde_json::from_value(json!({"Result": "Success"})).unwrap();
        assert_eq!(flat.outcome(), Some(Ok(())));

        let boolean: StatusIndicators =
            serde_json::from_value(json!({"Success": false, "Message": "denied"})).unwrap();
        assert_eq!(boolean.outcome(), Some(Err("denied".into())));

        let silent: StatusIndicators = serde_json::from_value(json!({"Other": 1})).unwrap();
        assert_eq!(silent.outcome(), None);
    }
}
