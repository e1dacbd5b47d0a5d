use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tag carried by inbound configuration payloads.
pub const CONFIG_MESSAGE_TYPE: &str = "updateParams";
/// Tag carried by the outbound readiness notice.
pub const READY_MESSAGE_TYPE: &str = "gradioLoaded";
/// Status value of the readiness notice.
pub const READY_STATUS: &str = "ready";

/// Well-formed configuration payload, as the hosting document sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub days: i64,
    pub preferences: Vec<String>,
}

impl ConfigMessage {
    pub fn new<I, S>(days: i64, preferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message_type: CONFIG_MESSAGE_TYPE.to_string(),
            days,
            preferences: preferences.into_iter().map(Into::into).collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "type": self.message_type,
            "days": self.days,
            "preferences": self.preferences,
        })
    }
}

/// Outbound notice telling the hosting document the embedded interface
/// finished loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessNotice {
    #[serde(rename = "type")]
    pub message_type: String,
    pub status: String,
}

impl ReadinessNotice {
    pub fn ready() -> Self {
        Self {
            message_type: READY_MESSAGE_TYPE.to_string(),
            status: READY_STATUS.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "type": self.message_type,
            "status": self.status,
        })
    }
}

/// Loose extraction of a configuration payload. The tag must match exactly;
/// everything else degrades instead of failing: a missing or mis-typed day
/// count becomes `0`, a missing or mis-typed preference list becomes empty,
/// and non-string entries are skipped.
pub(crate) fn config_from_value(data: &Value) -> Option<(i64, Vec<String>)> {
    if data.get("type").and_then(Value::as_str) != Some(CONFIG_MESSAGE_TYPE) {
        return None;
    }
    let days = data.get("days").and_then(Value::as_i64).unwrap_or(0);
    let preferences = data
        .get("preferences")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some((days, preferences))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_value() {
        let message = ConfigMessage::new(5, ["Museums", "Hiking"]);
        let (days, preferences) = config_from_value(&message.to_value()).unwrap();
        assert_eq!(days, 5);
        assert_eq!(preferences, vec!["Museums", "Hiking"]);
    }

    #[test]
    fn config_requires_exact_type_tag() {
        assert!(config_from_value(&json!({ "type": "updateparams" })).is_none());
        assert!(config_from_value(&json!({ "days": 5 })).is_none());
        assert!(config_from_value(&json!("updateParams")).is_none());
    }

    #[test]
    fn config_degrades_loose_fields() {
        let (days, preferences) = config_from_value(&json!({ "type": "updateParams" })).unwrap();
        assert_eq!(days, 0);
        assert!(preferences.is_empty());

        let (days, preferences) = config_from_value(&json!({
            "type": "updateParams",
            "days": "five",
            "preferences": ["Museums", 3, null, "Hiking"],
        }))
        .unwrap();
        assert_eq!(days, 0);
        assert_eq!(preferences, vec!["Museums", "Hiking"]);
    }

    #[test]
    fn readiness_notice_shape() {
        let value = ReadinessNotice::ready().to_value();
        assert_eq!(value["type"], READY_MESSAGE_TYPE);
        assert_eq!(value["status"], READY_STATUS);
    }
}
