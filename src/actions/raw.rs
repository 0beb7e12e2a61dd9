use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One input source's action list as received from the protocol layer.
///
/// Individual actions stay as raw JSON; the compiler validates them field by
/// field so errors can name the offending field and index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionSequence {
    /// Device type: `none`, `key`, `pointer` or `wheel`.
    #[serde(rename = "type")]
    pub device_type: String,

    /// Device id, stable across commands.
    pub id: String,

    /// Device parameters (pointer devices only).
    #[serde(default)]
    pub parameters: Option<DeviceParameters>,

    #[serde(default)]
    pub actions: Vec<Value>,
}

/// Per-device parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceParameters {
    #[serde(rename = "pointerType", default)]
    pub pointer_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_protocol_shape() {
        let seq: ActionSequence = serde_json::from_value(json!({
            "type": "pointer",
            "id": "mouse1",
            "parameters": {"pointerType": "pen"},
            "actions": [{"type": "pause", "duration": 0}]
        }))
        .unwrap();
        assert_eq!(seq.device_type, "pointer");
        assert_eq!(
            seq.parameters.unwrap().pointer_type.as_deref(),
            Some("pen")
        );
        assert_eq!(seq.actions.len(), 1);
    }

    #[test]
    fn parameters_and_actions_are_optional() {
        let seq: ActionSequence =
            serde_json::from_value(json!({"type": "key", "id": "kb"})).unwrap();
        assert!(seq.parameters.is_none());
        assert!(seq.actions.is_empty());
    }
}
