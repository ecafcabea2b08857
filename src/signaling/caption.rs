use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signaling::protocol_error::ProtocolError;

/// Marker in `chat-message` payloads that carry a live caption.
pub const CAPTION_TYPE: &str = "caption";

/// One caption update from a participant's speech engine.
///
/// Interim updates (`is_final == false`) are superseded by later updates from
/// the same sender; the final one replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEvent {
    pub text: String,
    pub from: String,
    /// Milliseconds since the Unix epoch at the producer.
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<Value>,
}

impl CaptionEvent {
    /// Returns the caption carried by a chat payload, or `None` if the payload
    /// is ordinary chat or an incomplete caption.
    pub fn from_chat(payload: &Value) -> Option<Self> {
        if payload.get("type").and_then(Value::as_str) != Some(CAPTION_TYPE) {
            return None;
        }
        serde_json::from_value(payload.clone()).ok()
    }

    /// Builds the `chat-message` payload (`{type:"caption", ...}`).
    ///
    /// # Errors
    /// Only if serialization fails, which a plain struct cannot do in practice.
    pub fn to_chat_payload(&self) -> Result<Value, ProtocolError> {
        let mut v = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut v {
            map.insert("type".into(), Value::String(CAPTION_TYPE.into()));
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn recognises_caption_payloads_only() {
        let cap = json!({"type": "caption", "from": "p1", "text": "hel", "time": 10, "isFinal": false});
        let got = CaptionEvent::from_chat(&cap).unwrap();
        assert_eq!(got.from, "p1");
        assert!(!got.is_final);

        assert!(CaptionEvent::from_chat(&json!({"text": "hi", "from": "p1"})).is_none());
        assert!(CaptionEvent::from_chat(&json!({"type": "caption", "text": "x"})).is_none());
    }

    #[test]
    fn payload_carries_type_marker() {
        let ev = CaptionEvent {
            text: "hello".into(),
            from: "me".into(),
            time: 5,
            is_final: true,
            translations: Some(json!({"es": "hola"})),
        };
        let v = ev.to_chat_payload().unwrap();
        assert_eq!(v["type"], json!("caption"));
        assert_eq!(v["isFinal"], json!(true));
        assert_eq!(CaptionEvent::from_chat(&v).unwrap(), ev);
    }
}
