use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signaling::{
    msg::{
        AssignIdPayload, IntroducePayload, LeavePayload, SignalMsg, SignalPayload, kind,
    },
    protocol_error::ProtocolError,
    types::{Participant, PeerId},
};

/// The wire unit: `{ type, from?, to?, payload }`.
///
/// An envelope with `to` targets exactly one participant; without it the
/// frame is a broadcast, roster or system message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PeerId>,
    #[serde(default)]
    pub payload: Value,
}

impl SignalEnvelope {
    /// Parses one text frame.
    ///
    /// # Errors
    /// [`ProtocolError::Json`] when the text is not an envelope.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// # Errors
    /// [`ProtocolError::Json`] if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wraps a typed message. For `signal` frames the addressing is also
    /// lifted to the envelope so servers can route without opening payloads.
    ///
    /// # Errors
    /// [`ProtocolError::Json`] if a payload fails to serialize.
    pub fn from_msg(msg: &SignalMsg) -> Result<Self, ProtocolError> {
        let (from, to, payload) = match msg {
            SignalMsg::Introduce { name, room_id } => (
                None,
                None,
                serde_json::to_value(IntroducePayload {
                    name: name.clone(),
                    room_id: room_id.clone(),
                })?,
            ),
            SignalMsg::AssignId { id } => (
                None,
                None,
                serde_json::to_value(AssignIdPayload { id: id.clone() })?,
            ),
            SignalMsg::Participants(list) => (None, None, serde_json::to_value(list)?),
            SignalMsg::Signal(p) => (p.from.clone(), p.to.clone(), serde_json::to_value(p)?),
            SignalMsg::ChatMessage(v) => (None, None, v.clone()),
            SignalMsg::HostCommand(cmd) => (
                cmd.sender().map(str::to_owned),
                None,
                serde_json::to_value(cmd)?,
            ),
            SignalMsg::Leave { room_id } => (
                None,
                None,
                serde_json::to_value(LeavePayload {
                    room_id: room_id.clone(),
                })?,
            ),
        };
        Ok(Self {
            kind: msg.kind().to_owned(),
            from,
            to,
            payload,
        })
    }

    /// Interprets the payload according to `type`.
    ///
    /// Addressing missing from a `signal` payload is taken from the envelope.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownType`] for unrecognised kinds,
    /// [`ProtocolError::MissingField`] when a required id is absent anywhere,
    /// [`ProtocolError::Json`] when the payload has the wrong shape.
    pub fn into_msg(self) -> Result<SignalMsg, ProtocolError> {
        let SignalEnvelope {
            kind: k,
            from,
            to,
            payload,
        } = self;
        let msg = match k.as_str() {
            kind::INTRODUCE => {
                let p: IntroducePayload = serde_json::from_value(payload)?;
                SignalMsg::Introduce {
                    name: p.name,
                    room_id: p.room_id,
                }
            }
            kind::ASSIGN_ID => SignalMsg::AssignId {
                id: assigned_id(&payload).ok_or(ProtocolError::MissingField("id"))?,
            },
            kind::PARTICIPANTS => SignalMsg::Participants(roster(payload)?),
            kind::SIGNAL => {
                let mut p: SignalPayload = serde_json::from_value(payload)?;
                if p.from.is_none() {
                    p.from = from;
                }
                if p.to.is_none() {
                    p.to = to;
                }
                if p.from.is_none() {
                    return Err(ProtocolError::MissingField("from"));
                }
                SignalMsg::Signal(p)
            }
            kind::CHAT_MESSAGE => SignalMsg::ChatMessage(payload),
            kind::HOST_COMMAND => {
                let mut cmd: crate::signaling::HostCommand = serde_json::from_value(payload)?;
                if let Some(sender) = from {
                    cmd = cmd.with_sender(&sender);
                }
                if let Some(to) = to {
                    cmd = cmd.with_addressee(&to);
                }
                SignalMsg::HostCommand(cmd)
            }
            kind::LEAVE => {
                let p: LeavePayload = serde_json::from_value(payload)?;
                SignalMsg::Leave { room_id: p.room_id }
            }
            _ => return Err(ProtocolError::UnknownType(k)),
        };
        Ok(msg)
    }
}

impl SignalMsg {
    /// Decodes one text frame straight to its typed form.
    ///
    /// # Errors
    /// See [`SignalEnvelope::decode`] and [`SignalEnvelope::into_msg`].
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        SignalEnvelope::decode(text)?.into_msg()
    }

    /// # Errors
    /// See [`SignalEnvelope::from_msg`].
    pub fn encode(&self) -> Result<String, ProtocolError> {
        SignalEnvelope::from_msg(self)?.encode()
    }
}

/// `{id}` or a bare id; numeric ids are accepted and stringified.
fn assigned_id(payload: &Value) -> Option<PeerId> {
    let raw = payload.get("id").unwrap_or(payload);
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A bare array, or `{participants: [...]}`.
fn roster(payload: Value) -> Result<Vec<Participant>, ProtocolError> {
    match payload {
        Value::Object(mut map) => match map.remove("participants") {
            Some(list) => Ok(serde_json::from_value(list)?),
            None => Err(ProtocolError::MissingField("participants")),
        },
        other => Ok(serde_json::from_value(other)?),
    }
}
