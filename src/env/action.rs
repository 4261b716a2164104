//! The agent's action space.
//!
//! Callers submit an [`ActionRequest`] (`{type, payload}`, the transport form).
//! The dispatcher parses it into the closed [`Action`] sum type; an unknown
//! `type` or an undecodable payload is reported as an [`ActionParseError`]
//! and scored instead of raised.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::workspace::UserStatus;

// ---------------------------------------------------------------------------
// Transport form
// ---------------------------------------------------------------------------

/// A discriminated action request as it arrives from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ActionRequest {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

impl From<Action> for ActionRequest {
    fn from(action: Action) -> Self {
        let payload = match &action {
            Action::SendMessage(p) => serde_json::to_value(p),
            Action::SwitchChannel(p) => serde_json::to_value(p),
            Action::ReactToMessage(p) => serde_json::to_value(p),
            Action::JoinCall(p) => serde_json::to_value(p),
            Action::SetStatus(p) => serde_json::to_value(p),
        };
        Self {
            kind: action.kind().as_str().into(),
            payload: payload.unwrap_or_default(),
        }
    }
}

impl From<&Action> for ActionRequest {
    fn from(action: &Action) -> Self {
        action.clone().into()
    }
}

// ---------------------------------------------------------------------------
// Typed payloads
// ---------------------------------------------------------------------------

/// Decode an id or status field from any JSON value. A non-string survives as
/// its JSON text (`7` becomes `"7"`), which never names a real channel,
/// message or status, so the handler scores it as unresolved.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Target channel; the agent's current channel when absent.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChannel {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactToMessage {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCall {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_id: Option<String>,
}

/// Status change. Kept as a raw string so that out-of-range values are scored
/// by the handler rather than rejected during decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatus {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Action discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendMessage,
    SwitchChannel,
    ReactToMessage,
    JoinCall,
    SetStatus,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        Self::SendMessage,
        Self::SwitchChannel,
        Self::ReactToMessage,
        Self::JoinCall,
        Self::SetStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::SwitchChannel => "switch_channel",
            Self::ReactToMessage => "react_to_message",
            Self::JoinCall => "join_call",
            Self::SetStatus => "set_status",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Label reported in `info.action` when this kind is dispatched.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::SendMessage => "message_sent",
            Self::SwitchChannel => "channel_switched",
            Self::ReactToMessage => "reacted",
            Self::JoinCall => "joined_call",
            Self::SetStatus => "status_changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SendMessage(SendMessage),
    SwitchChannel(SwitchChannel),
    ReactToMessage(ReactToMessage),
    JoinCall(JoinCall),
    SetStatus(SetStatus),
}

#[derive(Error, Debug)]
pub enum ActionParseError {
    #[error("Unknown action type: {0}")]
    UnknownType(String),

    #[error("Malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn decode<T: DeserializeOwned + Default>(
    kind: ActionKind,
    payload: &serde_json::Value,
) -> Result<T, ActionParseError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    T::deserialize(payload).map_err(|source| ActionParseError::MalformedPayload {
        kind: kind.as_str(),
        source,
    })
}

impl Action {
    /// Parse a transport request into a typed action.
    pub fn parse(request: &ActionRequest) -> Result<Self, ActionParseError> {
        let kind = ActionKind::parse(&request.kind)
            .ok_or_else(|| ActionParseError::UnknownType(request.kind.clone()))?;
        let payload = &request.payload;
        Ok(match kind {
            ActionKind::SendMessage => Self::SendMessage(decode(kind, payload)?),
            ActionKind::SwitchChannel => Self::SwitchChannel(decode(kind, payload)?),
            ActionKind::ReactToMessage => Self::ReactToMessage(decode(kind, payload)?),
            ActionKind::JoinCall => Self::JoinCall(decode(kind, payload)?),
            ActionKind::SetStatus => Self::SetStatus(decode(kind, payload)?),
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::SendMessage(_) => ActionKind::SendMessage,
            Self::SwitchChannel(_) => ActionKind::SwitchChannel,
            Self::ReactToMessage(_) => ActionKind::ReactToMessage,
            Self::JoinCall(_) => ActionKind::JoinCall,
            Self::SetStatus(_) => ActionKind::SetStatus,
        }
    }

    // -- constructors -------------------------------------------------------

    /// Send `content` to the current channel.
    pub fn send_message(content: impl Into<String>) -> Self {
        Self::SendMessage(SendMessage {
            content: Some(content.into()),
            channel_id: None,
        })
    }

    pub fn send_message_to(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::SendMessage(SendMessage {
            content: Some(content.into()),
            channel_id: Some(channel_id.into()),
        })
    }

    pub fn switch_channel(channel_id: impl Into<String>) -> Self {
        Self::SwitchChannel(SwitchChannel {
            channel_id: Some(channel_id.into()),
        })
    }

    pub fn react(message_id: impl Into<String>, reaction: impl Into<String>) -> Self {
        Self::ReactToMessage(ReactToMessage {
            message_id: Some(message_id.into()),
            reaction: Some(reaction.into()),
        })
    }

    /// Join the call of the current channel.
    pub fn join_call() -> Self {
        Self::JoinCall(JoinCall::default())
    }

    pub fn set_status(status: UserStatus) -> Self {
        Self::SetStatus(SetStatus {
            status: Some(status.as_str().into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_camel_case_payloads() {
        let req: ActionRequest = serde_json::from_value(json!({
            "type": "send_message",
            "payload": {"content": "Hello team!", "channelId": "channel-2"}
        }))
        .unwrap();
        assert_eq!(
            Action::parse(&req).unwrap(),
            Action::send_message_to("channel-2", "Hello team!")
        );
    }

    #[test]
    fn missing_payload_decodes_to_empty_fields() {
        let req: ActionRequest = serde_json::from_value(json!({"type": "join_call"})).unwrap();
        assert_eq!(Action::parse(&req).unwrap(), Action::join_call());

        let req = ActionRequest::new("switch_channel", json!({}));
        assert_eq!(
            Action::parse(&req).unwrap(),
            Action::SwitchChannel(SwitchChannel { channel_id: None })
        );
    }

    #[test]
    fn unknown_type_is_reported() {
        let req = ActionRequest::new("dance", json!({}));
        let err = Action::parse(&req).unwrap_err();
        assert!(matches!(err, ActionParseError::UnknownType(ref t) if t == "dance"));
        assert_eq!(err.to_string(), "Unknown action type: dance");
    }

    #[test]
    fn wrongly_typed_field_is_malformed() {
        let req = ActionRequest::new("send_message", json!({"content": 42}));
        assert!(matches!(
            Action::parse(&req),
            Err(ActionParseError::MalformedPayload { kind: "send_message", .. })
        ));
    }

    #[test]
    fn id_fields_accept_any_json_value() {
        let req = ActionRequest::new("switch_channel", json!({"channelId": 7}));
        assert_eq!(Action::parse(&req).unwrap(), Action::switch_channel("7"));

        let req = ActionRequest::new("set_status", json!({"status": 42}));
        assert_eq!(
            Action::parse(&req).unwrap(),
            Action::SetStatus(SetStatus {
                status: Some("42".into())
            })
        );

        let req = ActionRequest::new(
            "react_to_message",
            json!({"messageId": null, "reaction": "👍"}),
        );
        assert_eq!(
            Action::parse(&req).unwrap(),
            Action::ReactToMessage(ReactToMessage {
                message_id: None,
                reaction: Some("👍".into())
            })
        );
    }

    #[test]
    fn typed_action_converts_to_request() {
        let req = ActionRequest::from(Action::react("m-1", "👍"));
        assert_eq!(req.kind, "react_to_message");
        assert_eq!(req.payload, json!({"messageId": "m-1", "reaction": "👍"}));

        let req = ActionRequest::from(Action::join_call());
        assert_eq!(req.payload, json!({}));
    }
}
