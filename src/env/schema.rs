//! Static description of the action space, for agents that discover it at
//! runtime.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::action::{ActionKind, ActionRequest};
use super::episode::Episode;

/// One entry of the action schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub description: String,
    /// Field name -> human-readable shape.
    pub payload: serde_json::Value,
    pub example: ActionRequest,
}

/// A channel the agent can address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableActions {
    pub actions: Vec<ActionSpec>,
    /// Channel directory of the current episode; empty when there is none.
    pub channels: Vec<ChannelRef>,
}

impl AvailableActions {
    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.id.as_str())
    }
}

fn action_spec(kind: ActionKind) -> ActionSpec {
    let (description, payload, example) = match kind {
        ActionKind::SendMessage => (
            "Send a message to a channel",
            json!({
                "content": "string (required)",
                "channelId": "string (optional, defaults to current channel)"
            }),
            json!({"content": "Hello team!"}),
        ),
        ActionKind::SwitchChannel => (
            "Switch to a different channel",
            json!({"channelId": "string (required)"}),
            json!({"channelId": "channel-2"}),
        ),
        ActionKind::ReactToMessage => (
            "React to a message with an emoji",
            json!({
                "messageId": "string (required)",
                "reaction": "string (required)"
            }),
            json!({"messageId": "msg-123", "reaction": "👍"}),
        ),
        ActionKind::JoinCall => (
            "Join a call in a channel",
            json!({"channelId": "string (optional, defaults to current channel)"}),
            json!({}),
        ),
        ActionKind::SetStatus => (
            "Set agent status",
            json!({"status": "string (available, busy, away, dnd)"}),
            json!({"status": "available"}),
        ),
    };
    ActionSpec {
        kind,
        description: description.into(),
        payload,
        example: ActionRequest::new(kind.as_str(), example),
    }
}

/// Schema for every action kind plus the channel directory of `episode`.
pub fn available_actions(episode: Option<&Episode>) -> AvailableActions {
    let channels = episode
        .map(|ep| {
            ep.teams()
                .iter()
                .flat_map(|team| {
                    team.channels.iter().map(|ch| ChannelRef {
                        id: ch.id.clone(),
                        name: ch.name.clone(),
                        team_name: team.name.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    AvailableActions {
        actions: ActionKind::ALL.into_iter().map(action_spec).collect(),
        channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::action::Action;

    #[test]
    fn every_example_parses() {
        let schema = available_actions(None);
        assert_eq!(schema.actions.len(), 5);
        assert!(schema.channels.is_empty());
        for spec in &schema.actions {
            let action = Action::parse(&spec.example).unwrap();
            assert_eq!(action.kind(), spec.kind);
        }
    }

    #[test]
    fn serialises_type_tags() {
        let json = serde_json::to_value(available_actions(None)).unwrap();
        assert_eq!(json["actions"][0]["type"], "send_message");
        assert_eq!(json["actions"][0]["example"]["type"], "send_message");
    }
}
