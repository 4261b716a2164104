//! Workspace topology: teams, channels, users and the messages exchanged in them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User id of the controllable agent.
pub const AGENT_USER_ID: &str = "agent";

// ---------------------------------------------------------------------------
// Teams and channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub team_id: String,
    /// Agent-centric notification counter: messages that landed here while the
    /// agent was looking at another channel.
    pub unread: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub channels: Vec<Channel>,
}

impl Team {
    fn new(id: &str, name: &str, channels: &[(&str, &str)]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            channels: channels
                .iter()
                .map(|(channel_id, channel_name)| Channel {
                    id: (*channel_id).into(),
                    name: (*channel_name).into(),
                    team_id: id.into(),
                    unread: 0,
                })
                .collect(),
        }
    }
}

/// The fixed two-team, five-channel topology every episode starts from.
pub fn default_teams() -> Vec<Team> {
    vec![
        Team::new(
            "team-1",
            "General Team",
            &[
                ("channel-1", "General"),
                ("channel-2", "Random"),
                ("channel-3", "Announcements"),
            ],
        ),
        Team::new(
            "team-2",
            "Project Alpha",
            &[("channel-4", "Development"), ("channel-5", "Design")],
        ),
    ]
}

/// Position of a channel inside `teams`: `(team index, channel index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSlot {
    pub team: usize,
    pub channel: usize,
}

/// Channel id -> slot lookup, built once per episode since the topology never
/// changes after reset.
#[derive(Debug, Clone, Default)]
pub struct ChannelIndex {
    slots: HashMap<String, ChannelSlot>,
}

impl ChannelIndex {
    pub fn build(teams: &[Team]) -> Self {
        let mut slots = HashMap::new();
        for (team_idx, team) in teams.iter().enumerate() {
            for (channel_idx, channel) in team.channels.iter().enumerate() {
                slots.insert(
                    channel.id.clone(),
                    ChannelSlot {
                        team: team_idx,
                        channel: channel_idx,
                    },
                );
            }
        }
        Self { slots }
    }

    pub fn get(&self, channel_id: &str) -> Option<ChannelSlot> {
        self.slots.get(channel_id).copied()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.slots.contains_key(channel_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Presence states a user can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Available,
    Busy,
    Away,
    Dnd,
}

impl UserStatus {
    pub const ALL: [UserStatus; 4] = [Self::Available, Self::Busy, Self::Away, Self::Dnd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Away => "away",
            Self::Dnd => "dnd",
        }
    }

    /// Parse an exact lowercase status name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub status: UserStatus,
    pub avatar: String,
}

impl User {
    fn new(id: &str, name: &str, status: UserStatus, avatar: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            avatar: avatar.into(),
        }
    }
}

/// Three scripted coworkers plus the agent.
pub fn default_users() -> Vec<User> {
    vec![
        User::new("user-1", "Alice", UserStatus::Available, "👩"),
        User::new("user-2", "Bob", UserStatus::Busy, "👨"),
        User::new("user-3", "Charlie", UserStatus::Away, "🧑"),
        User::new(AGENT_USER_ID, "RL Agent", UserStatus::Available, "🤖"),
    ]
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: String,
    pub reaction: String,
    pub timestamp: DateTime<Utc>,
}

/// A chat message. Only `reactions` changes after the message is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Message {
    pub fn new(channel_id: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            reactions: Vec::new(),
        }
    }

    pub fn is_from_agent(&self) -> bool {
        self.user_id == AGENT_USER_ID
    }

    /// Whether the body contains an `@agent` mention (case-sensitive).
    pub fn mentions_agent(&self) -> bool {
        self.content.contains("@agent")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topology_has_five_channels_in_two_teams() {
        let teams = default_teams();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].channels.len(), 3);
        assert_eq!(teams[1].channels.len(), 2);
        assert!(teams
            .iter()
            .all(|t| t.channels.iter().all(|c| c.team_id == t.id && c.unread == 0)));
    }

    #[test]
    fn channel_index_resolves_every_channel() {
        let teams = default_teams();
        let index = ChannelIndex::build(&teams);
        assert_eq!(index.len(), 5);
        let slot = index.get("channel-4").unwrap();
        assert_eq!(teams[slot.team].channels[slot.channel].name, "Development");
        assert!(index.get("channel-9").is_none());
    }

    #[test]
    fn exactly_one_agent_user() {
        let users = default_users();
        assert_eq!(users.len(), 4);
        assert_eq!(users.iter().filter(|u| u.id == AGENT_USER_ID).count(), 1);
    }

    #[test]
    fn status_parsing_is_exact() {
        assert_eq!(UserStatus::parse("dnd"), Some(UserStatus::Dnd));
        assert_eq!(UserStatus::parse("Busy"), None);
        assert_eq!(UserStatus::parse("offline"), None);
    }
}
