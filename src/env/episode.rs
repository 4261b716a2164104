//! One bounded run of the simulation, from `reset` to `done`.
//!
//! [`Episode`] owns the workspace topology, the message logs, the agent cursor
//! and the running statistics. The dispatcher mutates it only through the
//! methods below so that unread bookkeeping and append-only logs hold for
//! scripted and agent-generated messages alike.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionRequest;
use super::task::{TaskDefinition, TaskType};
use super::workspace::{
    default_teams, default_users, Channel, ChannelIndex, ChannelSlot, Message, Team, User,
    UserStatus, AGENT_USER_ID,
};

// ---------------------------------------------------------------------------
// State records
// ---------------------------------------------------------------------------

/// Where the agent is looking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub current_team_id: String,
    pub current_channel_id: String,
    pub user_id: String,
}

/// Running counters for one episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeStats {
    pub step_count: u32,
    pub total_reward: f64,
    pub messages_sent: u32,
    pub channels_switched: u32,
    pub reactions_given: u32,
    pub calls_joined: u32,
    pub invalid_actions: u32,
    pub task_completed: bool,
}

/// One entry of the append-only action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub step: u32,
    pub action: ActionRequest,
    pub timestamp: DateTime<Utc>,
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    TaskCompleted,
    MaxStepsReached,
    TooManyInvalidActions,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCompleted => "task_completed",
            Self::MaxStepsReached => "max_steps_reached",
            Self::TooManyInvalidActions => "too_many_invalid_actions",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Episode {
    pub(crate) id: String,
    pub(crate) task: TaskDefinition,
    pub(crate) start_time: DateTime<Utc>,
    pub(crate) end_time: Option<DateTime<Utc>>,
    pub(crate) teams: Vec<Team>,
    channel_index: ChannelIndex,
    pub(crate) messages: HashMap<String, Vec<Message>>,
    pub(crate) users: Vec<User>,
    pub(crate) agent_state: AgentState,
    current_slot: ChannelSlot,
    pub(crate) stats: EpisodeStats,
    pub(crate) action_history: Vec<ActionRecord>,
    pub(crate) done: bool,
}

impl Episode {
    /// Build a fresh episode for `task`: fixed topology, seeded users, empty
    /// logs, the agent parked in the first channel, then the task's scripted
    /// primer messages.
    pub fn new(id: String, task: TaskDefinition) -> Self {
        let teams = default_teams();
        let channel_index = ChannelIndex::build(&teams);
        let messages = teams
            .iter()
            .flat_map(|team| team.channels.iter())
            .map(|channel| (channel.id.clone(), Vec::new()))
            .collect();

        let home_team = &teams[0];
        let agent_state = AgentState {
            current_team_id: home_team.id.clone(),
            current_channel_id: home_team.channels[0].id.clone(),
            user_id: AGENT_USER_ID.into(),
        };

        let mut episode = Self {
            id,
            task,
            start_time: Utc::now(),
            end_time: None,
            teams,
            channel_index,
            messages,
            users: default_users(),
            agent_state,
            current_slot: ChannelSlot {
                team: 0,
                channel: 0,
            },
            stats: EpisodeStats::default(),
            action_history: Vec::new(),
            done: false,
        };
        episode.seed_primer();
        episode
    }

    fn seed_primer(&mut self) {
        let script: &[(&str, &str, &str)] = match self.task.task_type {
            TaskType::GreetingResponse => &[
                ("channel-1", "user-1", "Hello! Welcome to the team! 👋"),
                ("channel-1", "user-2", "Hey there! How's everyone doing?"),
            ],
            TaskType::ChannelExplorer => &[
                ("channel-1", "user-1", "Check out the other channels!"),
                ("channel-2", "user-3", "Anyone up for lunch?"),
                ("channel-4", "user-2", "Dev team sync at 3pm"),
            ],
            TaskType::ActiveParticipant => &[
                ("channel-1", "user-1", "What's everyone working on today?"),
                ("channel-1", "user-2", "I'm finishing up the API docs"),
            ],
            TaskType::MeetingJoiner => &[(
                "channel-1",
                "user-1",
                "@agent Hey! We're having a quick standup, want to join?",
            )],
            TaskType::SocialButterfly => &[
                ("channel-1", "user-1", "Great work on the project! 🎉"),
                (
                    "channel-1",
                    "user-2",
                    "Thanks! Couldn't have done it without the team",
                ),
                ("channel-2", "user-3", "Pizza party tomorrow! 🍕"),
            ],
        };
        for (channel_id, user_id, content) in script {
            self.append_message(channel_id, user_id, content);
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task(&self) -> &TaskDefinition {
        &self.task
    }

    pub fn task_type(&self) -> TaskType {
        self.task.task_type
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn agent_state(&self) -> &AgentState {
        &self.agent_state
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn action_history(&self) -> &[ActionRecord] {
        &self.action_history
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// The first channel of the first team, where every episode starts.
    pub fn home_channel_id(&self) -> &str {
        &self.teams[0].channels[0].id
    }

    /// Message log of a channel; empty for unknown ids.
    pub fn messages_in(&self, channel_id: &str) -> &[Message] {
        self.messages
            .get(channel_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn channel(&self, channel_id: &str) -> Option<&Channel> {
        self.channel_index
            .get(channel_id)
            .map(|slot| &self.teams[slot.team].channels[slot.channel])
    }

    pub fn has_channel(&self, channel_id: &str) -> bool {
        self.channel_index.contains(channel_id)
    }

    pub fn current_channel(&self) -> &Channel {
        &self.teams[self.current_slot.team].channels[self.current_slot.channel]
    }

    pub fn agent_status(&self) -> Option<UserStatus> {
        self.users
            .iter()
            .find(|u| u.id == self.agent_state.user_id)
            .map(|u| u.status)
    }

    /// Wall-clock duration in milliseconds, measured to now while live.
    pub fn duration_ms(&self) -> i64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds()
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Append a message to a channel's log. A message landing outside the
    /// channel the agent is viewing bumps that channel's unread counter.
    ///
    /// Returns `None` when the channel does not exist.
    pub(crate) fn append_message(
        &mut self,
        channel_id: &str,
        user_id: &str,
        content: &str,
    ) -> Option<&Message> {
        let slot = self.channel_index.get(channel_id)?;
        if channel_id != self.agent_state.current_channel_id {
            self.teams[slot.team].channels[slot.channel].unread += 1;
        }
        let log = self.messages.entry(channel_id.to_string()).or_default();
        log.push(Message::new(channel_id, user_id, content));
        log.last()
    }

    /// Move the agent cursor onto `channel_id` and clear its unread counter.
    ///
    /// Returns `Some(true)` when the cursor moved, `Some(false)` when the agent
    /// was already there, `None` for an unknown channel.
    pub(crate) fn focus_channel(&mut self, channel_id: &str) -> Option<bool> {
        let slot = self.channel_index.get(channel_id)?;
        let team_id = self.teams[slot.team].id.clone();
        self.teams[slot.team].channels[slot.channel].unread = 0;
        self.agent_state.current_team_id = team_id;

        if self.agent_state.current_channel_id == channel_id {
            return Some(false);
        }
        self.agent_state.current_channel_id = channel_id.to_string();
        self.current_slot = slot;
        Some(true)
    }

    pub(crate) fn find_message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages
            .values_mut()
            .flat_map(|log| log.iter_mut())
            .find(|msg| msg.id == message_id)
    }

    pub(crate) fn set_agent_status(&mut self, status: UserStatus) -> bool {
        let agent_id = self.agent_state.user_id.clone();
        match self.users.iter_mut().find(|u| u.id == agent_id) {
            Some(agent) => {
                agent.status = status;
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_action(&mut self, action: ActionRequest) {
        self.action_history.push(ActionRecord {
            step: self.stats.step_count,
            action,
            timestamp: Utc::now(),
        });
    }

    /// Termination predicate, in priority order.
    pub(crate) fn termination_reason(&self, max_invalid_actions: u32) -> Option<TerminationReason> {
        if self.stats.task_completed {
            Some(TerminationReason::TaskCompleted)
        } else if self.stats.step_count >= self.task.max_steps {
            Some(TerminationReason::MaxStepsReached)
        } else if self.stats.invalid_actions >= max_invalid_actions {
            Some(TerminationReason::TooManyInvalidActions)
        } else {
            None
        }
    }

    /// Flip `done` and stamp the end time. Idempotent.
    pub(crate) fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.end_time = Some(Utc::now());
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Read-only snapshot for the agent.
    pub fn observation(&self, recent_limit: usize) -> Observation {
        let log = self.messages_in(&self.agent_state.current_channel_id);
        let recent_messages = log[log.len().saturating_sub(recent_limit)..].to_vec();

        Observation {
            episode_id: self.id.clone(),
            agent_state: self.agent_state.clone(),
            current_channel: self.current_channel().clone(),
            recent_messages,
            teams: self.teams.clone(),
            users: self.users.clone(),
            stats: self.stats.clone(),
            task: TaskStatus {
                task_type: self.task.task_type,
                name: self.task.name.into(),
                description: self.task.description.into(),
                max_steps: self.task.max_steps,
                completed: self.stats.task_completed,
            },
            timestamp: Utc::now(),
        }
    }

    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            id: self.id.clone(),
            task_type: self.task.task_type,
            completed: self.stats.task_completed,
            total_reward: self.stats.total_reward,
            steps: self.stats.step_count,
            duration_ms: self.duration_ms(),
        }
    }

    pub fn info(&self) -> EpisodeInfo {
        EpisodeInfo {
            id: self.id.clone(),
            task_type: self.task.task_type,
            task_name: self.task.name.into(),
            task_description: self.task.description.into(),
            stats: self.stats.clone(),
            done: self.done,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_ms: self.duration_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Task header inside an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub name: String,
    pub description: String,
    pub max_steps: u32,
    pub completed: bool,
}

/// What the agent sees after `reset`, after each `step`, and from `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub episode_id: String,
    pub agent_state: AgentState,
    pub current_channel: Channel,
    pub recent_messages: Vec<Message>,
    pub teams: Vec<Team>,
    pub users: Vec<User>,
    pub stats: EpisodeStats,
    pub task: TaskStatus,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.teams
            .iter()
            .flat_map(|t| t.channels.iter())
            .map(|c| c.id.as_str())
    }
}

/// Digest kept in history once an episode finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSummary {
    pub id: String,
    pub task_type: TaskType,
    pub completed: bool,
    pub total_reward: f64,
    pub steps: u32,
    pub duration_ms: i64,
}

/// Detailed view returned by `episode_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeInfo {
    pub id: String,
    pub task_type: TaskType,
    pub task_name: String,
    pub task_description: String,
    pub stats: EpisodeStats,
    pub done: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::task::TaskCatalog;

    fn episode(task_type: TaskType) -> Episode {
        let catalog = TaskCatalog::builtin();
        Episode::new("ep-test".into(), *catalog.get(task_type).unwrap())
    }

    #[test]
    fn primer_messages_bump_unread_outside_home_channel() {
        let ep = episode(TaskType::ChannelExplorer);
        assert_eq!(ep.messages_in("channel-1").len(), 1);
        assert_eq!(ep.channel("channel-1").unwrap().unread, 0);
        assert_eq!(ep.channel("channel-2").unwrap().unread, 1);
        assert_eq!(ep.channel("channel-4").unwrap().unread, 1);
        assert_eq!(ep.channel("channel-5").unwrap().unread, 0);
    }

    #[test]
    fn every_task_gets_a_primer() {
        for t in TaskType::ALL {
            let ep = episode(t);
            let total: usize = ep.messages.values().map(Vec::len).sum();
            assert!((1..=3).contains(&total), "{t}: {total} primer messages");
            assert_eq!(ep.messages.len(), 5);
        }
    }

    #[test]
    fn fresh_episode_starts_at_home() {
        let ep = episode(TaskType::MeetingJoiner);
        assert_eq!(ep.agent_state().current_team_id, "team-1");
        assert_eq!(ep.agent_state().current_channel_id, "channel-1");
        assert_eq!(ep.current_channel().id, "channel-1");
        assert_eq!(ep.stats(), &EpisodeStats::default());
        assert!(!ep.is_done());
        assert!(ep.end_time().is_none());
    }

    #[test]
    fn focus_channel_updates_cursor_and_clears_unread() {
        let mut ep = episode(TaskType::ChannelExplorer);
        assert_eq!(ep.focus_channel("channel-4"), Some(true));
        assert_eq!(ep.agent_state().current_team_id, "team-2");
        assert_eq!(ep.current_channel().id, "channel-4");
        assert_eq!(ep.channel("channel-4").unwrap().unread, 0);
        assert_eq!(ep.focus_channel("channel-4"), Some(false));
        assert_eq!(ep.focus_channel("nope"), None);
        assert_eq!(ep.current_channel().id, "channel-4");
    }

    #[test]
    fn append_to_unknown_channel_is_refused() {
        let mut ep = episode(TaskType::ActiveParticipant);
        assert!(ep.append_message("channel-42", AGENT_USER_ID, "hi").is_none());
        assert!(ep.messages_in("channel-42").is_empty());
    }

    #[test]
    fn observation_caps_recent_messages() {
        let mut ep = episode(TaskType::ActiveParticipant);
        for i in 0..15 {
            ep.append_message("channel-1", AGENT_USER_ID, &format!("msg {i}"));
        }
        let obs = ep.observation(10);
        assert_eq!(obs.recent_messages.len(), 10);
        assert_eq!(obs.recent_messages.last().unwrap().content, "msg 14");
        assert_eq!(obs.current_channel.id, "channel-1");
        assert!(!obs.task.completed);
    }

    #[test]
    fn termination_priority() {
        let mut ep = episode(TaskType::MeetingJoiner);
        assert_eq!(ep.termination_reason(5), None);
        ep.stats.invalid_actions = 5;
        ep.stats.step_count = ep.task.max_steps;
        assert_eq!(
            ep.termination_reason(5),
            Some(TerminationReason::MaxStepsReached)
        );
        ep.stats.task_completed = true;
        assert_eq!(
            ep.termination_reason(5),
            Some(TerminationReason::TaskCompleted)
        );
    }
}
