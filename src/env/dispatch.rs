//! Per-action handlers and reward shaping.
//!
//! Each handler validates its payload against the episode, applies its
//! mutation and returns a scalar reward. Rejections (empty message, unknown
//! channel, ...) are ordinary outcomes with a negative reward. Anything a
//! handler cannot make sense of is a [`HandlerFault`], which [`dispatch`]
//! converts into the fault penalty so the episode keeps running.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

use super::action::{
    Action, ActionParseError, ActionRequest, JoinCall, ReactToMessage, SendMessage,
    SetStatus, SwitchChannel,
};
use super::episode::Episode;
use super::task::TaskType;
use super::workspace::{Reaction, UserStatus};

// ---------------------------------------------------------------------------
// Reward table
// ---------------------------------------------------------------------------

pub const SEND_BASE: f64 = 0.1;
pub const SEND_MENTION_BONUS: f64 = 0.5;
pub const SEND_GREETING_BONUS: f64 = 0.3;
pub const SEND_DUPLICATE_PENALTY: f64 = -0.3;
pub const SEND_EMPTY_PENALTY: f64 = -0.2;
pub const SEND_TOO_LONG_PENALTY: f64 = -0.1;
pub const SEND_UNKNOWN_CHANNEL_PENALTY: f64 = -0.2;

pub const SWITCH_REWARD: f64 = 0.05;
pub const SWITCH_SAME_PENALTY: f64 = -0.1;
pub const SWITCH_MISSING_PENALTY: f64 = -0.2;
pub const SWITCH_UNKNOWN_PENALTY: f64 = -0.3;

pub const REACT_REWARD: f64 = 0.05;
pub const REACT_PENALTY: f64 = -0.2;

pub const JOIN_INVITED_REWARD: f64 = 0.5;
pub const JOIN_REWARD: f64 = 0.1;

pub const STATUS_REWARD: f64 = 0.02;
pub const STATUS_PENALTY: f64 = -0.1;

pub const UNKNOWN_ACTION_PENALTY: f64 = -0.1;
pub const FAULT_PENALTY: f64 = -0.5;

/// Messages before the new one that are searched for an `@agent` mention.
const MENTION_LOOKBACK: usize = 4;
/// Trailing messages (new one included) checked for agent repeats.
const DUPLICATE_WINDOW: usize = 3;
/// Trailing messages searched for a call invitation.
const INVITATION_LOOKBACK: usize = 5;

static GREETING_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(hello|hi|hey|greetings)\b").expect("greeting pattern is valid")
});

const CALL_KEYWORDS: [&str; 3] = ["call", "meeting", "standup"];

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Unexpected failure inside a handler.
#[derive(Error, Debug)]
pub enum HandlerFault {
    #[error(transparent)]
    MalformedPayload(ActionParseError),

    #[error("Channel not found: {0}")]
    UnknownChannel(String),

    #[error("Agent user missing from workspace")]
    AgentMissing,
}

/// What a handler decided.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outcome {
    pub reward: f64,
    pub error: Option<String>,
}

impl Outcome {
    fn ok(reward: f64) -> Self {
        Self {
            reward,
            error: None,
        }
    }

    fn rejected(reward: f64, error: impl Into<String>) -> Self {
        Self {
            reward,
            error: Some(error.into()),
        }
    }
}

/// The dispatcher's verdict on one action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Dispatched {
    pub reward: f64,
    /// `info.action` label; absent when a handler faulted.
    pub label: Option<&'static str>,
    pub error: Option<String>,
}

type HandlerResult = Result<Outcome, HandlerFault>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Interpret `request` against `episode`. Never fails: unknown types and
/// handler faults are scored and counted as invalid actions.
pub(crate) fn dispatch(
    episode: &mut Episode,
    request: &ActionRequest,
    max_message_len: usize,
) -> Dispatched {
    let action = match Action::parse(request) {
        Ok(action) => action,
        Err(err @ ActionParseError::UnknownType(_)) => {
            episode.stats.invalid_actions += 1;
            return Dispatched {
                reward: UNKNOWN_ACTION_PENALTY,
                label: Some("invalid"),
                error: Some(err.to_string()),
            };
        }
        Err(err) => return fault(episode, HandlerFault::MalformedPayload(err)),
    };

    let kind = action.kind();
    let result = match action {
        Action::SendMessage(p) => send_message(episode, p, max_message_len),
        Action::SwitchChannel(p) => switch_channel(episode, p),
        Action::ReactToMessage(p) => react_to_message(episode, p),
        Action::JoinCall(p) => join_call(episode, p),
        Action::SetStatus(p) => set_status(episode, p),
    };

    match result {
        Ok(outcome) => Dispatched {
            reward: outcome.reward,
            label: Some(kind.outcome_label()),
            error: outcome.error,
        },
        Err(err) => fault(episode, err),
    }
}

fn fault(episode: &mut Episode, err: HandlerFault) -> Dispatched {
    warn!(episode = %episode.id, error = %err, "action handler fault");
    episode.stats.invalid_actions += 1;
    Dispatched {
        reward: FAULT_PENALTY,
        label: None,
        error: Some(err.to_string()),
    }
}

/// Empty strings count as absent, like missing fields.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Post to the target channel. An unknown target is rejected with nothing
/// appended, rather than opening a fresh log for it.
fn send_message(episode: &mut Episode, p: SendMessage, max_len: usize) -> HandlerResult {
    let content = p.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Ok(Outcome::rejected(SEND_EMPTY_PENALTY, "Message content is empty"));
    }
    if content.chars().count() > max_len {
        return Ok(Outcome::rejected(
            SEND_TOO_LONG_PENALTY,
            format!("Message exceeds {max_len} characters"),
        ));
    }

    let target = present(&p.channel_id)
        .unwrap_or(episode.agent_state.current_channel_id.as_str())
        .to_string();
    let agent_id = episode.agent_state.user_id.clone();
    if episode.append_message(&target, &agent_id, &content).is_none() {
        return Ok(Outcome::rejected(
            SEND_UNKNOWN_CHANNEL_PENALTY,
            format!("Channel not found: {target}"),
        ));
    }
    episode.stats.messages_sent += 1;

    let log = episode.messages_in(&target);
    let sent_at = log.len() - 1;
    let prior = &log[sent_at.saturating_sub(MENTION_LOOKBACK)..sent_at];

    let mut reward = SEND_BASE;
    if prior
        .iter()
        .any(|msg| msg.mentions_agent() && msg.user_id != agent_id)
    {
        reward += SEND_MENTION_BONUS;
    }
    if episode.task.task_type == TaskType::GreetingResponse && GREETING_WORDS.is_match(&content) {
        reward += SEND_GREETING_BONUS;
    }

    // Spam guard: overrides every bonus, but the message still counts.
    let repeats = log[log.len().saturating_sub(DUPLICATE_WINDOW)..]
        .iter()
        .filter(|msg| msg.user_id == agent_id && msg.content == content)
        .count();
    if repeats > 1 {
        return Ok(Outcome::rejected(
            SEND_DUPLICATE_PENALTY,
            "Duplicate message",
        ));
    }

    Ok(Outcome::ok(reward))
}

fn switch_channel(episode: &mut Episode, p: SwitchChannel) -> HandlerResult {
    let Some(channel_id) = present(&p.channel_id) else {
        return Ok(Outcome::rejected(SWITCH_MISSING_PENALTY, "Missing channelId"));
    };

    Ok(match episode.focus_channel(channel_id) {
        None => Outcome::rejected(
            SWITCH_UNKNOWN_PENALTY,
            format!("Channel not found: {channel_id}"),
        ),
        Some(false) => Outcome::rejected(
            SWITCH_SAME_PENALTY,
            format!("Already in channel {channel_id}"),
        ),
        Some(true) => {
            episode.stats.channels_switched += 1;
            Outcome::ok(SWITCH_REWARD)
        }
    })
}

fn react_to_message(episode: &mut Episode, p: ReactToMessage) -> HandlerResult {
    let (Some(message_id), Some(reaction)) = (present(&p.message_id), present(&p.reaction))
    else {
        return Ok(Outcome::rejected(
            REACT_PENALTY,
            "Missing messageId or reaction",
        ));
    };

    let user_id = episode.agent_state.user_id.clone();
    let Some(message) = episode.find_message_mut(message_id) else {
        return Ok(Outcome::rejected(
            REACT_PENALTY,
            format!("Message not found: {message_id}"),
        ));
    };
    message.reactions.push(Reaction {
        user_id,
        reaction: reaction.to_string(),
        timestamp: Utc::now(),
    });
    episode.stats.reactions_given += 1;
    Ok(Outcome::ok(REACT_REWARD))
}

fn join_call(episode: &mut Episode, p: JoinCall) -> HandlerResult {
    let target = present(&p.channel_id)
        .unwrap_or(episode.agent_state.current_channel_id.as_str())
        .to_string();
    if !episode.has_channel(&target) {
        return Err(HandlerFault::UnknownChannel(target));
    }

    let log = episode.messages_in(&target);
    let invited = log[log.len().saturating_sub(INVITATION_LOOKBACK)..]
        .iter()
        .any(|msg| {
            let lower = msg.content.to_lowercase();
            msg.mentions_agent() && CALL_KEYWORDS.iter().any(|kw| lower.contains(kw))
        });

    episode.stats.calls_joined += 1;
    Ok(Outcome::ok(if invited {
        JOIN_INVITED_REWARD
    } else {
        JOIN_REWARD
    }))
}

fn set_status(episode: &mut Episode, p: SetStatus) -> HandlerResult {
    let Some(status) = p.status.as_deref().and_then(UserStatus::parse) else {
        return Ok(Outcome::rejected(
            STATUS_PENALTY,
            format!(
                "Invalid status: {}",
                p.status.as_deref().unwrap_or("<missing>")
            ),
        ));
    };
    if !episode.set_agent_status(status) {
        return Err(HandlerFault::AgentMissing);
    }
    Ok(Outcome::ok(STATUS_REWARD))
}
