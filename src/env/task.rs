//! The task catalog: named goals with a pure completion predicate, a terminal
//! bonus and a step budget.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::episode::Episode;

/// Step window inside which the greeting reply must happen.
pub const GREETING_REPLY_WINDOW: u32 = 5;

// ---------------------------------------------------------------------------
// Task types
// ---------------------------------------------------------------------------

/// The built-in task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    GreetingResponse,
    ChannelExplorer,
    ActiveParticipant,
    MeetingJoiner,
    SocialButterfly,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        Self::GreetingResponse,
        Self::ChannelExplorer,
        Self::ActiveParticipant,
        Self::MeetingJoiner,
        Self::SocialButterfly,
    ];

    /// Catalog key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreetingResponse => "greeting_response",
            Self::ChannelExplorer => "channel_explorer",
            Self::ActiveParticipant => "active_participant",
            Self::MeetingJoiner => "meeting_joiner",
            Self::SocialButterfly => "social_butterfly",
        }
    }

    /// Exact catalog key lookup.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == key)
    }

    /// Parse a catalog key, tolerating case and `-`/space separators.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// An immutable catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct TaskDefinition {
    pub task_type: TaskType,
    pub name: &'static str,
    pub description: &'static str,
    /// Bonus added once, on the step that completes the task.
    pub reward: f64,
    pub max_steps: u32,
    predicate: fn(&Episode) -> bool,
}

impl TaskDefinition {
    /// Evaluate the completion predicate. Pure: reads the episode only.
    pub fn check_completion(&self, episode: &Episode) -> bool {
        (self.predicate)(episode)
    }

    pub fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor {
            task_type: self.task_type,
            name: self.name.into(),
            description: self.description.into(),
            max_steps: self.max_steps,
            reward: self.reward,
        }
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_type: self.task_type,
            name: self.name.into(),
            description: self.description.into(),
            max_steps: self.max_steps,
        }
    }
}

fn greeting_received_and_answered(episode: &Episode) -> bool {
    let home = episode.messages_in(episode.home_channel_id());
    let has_greeting = home.iter().any(|msg| {
        if msg.is_from_agent() {
            return false;
        }
        let content = msg.content.to_lowercase();
        ["hello", "hi", "welcome"]
            .iter()
            .any(|word| content.contains(word))
    });
    let has_reply = episode.stats.step_count <= GREETING_REPLY_WINDOW
        && home.iter().any(|msg| msg.is_from_agent());
    has_greeting && has_reply
}

fn explored_channels(episode: &Episode) -> bool {
    episode.stats.channels_switched >= 3
}

fn participated(episode: &Episode) -> bool {
    episode.stats.messages_sent >= 5
}

fn joined_call(episode: &Episode) -> bool {
    episode.stats.calls_joined >= 1
}

fn socialised(episode: &Episode) -> bool {
    episode.stats.reactions_given >= 3 && episode.stats.messages_sent >= 3
}

fn builtin_definitions() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition {
            task_type: TaskType::GreetingResponse,
            name: "Greeting Response",
            description: "Respond to a greeting message within 5 steps",
            reward: 2.0,
            max_steps: 10,
            predicate: greeting_received_and_answered,
        },
        TaskDefinition {
            task_type: TaskType::ChannelExplorer,
            name: "Channel Explorer",
            description: "Visit at least 3 different channels",
            reward: 1.5,
            max_steps: 20,
            predicate: explored_channels,
        },
        TaskDefinition {
            task_type: TaskType::ActiveParticipant,
            name: "Active Participant",
            description: "Send at least 5 relevant messages",
            reward: 2.5,
            max_steps: 30,
            predicate: participated,
        },
        TaskDefinition {
            task_type: TaskType::MeetingJoiner,
            name: "Meeting Joiner",
            description: "Join a call when invited",
            reward: 3.0,
            max_steps: 15,
            predicate: joined_call,
        },
        TaskDefinition {
            task_type: TaskType::SocialButterfly,
            name: "Social Butterfly",
            description: "React to at least 3 messages and send 3 messages",
            reward: 2.0,
            max_steps: 25,
            predicate: socialised,
        },
    ]
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Read-only registry of task definitions, in registration order.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<TaskDefinition>,
}

impl TaskCatalog {
    /// The five built-in tasks.
    pub fn builtin() -> Self {
        Self {
            tasks: builtin_definitions(),
        }
    }

    pub fn get(&self, task_type: TaskType) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.task_type == task_type)
    }

    /// Look up by exact catalog key (`"meeting_joiner"`, not `"Meeting-Joiner"`).
    pub fn get_by_key(&self, key: &str) -> Option<&TaskDefinition> {
        TaskType::from_key(key).and_then(|t| self.get(t))
    }

    pub fn list_types(&self) -> Vec<TaskType> {
        self.tasks.iter().map(|t| t.task_type).collect()
    }

    /// Uniformly pick a registered task type using the supplied RNG.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> TaskType {
        self.tasks[rng.gen_range(0..self.tasks.len())].task_type
    }

    pub fn descriptors(&self) -> Vec<TaskDescriptor> {
        self.tasks.iter().map(TaskDefinition::descriptor).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Wire views
// ---------------------------------------------------------------------------

/// Full catalog entry as returned by `tasks()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub name: String,
    pub description: String,
    pub max_steps: u32,
    pub reward: f64,
}

/// Task header returned by `reset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub name: String,
    pub description: String,
    pub max_steps: u32,
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn catalog_has_five_distinct_tasks() {
        let catalog = TaskCatalog::builtin();
        let types = catalog.list_types();
        assert_eq!(types.len(), 5);
        for t in TaskType::ALL {
            assert!(types.contains(&t));
            assert!(catalog.get(t).unwrap().max_steps > 0);
        }
    }

    #[test]
    fn loose_parsing() {
        assert_eq!(
            TaskType::from_str_loose("Channel-Explorer"),
            Some(TaskType::ChannelExplorer)
        );
        assert_eq!(
            TaskType::from_str_loose("meeting joiner"),
            Some(TaskType::MeetingJoiner)
        );
        assert_eq!(TaskType::from_str_loose("meeting_setup"), None);
    }

    #[test]
    fn catalog_keys_are_exact() {
        let catalog = TaskCatalog::builtin();
        assert_eq!(
            catalog.get_by_key("meeting_joiner").map(|t| t.task_type),
            Some(TaskType::MeetingJoiner)
        );
        assert!(catalog.get_by_key("Meeting-Joiner").is_none());
        assert!(catalog.get_by_key("meeting joiner").is_none());
        assert_eq!(TaskType::from_key("social_butterfly"), Some(TaskType::SocialButterfly));
    }

    #[test]
    fn seeded_pick_is_reproducible() {
        let catalog = TaskCatalog::builtin();
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| catalog.pick_random(&mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn pick_covers_every_task() {
        let catalog = TaskCatalog::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(catalog.pick_random(&mut rng));
        }
        assert_eq!(seen.len(), catalog.len());
    }

    #[test]
    fn descriptor_serialises_with_type_key() {
        let catalog = TaskCatalog::builtin();
        let json = serde_json::to_value(catalog.get(TaskType::MeetingJoiner).unwrap().descriptor())
            .unwrap();
        assert_eq!(json["type"], "meeting_joiner");
        assert_eq!(json["maxSteps"], 15);
        assert_eq!(json["reward"], 3.0);
    }
}
