//! The environment façade: `reset`, `step` and the read-only queries.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::action::ActionRequest;
use super::dispatch::dispatch;
use super::episode::{Episode, EpisodeInfo, EpisodeSummary, Observation, TerminationReason};
use super::schema::{available_actions, AvailableActions};
use super::store::EpisodeStore;
use super::task::{TaskCatalog, TaskDescriptor, TaskSummary, TaskType};
use crate::config::EnvSettings;
use crate::error::{EnvError, Result};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Options for [`Environment::reset`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetConfig {
    /// Reuse this id instead of generating one. An existing episode with the
    /// same id is replaced.
    pub episode_id: Option<String>,
    /// Catalog key; a random task is chosen when absent.
    pub task_type: Option<String>,
}

impl ResetConfig {
    pub fn with_task(task_type: TaskType) -> Self {
        Self {
            episode_id: None,
            task_type: Some(task_type.as_str().into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResult {
    pub episode_id: String,
    pub state: Observation,
    pub task: TaskSummary,
}

/// Side-channel details of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_reward: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TerminationReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub state: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// A self-contained simulator instance. Owns its catalog, episodes and RNG;
/// independent instances share nothing.
#[derive(Debug, Clone)]
pub struct Environment {
    catalog: TaskCatalog,
    store: EpisodeStore,
    settings: EnvSettings,
    rng: StdRng,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(EnvSettings::default())
    }
}

impl Environment {
    /// Create an environment. Task selection is seeded from `settings.seed`
    /// when present, otherwise from system entropy.
    pub fn new(settings: EnvSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(settings, rng)
    }

    /// Create an environment with an explicit RNG for task selection.
    pub fn with_rng(settings: EnvSettings, rng: StdRng) -> Self {
        Self {
            catalog: TaskCatalog::builtin(),
            store: EpisodeStore::new(settings.history_capacity, settings.max_finished_retained),
            settings,
            rng,
        }
    }

    /// Shorthand for a default-configured environment with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(EnvSettings {
            seed: Some(seed),
            ..EnvSettings::default()
        })
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &EnvSettings {
        &self.settings
    }

    pub fn current_episode_id(&self) -> Option<&str> {
        self.store.current_id()
    }

    /// Borrow an episode (the current one when `episode_id` is `None`).
    pub fn episode(&self, episode_id: Option<&str>) -> Option<&Episode> {
        self.store.get(episode_id)
    }

    // ------------------------------------------------------------------
    // reset
    // ------------------------------------------------------------------

    /// Start a new episode and make it current.
    pub fn reset(&mut self, config: ResetConfig) -> Result<ResetResult> {
        let task = match config.task_type.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => *self
                .catalog
                .get_by_key(key)
                .ok_or_else(|| EnvError::InvalidConfig(format!("unknown task type: {key}")))?,
            None => {
                let picked = self.catalog.pick_random(&mut self.rng);
                *self.catalog.get(picked).ok_or_else(|| {
                    EnvError::InvalidConfig(format!("task not registered: {picked}"))
                })?
            }
        };
        let task_type = task.task_type;

        let episode_id = config
            .episode_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let episode = Episode::new(episode_id.clone(), task);
        let state = episode.observation(self.settings.recent_messages);
        self.store.insert(episode);

        info!(episode = %episode_id, task = %task_type, "episode reset");

        Ok(ResetResult {
            episode_id,
            state,
            task: task.summary(),
        })
    }

    // ------------------------------------------------------------------
    // step
    // ------------------------------------------------------------------

    /// Apply one action to an episode (the current one when `episode_id` is
    /// `None`). Only an unknown episode is an error; malformed actions are
    /// scored.
    pub fn step(&mut self, action: &ActionRequest, episode_id: Option<&str>) -> Result<StepResult> {
        let recent = self.settings.recent_messages;
        let max_invalid = self.settings.max_invalid_actions;
        let max_len = self.settings.max_message_len;

        let episode = self
            .store
            .get_mut(episode_id)
            .ok_or_else(|| EnvError::EpisodeNotFound(episode_id.map(str::to_string)))?;

        if episode.done {
            return Ok(StepResult {
                state: episode.observation(recent),
                reward: 0.0,
                done: true,
                info: StepInfo {
                    error: Some("Episode already completed".into()),
                    ..StepInfo::default()
                },
            });
        }

        episode.stats.step_count += 1;
        episode.record_action(action.clone());

        let dispatched = dispatch(episode, action, max_len);
        let mut reward = dispatched.reward;
        let mut info = StepInfo {
            action: dispatched.label.map(str::to_string),
            error: dispatched.error,
            ..StepInfo::default()
        };
        episode.stats.total_reward += reward;

        if !episode.stats.task_completed && episode.task.check_completion(episode) {
            let bonus = episode.task.reward;
            episode.stats.task_completed = true;
            episode.stats.total_reward += bonus;
            reward += bonus;
            info.task_completed = Some(true);
            info.task_reward = Some(bonus);
        }

        debug!(
            episode = %episode.id,
            step = episode.stats.step_count,
            action = %action.kind,
            reward,
            "step"
        );

        let finished = match episode.termination_reason(max_invalid) {
            Some(reason) => {
                info.reason = Some(reason);
                episode.finish();
                info!(
                    episode = %episode.id,
                    task = %episode.task.task_type,
                    %reason,
                    steps = episode.stats.step_count,
                    total_reward = episode.stats.total_reward,
                    "episode finished"
                );
                Some(episode.id.clone())
            }
            None => None,
        };

        let result = StepResult {
            state: episode.observation(recent),
            reward,
            done: episode.done,
            info,
        };

        if let Some(id) = finished {
            self.store.retire(&id);
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Observation of an episode (the current one when `episode_id` is `None`).
    pub fn state(&self, episode_id: Option<&str>) -> Result<Observation> {
        self.store
            .get(episode_id)
            .map(|ep| ep.observation(self.settings.recent_messages))
            .ok_or_else(|| EnvError::EpisodeNotFound(episode_id.map(str::to_string)))
    }

    pub fn available_actions(&self) -> AvailableActions {
        available_actions(self.store.current())
    }

    /// Detailed view of an episode, `None` when unknown.
    pub fn episode_info(&self, episode_id: &str) -> Option<EpisodeInfo> {
        self.store.get(Some(episode_id)).map(Episode::info)
    }

    /// The last `limit` finished-episode summaries, most recent last.
    pub fn history(&self, limit: usize) -> Vec<EpisodeSummary> {
        self.store.history(limit)
    }

    pub fn tasks(&self) -> Vec<TaskDescriptor> {
        self.catalog.descriptors()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::env::action::Action;

    fn step(env: &mut Environment, action: Action) -> StepResult {
        env.step(&action.into(), None).unwrap()
    }

    #[test]
    fn reset_with_unknown_task_is_invalid_config() {
        let mut env = Environment::seeded(1);
        let err = env
            .reset(ResetConfig {
                episode_id: None,
                task_type: Some("meeting_setup".into()),
            })
            .unwrap_err();
        assert!(matches!(err, EnvError::InvalidConfig(_)));
        assert!(env.current_episode_id().is_none());
    }

    #[test]
    fn reset_requires_exact_catalog_keys() {
        let mut env = Environment::seeded(1);
        for key in ["Meeting-Joiner", "meeting joiner", "MEETING_JOINER"] {
            let err = env
                .reset(ResetConfig {
                    episode_id: None,
                    task_type: Some(key.into()),
                })
                .unwrap_err();
            assert!(matches!(err, EnvError::InvalidConfig(_)), "{key} accepted");
        }
        assert!(env.current_episode_id().is_none());

        let res = env
            .reset(ResetConfig {
                episode_id: None,
                task_type: Some(String::new()),
            })
            .unwrap();
        assert!(TaskType::ALL.contains(&res.task.task_type));
    }

    #[test]
    fn empty_episode_id_means_current() {
        let mut env = Environment::seeded(1);
        let id = env
            .reset(ResetConfig::with_task(TaskType::ActiveParticipant))
            .unwrap()
            .episode_id;

        let res = env.step(&Action::join_call().into(), Some("")).unwrap();
        assert_eq!(res.state.episode_id, id);
        assert_eq!(res.state.stats.step_count, 1);
        assert_eq!(env.state(Some("")).unwrap().episode_id, id);
        assert_eq!(env.episode(Some("")).unwrap().id(), id);
    }

    #[test]
    fn reset_honours_supplied_id() {
        let mut env = Environment::seeded(1);
        let res = env
            .reset(ResetConfig {
                episode_id: Some("custom-1".into()),
                task_type: Some("social_butterfly".into()),
            })
            .unwrap();
        assert_eq!(res.episode_id, "custom-1");
        assert_eq!(res.state.episode_id, "custom-1");
        assert_eq!(res.task.task_type, TaskType::SocialButterfly);
        assert_eq!(res.task.max_steps, 25);
        assert_eq!(env.current_episode_id(), Some("custom-1"));
    }

    #[test]
    fn same_seed_picks_same_tasks() {
        let run = || {
            let mut env = Environment::seeded(99);
            (0..10)
                .map(|_| env.reset(ResetConfig::default()).unwrap().task.task_type)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn step_without_episode_fails() {
        let mut env = Environment::seeded(1);
        let err = env.step(&Action::join_call().into(), None).unwrap_err();
        assert_eq!(err, EnvError::EpisodeNotFound(None));
        assert!(env.state(Some("nope")).is_err());
    }

    #[test]
    fn step_accounting_matches_action_history() {
        let mut env = Environment::seeded(1);
        env.reset(ResetConfig::with_task(TaskType::ActiveParticipant))
            .unwrap();
        step(&mut env, Action::set_status(crate::env::UserStatus::Busy));
        step(&mut env, Action::switch_channel("channel-3"));
        env.step(&ActionRequest::new("wave", json!({})), None).unwrap();
        let ep = env.episode(None).unwrap();
        assert_eq!(ep.stats().step_count, 3);
        assert_eq!(ep.action_history().len(), 3);
        assert_eq!(ep.action_history()[2].step, 3);
        assert_eq!(ep.action_history()[2].action.kind, "wave");
    }

    #[test]
    fn completion_bonus_is_paid_once_and_ends_episode() {
        let mut env = Environment::seeded(1);
        env.reset(ResetConfig::with_task(TaskType::MeetingJoiner))
            .unwrap();
        let res = step(&mut env, Action::join_call());
        assert!((res.reward - 3.5).abs() < 1e-9);
        assert!(res.done);
        assert_eq!(res.info.task_completed, Some(true));
        assert_eq!(res.info.task_reward, Some(3.0));
        assert_eq!(res.info.reason, Some(TerminationReason::TaskCompleted));
        assert!(res.state.task.completed);
        assert!((res.state.stats.total_reward - 3.5).abs() < 1e-9);
    }

    #[test]
    fn done_episode_is_a_no_op() {
        let mut env = Environment::seeded(1);
        env.reset(ResetConfig::with_task(TaskType::MeetingJoiner))
            .unwrap();
        step(&mut env, Action::join_call());
        let res = step(&mut env, Action::join_call());
        assert_eq!(res.reward, 0.0);
        assert!(res.done);
        assert_eq!(res.info.error.as_deref(), Some("Episode already completed"));
        assert_eq!(res.state.stats.step_count, 1);
        assert_eq!(res.state.stats.calls_joined, 1);
        assert_eq!(env.episode(None).unwrap().action_history().len(), 1);
        assert_eq!(env.history(10).len(), 1);
    }

    #[test]
    fn max_steps_terminates() {
        let mut env = Environment::seeded(1);
        env.reset(ResetConfig::with_task(TaskType::MeetingJoiner))
            .unwrap();
        let statuses = [crate::env::UserStatus::Busy, crate::env::UserStatus::Away];
        let mut last = None;
        for i in 0..15 {
            let res = step(&mut env, Action::set_status(statuses[i % 2]));
            assert_eq!(res.done, i == 14);
            last = Some(res);
        }
        let last = last.unwrap();
        assert_eq!(last.info.reason, Some(TerminationReason::MaxStepsReached));
        assert!(!last.state.task.completed);
    }

    #[test]
    fn state_is_idempotent() {
        let mut env = Environment::seeded(1);
        env.reset(ResetConfig::with_task(TaskType::GreetingResponse))
            .unwrap();
        let a = env.state(None).unwrap();
        let b = env.state(None).unwrap();
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.recent_messages, b.recent_messages);
        assert_eq!(a.teams, b.teams);
    }

    #[test]
    fn episode_info_and_channel_directory() {
        let mut env = Environment::seeded(1);
        assert!(env.available_actions().channels.is_empty());
        let id = env
            .reset(ResetConfig::with_task(TaskType::ChannelExplorer))
            .unwrap()
            .episode_id;
        let info = env.episode_info(&id).unwrap();
        assert_eq!(info.task_name, "Channel Explorer");
        assert!(!info.done);
        assert!(info.end_time.is_none());
        assert!(env.episode_info("missing").is_none());

        let actions = env.available_actions();
        assert_eq!(actions.channels.len(), 5);
        assert_eq!(actions.channels[3].team_name, "Project Alpha");
    }

    #[test]
    fn episodes_advance_independently() {
        let mut env = Environment::seeded(1);
        let a = env
            .reset(ResetConfig::with_task(TaskType::ActiveParticipant))
            .unwrap()
            .episode_id;
        let b = env
            .reset(ResetConfig::with_task(TaskType::ChannelExplorer))
            .unwrap()
            .episode_id;
        env.step(&Action::send_message("first").into(), Some(&a))
            .unwrap();
        env.step(&Action::switch_channel("channel-2").into(), None)
            .unwrap();
        assert_eq!(env.state(Some(&a)).unwrap().stats.messages_sent, 1);
        assert_eq!(env.state(Some(&a)).unwrap().stats.channels_switched, 0);
        assert_eq!(env.state(Some(&b)).unwrap().stats.channels_switched, 1);
    }

    #[test]
    fn tasks_lists_catalog() {
        let env = Environment::default();
        let tasks = env.tasks();
        assert_eq!(tasks.len(), 5);
        assert!(tasks
            .iter()
            .any(|t| t.task_type == TaskType::ActiveParticipant && t.reward == 2.5));
    }
}
