//! Rollout collection: driving a policy through episodes.
//!
//! The [`RolloutCollector`] runs each episode by repeatedly:
//!   1. presenting the observation and action schema to the policy,
//!   2. stepping the environment with the chosen action,
//!   3. recording the transition.

use anyhow::{Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::Policy;
use crate::config::RolloutSettings;
use crate::env::{ActionRequest, Environment, ResetConfig, TaskType};
use crate::trajectory::types::{Step, Trajectory, TrajectoryMetadata};

/// Runs policies against an [`Environment`] and records trajectories.
#[derive(Debug, Clone)]
pub struct RolloutCollector {
    /// Upper bound on steps per rollout, independent of task budgets.
    step_cap: usize,
    /// Pin every episode to this task; random when `None`.
    task: Option<TaskType>,
}

impl RolloutCollector {
    pub fn new(step_cap: usize) -> Self {
        Self {
            step_cap,
            task: None,
        }
    }

    pub fn from_settings(settings: &RolloutSettings) -> Self {
        Self::new(settings.step_cap)
    }

    /// Run every episode on `task`.
    pub fn with_task(mut self, task: Option<TaskType>) -> Self {
        self.task = task;
        self
    }

    /// Collect `num_episodes` trajectories.
    pub fn collect<P>(
        &self,
        env: &mut Environment,
        policy: &mut P,
        num_episodes: usize,
    ) -> Result<Vec<Trajectory>>
    where
        P: Policy + ?Sized,
    {
        let mut trajectories = Vec::with_capacity(num_episodes);

        for ep in 0..num_episodes {
            let trajectory = self
                .run_episode(env, policy)
                .with_context(|| format!("rollout {ep} failed"))?;
            info!(
                episode = ep,
                task = %trajectory.task_type,
                steps = trajectory.steps.len(),
                reward = trajectory.total_reward,
                success = trajectory.success,
                "collected episode"
            );
            trajectories.push(trajectory);
        }

        Ok(trajectories)
    }

    /// Run a single episode from a fresh `reset`.
    pub fn run_episode<P>(&self, env: &mut Environment, policy: &mut P) -> Result<Trajectory>
    where
        P: Policy + ?Sized,
    {
        let config = match self.task {
            Some(task) => ResetConfig::with_task(task),
            None => ResetConfig::default(),
        };
        let reset = env.reset(config)?;
        let episode_id = reset.episode_id;
        let task_type = reset.task.task_type;
        policy.begin_episode(&reset.task);

        let mut steps: Vec<Step> = Vec::new();
        let mut observation = reset.state;
        let mut termination_reason = None;

        for step_index in 0..self.step_cap {
            let schema = env.available_actions();
            let action = ActionRequest::from(policy.select_action(&observation, &schema));
            let channel_id = observation.agent_state.current_channel_id.clone();

            let result = env.step(&action, Some(&episode_id))?;
            steps.push(Step {
                step_index,
                channel_id,
                action,
                reward: result.reward,
                done: result.done,
            });
            observation = result.state;

            if result.done {
                termination_reason = result.info.reason;
                break;
            }
        }

        if termination_reason.is_none() {
            warn!(
                episode = %episode_id,
                step_cap = self.step_cap,
                "rollout stopped at step cap before the episode ended"
            );
        }

        Ok(Trajectory {
            id: Uuid::new_v4().to_string(),
            episode_id,
            task_type,
            metadata: TrajectoryMetadata {
                policy: policy.name().to_string(),
                num_steps: steps.len(),
            },
            steps,
            total_reward: observation.stats.total_reward,
            success: observation.stats.task_completed,
            termination_reason,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{RandomPolicy, TaskPolicy};
    use crate::env::{Action, AvailableActions, Observation, TerminationReason, UserStatus};

    /// Always does the same harmless thing.
    struct FixedPolicy;

    impl Policy for FixedPolicy {
        fn name(&self) -> &str {
            "fixed"
        }

        fn select_action(&mut self, _obs: &Observation, _actions: &AvailableActions) -> Action {
            Action::set_status(UserStatus::Busy)
        }
    }

    #[test]
    fn task_policy_rollouts_succeed() {
        let mut env = Environment::seeded(3);
        let mut policy = TaskPolicy::new();
        let collector = RolloutCollector::new(100);

        let trajectories = collector.collect(&mut env, &mut policy, 8).unwrap();

        assert_eq!(trajectories.len(), 8);
        for t in &trajectories {
            assert!(t.success, "{} failed", t.task_type);
            assert_eq!(t.termination_reason, Some(TerminationReason::TaskCompleted));
            assert_eq!(t.metadata.policy, "task");
            assert_eq!(t.metadata.num_steps, t.steps.len());
            assert!(t.steps.last().unwrap().done);
            let summed: f64 = t.steps.iter().map(|s| s.reward).sum();
            assert!((summed - t.total_reward).abs() < 1e-9);
        }
    }

    #[test]
    fn pinned_task_runs_to_budget() {
        let mut env = Environment::seeded(3);
        let collector = RolloutCollector::new(100).with_task(Some(TaskType::MeetingJoiner));

        let t = collector.run_episode(&mut env, &mut FixedPolicy).unwrap();

        assert_eq!(t.task_type, TaskType::MeetingJoiner);
        assert!(!t.success);
        assert_eq!(t.steps.len(), 15);
        assert_eq!(t.termination_reason, Some(TerminationReason::MaxStepsReached));
        assert!(t.steps.iter().all(|s| s.channel_id == "channel-1"));
    }

    #[test]
    fn step_cap_truncates() {
        let mut env = Environment::seeded(3);
        let collector = RolloutCollector::new(4).with_task(Some(TaskType::ActiveParticipant));

        let t = collector.run_episode(&mut env, &mut FixedPolicy).unwrap();

        assert_eq!(t.steps.len(), 4);
        assert!(t.termination_reason.is_none());
        assert!(!t.steps.iter().any(|s| s.done));
    }

    #[test]
    fn boxed_policies_are_accepted() {
        let mut env = Environment::seeded(8);
        let mut policy: Box<dyn Policy> = Box::new(RandomPolicy::seeded(8));
        let trajectories = RolloutCollector::new(100)
            .collect(&mut env, policy.as_mut(), 3)
            .unwrap();
        assert_eq!(trajectories.len(), 3);
        assert!(trajectories.iter().all(|t| t.metadata.policy == "random"));
    }
}
