//! Trajectory data types: what happened during one rollout, and aggregates
//! over many.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::{ActionRequest, TaskType, TerminationReason};

// ---------------------------------------------------------------------------
// Single step
// ---------------------------------------------------------------------------

/// A single transition within a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Zero-based index of this step within the trajectory.
    pub step_index: usize,
    /// Channel the agent was viewing when it chose the action.
    pub channel_id: String,
    /// The action exactly as it was sent to the environment.
    pub action: ActionRequest,
    pub reward: f64,
    pub done: bool,
}

// ---------------------------------------------------------------------------
// Trajectory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryMetadata {
    /// Name of the policy that produced the trajectory.
    pub policy: String,
    /// Same as `steps.len()`.
    pub num_steps: usize,
}

/// One episode of policy-environment interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    /// Unique identifier (UUID v4), distinct from the episode id.
    pub id: String,
    pub episode_id: String,
    pub task_type: TaskType,
    pub steps: Vec<Step>,
    /// Sum of step rewards, completion bonus included.
    pub total_reward: f64,
    /// Whether the task was completed.
    pub success: bool,
    /// `None` when the rollout hit the collector's step cap first.
    pub termination_reason: Option<TerminationReason>,
    pub metadata: TrajectoryMetadata,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Per-task slice of a [`RolloutReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBreakdown {
    pub episodes: usize,
    pub successes: usize,
    pub mean_reward: f64,
    pub mean_steps: f64,
}

/// Aggregate statistics over a set of trajectories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutReport {
    pub policy: String,
    pub episodes: usize,
    pub successes: usize,
    pub success_rate: f64,
    pub mean_reward: f64,
    pub mean_steps: f64,
    /// Keyed by catalog key, so the map orders deterministically.
    pub per_task: BTreeMap<String, TaskBreakdown>,
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

impl RolloutReport {
    pub fn from_trajectories(policy: &str, trajectories: &[Trajectory]) -> Self {
        let episodes = trajectories.len();
        let successes = trajectories.iter().filter(|t| t.success).count();
        let reward_sum: f64 = trajectories.iter().map(|t| t.total_reward).sum();
        let step_sum: usize = trajectories.iter().map(|t| t.steps.len()).sum();

        // Accumulate sums first, then turn them into means.
        let mut per_task: BTreeMap<String, TaskBreakdown> = BTreeMap::new();
        for t in trajectories {
            let entry = per_task.entry(t.task_type.as_str().to_string()).or_default();
            entry.episodes += 1;
            entry.successes += usize::from(t.success);
            entry.mean_reward += t.total_reward;
            entry.mean_steps += t.steps.len() as f64;
        }
        for entry in per_task.values_mut() {
            entry.mean_reward = mean(entry.mean_reward, entry.episodes);
            entry.mean_steps = mean(entry.mean_steps, entry.episodes);
        }

        Self {
            policy: policy.to_string(),
            episodes,
            successes,
            success_rate: mean(successes as f64, episodes),
            mean_reward: mean(reward_sum, episodes),
            mean_steps: mean(step_sum as f64, episodes),
            per_task,
        }
    }
}

impl fmt::Display for RolloutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "policy={} episodes={} success_rate={:.2} mean_reward={:.3} mean_steps={:.1}",
            self.policy, self.episodes, self.success_rate, self.mean_reward, self.mean_steps
        )?;
        for (task, b) in &self.per_task {
            writeln!(
                f,
                "  {task:<20} {}/{} succeeded  mean_reward={:.3}  mean_steps={:.1}",
                b.successes, b.episodes, b.mean_reward, b.mean_steps
            )?;
        }
        Ok(())
    }
}
