//! Policies that choose the agent's next action from an observation.
//!
//! [`RandomPolicy`] is the exploration baseline; [`RuleBasedPolicy`] follows a
//! fixed priority of workplace habits without looking at the task.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::env::{Action, AvailableActions, Observation, TaskSummary, UserStatus};

/// Anything that can drive the agent through an episode.
pub trait Policy {
    /// Short label written into trajectory metadata.
    fn name(&self) -> &str;

    /// Called after `reset`, before the first action. Default: no-op.
    fn begin_episode(&mut self, _task: &TaskSummary) {}

    /// Choose the next action.
    fn select_action(&mut self, observation: &Observation, actions: &AvailableActions) -> Action;
}

const CANNED_MESSAGES: [&str; 6] = [
    "Hello team!",
    "How's everyone doing?",
    "Great work today!",
    "Anyone available for a quick sync?",
    "Thanks for the update!",
    "LGTM 👍",
];

const REACTIONS: [&str; 4] = ["👍", "❤️", "😊", "🎉"];

// ---------------------------------------------------------------------------
// Random baseline
// ---------------------------------------------------------------------------

/// Uniformly random, always well-formed actions.
#[derive(Debug, Clone)]
pub struct RandomPolicy<R = StdRng> {
    rng: R,
}

impl RandomPolicy<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomPolicy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn random_message(&mut self) -> Action {
        let content = CANNED_MESSAGES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("Hello team!");
        Action::send_message(content)
    }
}

impl<R: Rng> Policy for RandomPolicy<R> {
    fn name(&self) -> &str {
        "random"
    }

    fn select_action(&mut self, observation: &Observation, actions: &AvailableActions) -> Action {
        match self.rng.gen_range(0..5) {
            0 => self.random_message(),
            1 => {
                let channels: Vec<&str> = actions.channel_ids().collect();
                match channels.choose(&mut self.rng) {
                    Some(id) => Action::switch_channel(*id),
                    None => self.random_message(),
                }
            }
            2 => Action::join_call(),
            3 => match observation.recent_messages.choose(&mut self.rng) {
                Some(msg) => {
                    let reaction = REACTIONS.choose(&mut self.rng).copied().unwrap_or("👍");
                    Action::react(msg.id.clone(), reaction)
                }
                None => self.random_message(),
            },
            _ => {
                let status = UserStatus::ALL
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(UserStatus::Available);
                Action::set_status(status)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rule-based
// ---------------------------------------------------------------------------

const CHECK_IN_MESSAGES: [&str; 4] = [
    "Checking in! How can I help?",
    "Anyone need assistance?",
    "Updates from the team?",
    "All good here! 👍",
];

/// Priority rules:
/// 1. answer an `@agent` mention that arrived after the agent last spoke,
/// 2. jump to a channel with unread messages,
/// 3. post a check-in every `check_in_interval` steps,
/// 4. otherwise wander to a random other channel.
#[derive(Debug, Clone)]
pub struct RuleBasedPolicy<R = StdRng> {
    rng: R,
    check_in_interval: usize,
    steps_since_message: usize,
}

impl RuleBasedPolicy<StdRng> {
    pub fn seeded(seed: u64, check_in_interval: usize) -> Self {
        Self::new(StdRng::seed_from_u64(seed), check_in_interval)
    }
}

impl<R: Rng> RuleBasedPolicy<R> {
    pub fn new(rng: R, check_in_interval: usize) -> Self {
        Self {
            rng,
            check_in_interval: check_in_interval.max(1),
            steps_since_message: 0,
        }
    }

    fn unanswered_mention(observation: &Observation) -> bool {
        observation
            .recent_messages
            .iter()
            .rev()
            .take_while(|msg| msg.user_id != observation.agent_state.user_id)
            .any(|msg| msg.content.contains(&format!("@{}", observation.agent_state.user_id)))
    }
}

impl<R: Rng> Policy for RuleBasedPolicy<R> {
    fn name(&self) -> &str {
        "rule"
    }

    fn begin_episode(&mut self, _task: &TaskSummary) {
        self.steps_since_message = 0;
    }

    fn select_action(&mut self, observation: &Observation, _actions: &AvailableActions) -> Action {
        if Self::unanswered_mention(observation) {
            self.steps_since_message = 0;
            return Action::send_message("Thanks for the mention! I'm here to help.");
        }

        let unread = observation
            .teams
            .iter()
            .flat_map(|t| t.channels.iter())
            .find(|c| c.unread > 0);
        if let Some(channel) = unread {
            return Action::switch_channel(channel.id.clone());
        }

        self.steps_since_message += 1;
        if self.steps_since_message >= self.check_in_interval {
            self.steps_since_message = 0;
            let content = CHECK_IN_MESSAGES
                .choose(&mut self.rng)
                .copied()
                .unwrap_or("Checking in! How can I help?");
            return Action::send_message(content);
        }

        let current = observation.agent_state.current_channel_id.as_str();
        let others: Vec<&str> = observation.channel_ids().filter(|id| *id != current).collect();
        match others.choose(&mut self.rng) {
            Some(id) => Action::switch_channel(*id),
            None => Action::send_message("Staying active in the channel!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Environment, ResetConfig, TaskType};

    fn run_episode(policy: &mut dyn Policy, env: &mut Environment, task: TaskType) -> u32 {
        let reset = env.reset(ResetConfig::with_task(task)).unwrap();
        policy.begin_episode(&reset.task);
        let mut obs = reset.state;
        loop {
            let action = policy.select_action(&obs, &env.available_actions());
            let res = env.step(&action.into(), None).unwrap();
            obs = res.state;
            if res.done {
                return obs.stats.invalid_actions;
            }
        }
    }

    #[test]
    fn random_policy_only_emits_valid_action_kinds() {
        let mut env = Environment::seeded(11);
        let mut policy = RandomPolicy::seeded(11);
        for task in TaskType::ALL {
            assert_eq!(run_episode(&mut policy, &mut env, task), 0);
        }
        assert_eq!(env.history(10).len(), 5);
    }

    #[test]
    fn rule_policy_answers_mentions_first() {
        let mut env = Environment::seeded(2);
        let reset = env
            .reset(ResetConfig::with_task(TaskType::MeetingJoiner))
            .unwrap();
        let mut policy = RuleBasedPolicy::seeded(2, 5);
        let action = policy.select_action(&reset.state, &env.available_actions());
        assert!(matches!(action, Action::SendMessage(_)));

        let res = env.step(&action.into(), None).unwrap();
        let next = policy.select_action(&res.state, &env.available_actions());
        assert!(!matches!(next, Action::SendMessage(_)));
    }

    #[test]
    fn rule_policy_visits_unread_channels() {
        let mut env = Environment::seeded(2);
        let reset = env
            .reset(ResetConfig::with_task(TaskType::ChannelExplorer))
            .unwrap();
        let mut policy = RuleBasedPolicy::seeded(2, 5);
        let action = policy.select_action(&reset.state, &env.available_actions());
        assert_eq!(action, Action::switch_channel("channel-2"));
    }

    #[test]
    fn rule_policy_finishes_within_budget() {
        let mut env = Environment::seeded(4);
        let mut policy = RuleBasedPolicy::seeded(4, 3);
        for task in TaskType::ALL {
            run_episode(&mut policy, &mut env, task);
            let summary = env.history(1).pop().unwrap();
            let budget = env.catalog().get(task).unwrap().max_steps;
            assert!(summary.steps <= budget);
        }
    }
}
