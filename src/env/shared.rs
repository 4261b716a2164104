//! Thread-safe handle for transports that serve several callers at once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::action::ActionRequest;
use super::environment::{Environment, ResetConfig, ResetResult, StepResult};
use super::episode::{EpisodeInfo, EpisodeSummary, Observation};
use super::schema::AvailableActions;
use super::task::TaskDescriptor;
use crate::error::Result;

/// A cloneable handle to one [`Environment`]. Every call takes the lock for
/// its whole duration, so concurrent `step`s on the same episode are applied
/// one at a time.
#[derive(Debug, Clone)]
pub struct SharedEnvironment {
    inner: Arc<Mutex<Environment>>,
}

impl SharedEnvironment {
    pub fn new(env: Environment) -> Self {
        Self {
            inner: Arc::new(Mutex::new(env)),
        }
    }

    /// Handlers never panic mid-mutation, so a poisoned lock still guards a
    /// consistent environment.
    fn lock(&self) -> MutexGuard<'_, Environment> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self, config: ResetConfig) -> Result<ResetResult> {
        self.lock().reset(config)
    }

    pub fn step(&self, action: &ActionRequest, episode_id: Option<&str>) -> Result<StepResult> {
        self.lock().step(action, episode_id)
    }

    pub fn state(&self, episode_id: Option<&str>) -> Result<Observation> {
        self.lock().state(episode_id)
    }

    pub fn available_actions(&self) -> AvailableActions {
        self.lock().available_actions()
    }

    pub fn episode_info(&self, episode_id: &str) -> Option<EpisodeInfo> {
        self.lock().episode_info(episode_id)
    }

    pub fn history(&self, limit: usize) -> Vec<EpisodeSummary> {
        self.lock().history(limit)
    }

    pub fn tasks(&self) -> Vec<TaskDescriptor> {
        self.lock().tasks()
    }

    /// Run `f` with exclusive access, for multi-call sequences that must not
    /// interleave with other callers.
    pub fn with<T>(&self, f: impl FnOnce(&mut Environment) -> T) -> T {
        f(&mut self.lock())
    }
}

impl From<Environment> for SharedEnvironment {
    fn from(env: Environment) -> Self {
        Self::new(env)
    }
}
