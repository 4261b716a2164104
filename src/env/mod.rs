//! The episodic collaboration-workspace simulator.
//!
//! Layers, leaves first:
//! - [`task`] -- the read-only catalog of goals and their completion predicates.
//! - [`workspace`] and [`episode`] -- the state of one run and its mutators.
//! - [`action`] and [`dispatch`] -- the action space and per-action rewards.
//! - [`store`] -- live episodes plus the bounded history of finished ones.
//! - [`environment`] -- the `reset` / `step` / query façade.
//! - [`shared`] -- a lock-guarded handle for multi-threaded callers.

pub mod action;
pub mod dispatch;
pub mod environment;
pub mod episode;
pub mod schema;
pub mod shared;
pub mod store;
pub mod task;
pub mod workspace;

pub use action::{Action, ActionKind, ActionRequest};
pub use environment::{Environment, ResetConfig, ResetResult, StepInfo, StepResult};
pub use episode::{
    AgentState, Episode, EpisodeInfo, EpisodeStats, EpisodeSummary, Observation,
    TerminationReason,
};
pub use schema::{AvailableActions, ChannelRef};
pub use shared::SharedEnvironment;
pub use task::{TaskCatalog, TaskDefinition, TaskDescriptor, TaskSummary, TaskType};
pub use workspace::{Channel, Message, Team, User, UserStatus, AGENT_USER_ID};
