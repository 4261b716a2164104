//! Trajectory types and rollout collection.
//!
//! This module provides:
//! - [`types::Step`], [`types::Trajectory`], [`types::TrajectoryMetadata`] -- what
//!   happened during one episode.
//! - [`types::RolloutReport`] -- success rate and reward aggregates, overall
//!   and per task.
//! - [`collector::RolloutCollector`] -- drives a policy through episodes and
//!   records trajectories.

pub mod collector;
pub mod types;

pub use collector::RolloutCollector;
pub use types::{RolloutReport, Step, TaskBreakdown, Trajectory, TrajectoryMetadata};
