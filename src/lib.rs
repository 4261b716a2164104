//! teamsim: an episodic collaboration-workspace simulator for RL agents.
//!
//! An agent is dropped into a small chat workspace (teams, channels, users,
//! messages) and given one goal from a fixed task catalog. It acts through a
//! `reset` / `step` contract and receives shaped per-action rewards plus a
//! terminal bonus when the goal is met.
//!
//! - [`env`] -- the simulator itself and its JSON-friendly request/response types.
//! - [`agent`] -- baseline policies that drive it.
//! - [`trajectory`] -- rollout collection and reporting.

pub mod agent;
pub mod config;
pub mod env;
pub mod error;
pub mod trajectory;
