//! Agent module: policies that drive the simulator.
//!
//! Every policy implements [`Policy`]; the [`RolloutCollector`] in
//! `trajectory` runs them against an [`Environment`].
//!
//! [`RolloutCollector`]: crate::trajectory::RolloutCollector
//! [`Environment`]: crate::env::Environment

pub mod policy;
pub mod task_policy;

pub use policy::{Policy, RandomPolicy, RuleBasedPolicy};
pub use task_policy::TaskPolicy;
