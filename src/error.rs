//! Caller-visible failures of the environment.
//!
//! Only lookups and reset configuration can fail. Everything that goes wrong
//! inside an action is absorbed into the step's reward and `info` instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// The requested episode id (or the implicit current episode) is unknown.
    #[error("No active episode found{}", .0.as_ref().map(|id| format!(": {id}")).unwrap_or_default())]
    EpisodeNotFound(Option<String>),

    /// `reset` was given a task type that is not in the catalog.
    #[error("Invalid reset configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EnvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_the_id() {
        let err = EnvError::EpisodeNotFound(Some("ep-9".into()));
        assert_eq!(err.to_string(), "No active episode found: ep-9");
        assert_eq!(
            EnvError::EpisodeNotFound(None).to_string(),
            "No active episode found"
        );
    }

    #[test]
    fn invalid_config_display() {
        let err = EnvError::InvalidConfig("unknown task type: bogus".into());
        assert!(err.to_string().contains("bogus"));
    }
}
