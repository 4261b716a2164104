//! Ownership of live episodes plus the bounded history of finished ones.

use std::collections::{HashMap, VecDeque};

use super::episode::{Episode, EpisodeSummary};

/// Keyed episode collection with a "current" pointer.
///
/// Finished episodes stay addressable so callers can still observe them, but
/// once more than `max_finished_retained` finished episodes are held the
/// oldest one (never the current one) is dropped. Only its summary survives,
/// in the history ring.
#[derive(Debug, Clone)]
pub struct EpisodeStore {
    episodes: HashMap<String, Episode>,
    current: Option<String>,
    /// Ids of finished episodes still held, oldest first.
    finished: VecDeque<String>,
    max_finished_retained: usize,
    history: VecDeque<EpisodeSummary>,
    history_capacity: usize,
}

impl EpisodeStore {
    pub fn new(history_capacity: usize, max_finished_retained: usize) -> Self {
        Self {
            episodes: HashMap::new(),
            current: None,
            finished: VecDeque::new(),
            max_finished_retained,
            history: VecDeque::with_capacity(history_capacity.min(1024)),
            history_capacity,
        }
    }

    /// Insert (or replace) an episode and make it current.
    pub fn insert(&mut self, episode: Episode) {
        let id = episode.id().to_string();
        self.finished.retain(|f| f != &id);
        self.episodes.insert(id.clone(), episode);
        self.current = Some(id);
    }

    /// Resolve an explicit id, or the current episode when `None` or empty.
    pub fn resolve_id<'a>(&'a self, id: Option<&'a str>) -> Option<&'a str> {
        id.filter(|s| !s.is_empty()).or(self.current.as_deref())
    }

    pub fn get(&self, id: Option<&str>) -> Option<&Episode> {
        let id = self.resolve_id(id)?;
        self.episodes.get(id)
    }

    pub fn get_mut(&mut self, id: Option<&str>) -> Option<&mut Episode> {
        let id = self.resolve_id(id)?.to_string();
        self.episodes.get_mut(&id)
    }

    pub fn current(&self) -> Option<&Episode> {
        self.get(None)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Record that `id` just finished: push its summary into history and
    /// evict the oldest finished episodes beyond the retention limit.
    pub fn retire(&mut self, id: &str) {
        let Some(episode) = self.episodes.get(id) else {
            return;
        };
        self.history.push_back(episode.summary());
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }

        self.finished.push_back(id.to_string());
        while self.finished.len() > self.max_finished_retained {
            let Some(pos) = self
                .finished
                .iter()
                .position(|f| Some(f.as_str()) != self.current.as_deref())
            else {
                break;
            };
            if let Some(evicted) = self.finished.remove(pos) {
                self.episodes.remove(&evicted);
            }
        }
    }

    /// The last `limit` summaries, most recent last.
    pub fn history(&self, limit: usize) -> Vec<EpisodeSummary> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}
