//! Per-session working memory: a bounded ring buffer of recent episodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub ts: DateTime<Utc>,
    pub utterance: String,
    /// Opaque snapshot of the field state at the time, stored as JSON so
    /// working memory does not depend on `common_types`' exact shape.
    pub field_snapshot: serde_json::Value,
    pub primitive_used: String,
    pub output: String,
    pub outcome_flags: Vec<String>,
    /// 0..=1, used by the eviction policy alongside novelty.
    pub emotional_salience: f32,
    /// 0..=1, how dissimilar this episode's utterance was from the one before it.
    pub novelty: f32,
}

/// Bounded per-session episode buffer. Once at capacity, the episode with
/// the lowest `emotional_salience + novelty` is evicted to make room.
pub struct WorkingMemory {
    capacity: usize,
    episodes: VecDeque<Episode>,
}

impl WorkingMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            episodes: VecDeque::new(),
        }
    }

    pub fn push(&mut self, episode: Episode) {
        if self.episodes.len() >= self.capacity {
            self.evict_one();
        }
        self.episodes.push_back(episode);
    }

    fn evict_one(&mut self) {
        let Some((idx, _)) = self
            .episodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let score_a = a.emotional_salience + a.novelty;
                let score_b = b.emotional_salience + b.novelty;
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        else {
            return;
        };
        self.episodes.remove(idx);
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn recent(&self, n: usize) -> Vec<&Episode> {
        self.episodes.iter().rev().take(n).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(id: &str, salience: f32, novelty: f32) -> Episode {
        Episode {
            id: id.to_string(),
            ts: Utc::now(),
            utterance: "hi".to_string(),
            field_snapshot: serde_json::json!({}),
            primitive_used: "ground".to_string(),
            output: "ok".to_string(),
            outcome_flags: vec![],
            emotional_salience: salience,
            novelty,
        }
    }

    #[test]
    fn evicts_lowest_combined_score_at_capacity() {
        let mut wm = WorkingMemory::new(2);
        wm.push(episode("a", 0.9, 0.9));
        wm.push(episode("b", 0.1, 0.1));
        assert_eq!(wm.len(), 2);
        wm.push(episode("c", 0.5, 0.5));
        assert_eq!(wm.len(), 2);
        let ids: Vec<&str> = wm.iter().map(|e| e.id.as_str()).collect();
        assert!(!ids.contains(&"b"));
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"c"));
    }

    #[test]
    fn recent_returns_most_recent_first() {
        let mut wm = WorkingMemory::new(5);
        wm.push(episode("a", 0.5, 0.5));
        wm.push(episode("b", 0.5, 0.5));
        let recent = wm.recent(1);
        assert_eq!(recent[0].id, "b");
    }
}
