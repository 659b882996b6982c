//! Per-session state shared by memory, lifecycle, and the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::field::Language;

pub const DEFAULT_RESPONSE_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub subject_id: String,
    pub turn: u32,
    pub language: Language,
    pub recent_responses: VecDeque<String>,
    pub response_history_limit: usize,
    /// Last <=10 utterances, most recent last; used for loop detection.
    pub history: VecDeque<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self::with_history_limit(id, subject_id, DEFAULT_RESPONSE_HISTORY_LIMIT)
    }

    pub fn with_history_limit(
        id: impl Into<String>,
        subject_id: impl Into<String>,
        response_history_limit: usize,
    ) -> Self {
        Self {
            id: id.into(),
            subject_id: subject_id.into(),
            turn: 0,
            language: Language::default(),
            recent_responses: VecDeque::new(),
            response_history_limit: response_history_limit.max(1),
            history: VecDeque::new(),
        }
    }

    pub fn record_utterance(&mut self, utterance: &str) {
        self.history.push_back(utterance.to_string());
        while self.history.len() > 10 {
            self.history.pop_front();
        }
    }

    pub fn record_response(&mut self, response: &str) {
        self.recent_responses.push_back(response.to_string());
        while self.recent_responses.len() > self.response_history_limit {
            self.recent_responses.pop_front();
        }
    }

    pub fn begin_turn(&mut self) -> u32 {
        self.turn += 1;
        self.turn
    }
}

/// Per-session dissipation state (component J).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LifecycleState {
    pub potency: f32,
    pub withdrawal_bias: f32,
    pub cycle_count: u32,
    pub force_exit_triggered: bool,
    pub autonomy_trajectory: f32,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            potency: 1.0,
            withdrawal_bias: 0.0,
            cycle_count: 0,
            force_exit_triggered: false,
            autonomy_trajectory: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_responses_respects_limit() {
        let mut s = Session::with_history_limit("s1", "subj1", 5);
        for i in 0..8 {
            s.record_response(&format!("Response {i}"));
        }
        assert_eq!(s.recent_responses.len(), 5);
        assert!(!s.recent_responses.contains(&"Response 0".to_string()));
        assert!(!s.recent_responses.contains(&"Response 1".to_string()));
    }

    #[test]
    fn history_caps_at_ten() {
        let mut s = Session::new("s1", "subj1");
        for i in 0..15 {
            s.record_utterance(&format!("utterance {i}"));
        }
        assert_eq!(s.history.len(), 10);
    }
}
