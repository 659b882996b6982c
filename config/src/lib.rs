//! Environment-driven pipeline configuration (SPEC_FULL §4.P).
//!
//! Mirrors the teacher's env-tunable-knob pattern: every value has a
//! hardcoded default, is overridable via an env var, and is parsed once at
//! startup rather than re-read per turn.

use dotenvy::dotenv;
use std::collections::HashMap;

/// Which bridge contributors run for a given deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributorProfile {
    Minimal,
    Standard,
    Full,
}

impl ContributorProfile {
    fn from_env_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => ContributorProfile::Minimal,
            "full" => ContributorProfile::Full,
            _ => ContributorProfile::Standard,
        }
    }

    /// Ordered contributor names enabled at this profile; standard and full
    /// both run the full list — minimal runs only the contributors the
    /// commit step treats as load-bearing (memory, delegation prediction).
    pub fn enabled_contributors(self) -> &'static [&'static str] {
        match self {
            ContributorProfile::Minimal => &["memory", "delegation_predictor"],
            ContributorProfile::Standard => &[
                "memory",
                "delegation_predictor",
                "metacognitive",
                "temporal",
                "lifecycle_policy",
            ],
            ContributorProfile::Full => &[
                "memory",
                "delegation_predictor",
                "metacognitive",
                "temporal",
                "lifecycle_policy",
                "swarm_veto",
                "pattern_suggestion",
                "second_order_observer",
            ],
        }
    }
}

/// Dissipation knobs governing the lifecycle regulators (component J).
#[derive(Debug, Clone, Copy)]
pub struct DissipationConfig {
    pub potency_decay: f32,
    pub withdrawal_increment: f32,
    pub force_exit_threshold: f32,
}

impl Default for DissipationConfig {
    fn default() -> Self {
        Self {
            potency_decay: 0.9,
            withdrawal_increment: 0.05,
            force_exit_threshold: 0.1,
        }
    }
}

/// The pipeline-wide configuration object (SPEC_FULL §9 `PipelineConfig`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub signals_enabled: bool,
    pub gate_enabled: bool,
    pub bridge_deadline_ms: u64,
    pub turn_deadline_ms: u64,
    pub response_history_limit: usize,
    pub contributor_profile: ContributorProfile,
    pub dissipation: DissipationConfig,
    /// Extra float knobs not promoted to a dedicated field, keyed by env var name.
    knobs: HashMap<String, f32>,
}

impl PipelineConfig {
    /// Load from `.env` (best effort) plus process environment, falling back
    /// to documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        dotenv().ok();

        let signals_enabled = env_bool("PIPELINE_SIGNALS_ENABLED", true);
        let gate_enabled = env_bool("PIPELINE_GATE_ENABLED", true);
        let bridge_deadline_ms = env_u64("PIPELINE_BRIDGE_DEADLINE_MS", 120);
        let turn_deadline_ms = env_u64("PIPELINE_TURN_DEADLINE_MS", 3000);
        let response_history_limit = env_u64("PIPELINE_RESPONSE_HISTORY_LIMIT", 5) as usize;
        let contributor_profile = std::env::var("PIPELINE_CONTRIBUTOR_PROFILE")
            .map(|v| ContributorProfile::from_env_str(&v))
            .unwrap_or(ContributorProfile::Standard);

        let dissipation = DissipationConfig {
            potency_decay: env_f32("PIPELINE_POTENCY_DECAY", 0.9),
            withdrawal_increment: env_f32("PIPELINE_WITHDRAWAL_INCREMENT", 0.05),
            force_exit_threshold: env_f32("PIPELINE_FORCE_EXIT_THRESHOLD", 0.1),
        };

        let knob_keys = [
            "PIPELINE_CURVER_DEEPEN_FREE_ENERGY_MAX",
            "PIPELINE_CURVER_DEEPEN_ENTROPY_MAX",
            "PIPELINE_WITHDRAWAL_PROBABILITY_SCALE",
        ];
        let mut knobs = HashMap::new();
        for key in knob_keys {
            knobs.insert(key.to_string(), env_f32(key, default_knob(key)));
        }

        tracing::info!(
            bridge_deadline_ms,
            turn_deadline_ms,
            ?contributor_profile,
            "pipeline configuration loaded"
        );

        Self {
            signals_enabled,
            gate_enabled,
            bridge_deadline_ms,
            turn_deadline_ms,
            response_history_limit,
            contributor_profile,
            dissipation,
            knobs,
        }
    }

    pub fn knob(&self, key: &str) -> f32 {
        *self.knobs.get(key).unwrap_or(&0.5)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            signals_enabled: true,
            gate_enabled: true,
            bridge_deadline_ms: 120,
            turn_deadline_ms: 3000,
            response_history_limit: 5,
            contributor_profile: ContributorProfile::Standard,
            dissipation: DissipationConfig::default(),
            knobs: HashMap::new(),
        }
    }
}

fn default_knob(key: &str) -> f32 {
    match key {
        "PIPELINE_CURVER_DEEPEN_FREE_ENERGY_MAX" => 0.2,
        "PIPELINE_CURVER_DEEPEN_ENTROPY_MAX" => 0.3,
        "PIPELINE_WITHDRAWAL_PROBABILITY_SCALE" => 0.3,
        _ => 0.5,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.bridge_deadline_ms, 120);
        assert_eq!(cfg.turn_deadline_ms, 3000);
        assert_eq!(cfg.response_history_limit, 5);
        assert_eq!(cfg.dissipation.potency_decay, 0.9);
        assert_eq!(cfg.dissipation.force_exit_threshold, 0.1);
    }

    #[test]
    fn contributor_profile_parses_from_string() {
        assert_eq!(ContributorProfile::from_env_str("full"), ContributorProfile::Full);
        assert_eq!(ContributorProfile::from_env_str("MINIMAL"), ContributorProfile::Minimal);
        assert_eq!(ContributorProfile::from_env_str("bogus"), ContributorProfile::Standard);
    }

    #[test]
    fn minimal_profile_is_a_subset_of_full() {
        let minimal: std::collections::HashSet<_> =
            ContributorProfile::Minimal.enabled_contributors().iter().collect();
        let full: std::collections::HashSet<_> =
            ContributorProfile::Full.enabled_contributors().iter().collect();
        assert!(minimal.is_subset(&full));
    }
}
