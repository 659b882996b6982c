//! Types produced by perception (component B) and consumed read-only downstream.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::Domain;
use crate::scalar::UnitInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arousal {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Valence {
    Negative,
    Neutral,
    Positive,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coherence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    Regulate,
    Process,
    Decide,
    Explore,
    Inform,
    Act,
    Wait,
    Unclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    Crisis,
    HighArousal,
    Shutdown,
    DelegationAttempt,
    DependencySignal,
}

/// Closed subset of the full language table (see SPEC_FULL §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    En,
    It,
    Es,
    Pt,
    Fr,
    De,
    Hi,
    Ar,
    Mixed,
    Unknown,
}

impl Language {
    /// English is always an acceptable fallback for localized lookups.
    pub fn fallback() -> Self {
        Language::En
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
            Language::Es => "es",
            Language::Pt => "pt",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Hi => "hi",
            Language::Ar => "ar",
            Language::Mixed => "mixed",
            Language::Unknown => "unknown",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Unknown
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainActivation {
    pub domain: Domain,
    pub salience: UnitInterval,
    pub confidence: UnitInterval,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Temporal {
    pub past_salience: f32,
    pub future_salience: f32,
}

/// The perceived state of a single utterance. Produced by perception, read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldState {
    /// Top `domains` by salience, at most 5, descending.
    pub domains: Vec<DomainActivation>,
    pub arousal: Arousal,
    pub valence: Valence,
    pub coherence: Coherence,
    pub temporal: Temporal,
    pub goal: Goal,
    pub loop_count: u32,
    pub flags: HashSet<Flag>,
    pub uncertainty: f32,
    pub language: Language,
}

impl FieldState {
    pub fn dominant_domain(&self) -> Option<Domain> {
        self.domains.first().map(|d| d.domain)
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}
