//! `PatternLibrary`: an opaque, iterable set of regex-backed patterns
//! (SPEC_FULL §6). The core only ever consumes match-or-not results and a
//! category tag plus confidence prior — never the pattern internals.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCategory {
    Delegation,
    Dependency,
    Crisis,
    Relational,
    Decisional,
}

pub struct Pattern {
    pub pattern_id: &'static str,
    pub signal_regex: Regex,
    pub category: PatternCategory,
    pub response_template: &'static str,
    pub confidence_prior: f32,
}

pub trait PatternLibrary: Send + Sync {
    fn iter(&self) -> Box<dyn Iterator<Item = &Pattern> + '_>;

    /// Convenience: the set of patterns that match `text`, in table order.
    fn matches<'a>(&'a self, text: &str) -> Vec<&'a Pattern> {
        self.iter().filter(|p| p.signal_regex.is_match(text)).collect()
    }
}

pub struct StaticPatternLibrary {
    patterns: Vec<Pattern>,
}

impl Default for StaticPatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPatternLibrary {
    pub fn new() -> Self {
        Self {
            patterns: default_patterns(),
        }
    }
}

impl PatternLibrary for StaticPatternLibrary {
    fn iter(&self) -> Box<dyn Iterator<Item = &Pattern> + '_> {
        Box::new(self.patterns.iter())
    }
}

fn default_patterns() -> Vec<Pattern> {
    vec![
        Pattern {
            pattern_id: "delegation_request",
            signal_regex: Regex::new(r"(?i)\b(what should i do|tell me what to do|cosa dovrei fare|tu che dici)\b").unwrap(),
            category: PatternCategory::Delegation,
            response_template: "return_agency",
            confidence_prior: 0.75,
        },
        Pattern {
            pattern_id: "dependency_exclusivity",
            signal_regex: Regex::new(r"(?i)\b(you're the only one|only you understand|i need you)\b").unwrap(),
            category: PatternCategory::Dependency,
            response_template: "hold_space",
            confidence_prior: 0.6,
        },
        Pattern {
            pattern_id: "crisis_somatic",
            signal_regex: Regex::new(r"(?i)\b(can't breathe|heart is pounding|non riesco a respirare)\b").unwrap(),
            category: PatternCategory::Crisis,
            response_template: "ground",
            confidence_prior: 0.9,
        },
        Pattern {
            pattern_id: "relational_ambivalence",
            signal_regex: Regex::new(r"(?i)\b(i don't know if i love|mixed feelings about (him|her|them))\b").unwrap(),
            category: PatternCategory::Relational,
            response_template: "reflect_relation",
            confidence_prior: 0.55,
        },
        Pattern {
            pattern_id: "decision_paralysis",
            signal_regex: Regex::new(r"(?i)\b(can't decide|don't know what to choose|non so cosa scegliere)\b").unwrap(),
            category: PatternCategory::Decisional,
            response_template: "map_decision",
            confidence_prior: 0.65,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegation_phrase_matches_delegation_pattern() {
        let lib = StaticPatternLibrary::new();
        let matched = lib.matches("Tu che dici, cosa dovrei fare?");
        assert!(matched.iter().any(|p| p.category == PatternCategory::Delegation));
    }

    #[test]
    fn unrelated_text_matches_nothing() {
        let lib = StaticPatternLibrary::new();
        assert!(lib.matches("The quarterly report is due Friday.").is_empty());
    }
}
