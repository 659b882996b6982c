//! Perception (component B): turns a raw utterance plus recent history into
//! a `FieldState`. Always succeeds — an utterance with no domain hits
//! defaults to COGNITION at salience 0.3, per SPEC_FULL.

mod language;
mod markers;

use std::collections::HashSet;

use common_types::{Arousal, Coherence, Domain, DomainActivation, FieldState, Flag, Goal, Temporal, UnitInterval, Valence};

pub use language::detect_language;

/// `perceive(utterance, history) -> FieldState`.
pub fn perceive(utterance: &str, history: &[String]) -> FieldState {
    let domains = domain_activations(utterance);
    let arousal = detect_arousal(utterance);
    let valence = detect_valence(utterance);
    let coherence = detect_coherence(utterance);
    let goal = detect_goal(utterance);
    let temporal = detect_temporal(utterance);
    let mut flags = HashSet::new();

    if markers::crisis_regex().is_match(utterance) {
        flags.insert(Flag::Crisis);
    }
    if markers::delegation_regex().is_match(utterance) {
        flags.insert(Flag::DelegationAttempt);
    }
    if markers::dependency_regex().is_match(utterance) {
        flags.insert(Flag::DependencySignal);
    }
    if arousal == Arousal::High {
        flags.insert(Flag::HighArousal);
    }
    if arousal == Arousal::Low && markers::numb_regex().is_match(utterance) {
        flags.insert(Flag::Shutdown);
    }

    let loop_count = loop_count(&domains, history);
    let uncertainty = estimate_uncertainty(utterance, &domains);
    let language = detect_language(utterance);

    FieldState {
        domains,
        arousal,
        valence,
        coherence,
        temporal,
        goal,
        loop_count,
        flags,
        uncertainty,
        language,
    }
}

fn domain_activations(utterance: &str) -> Vec<DomainActivation> {
    let mut activations: Vec<DomainActivation> = markers::domain_markers()
        .iter()
        .filter_map(|marker| {
            let matches: Vec<&str> = marker
                .regex
                .find_iter(utterance)
                .map(|m| m.as_str())
                .collect();
            if matches.is_empty() {
                return None;
            }
            let salience = (marker.weight * (1.0 + 0.1 * (matches.len() as f32 - 1.0))).min(1.0);
            Some(DomainActivation {
                domain: marker.domain,
                salience: UnitInterval::new(salience),
                confidence: UnitInterval::new(if matches.len() > 1 { 0.9 } else { 0.7 }),
                evidence: vec![matches[0].to_string()],
            })
        })
        .collect();

    activations.sort_by(|a, b| b.salience.get().partial_cmp(&a.salience.get()).unwrap());
    activations.truncate(5);

    if activations.is_empty() {
        activations.push(DomainActivation {
            domain: Domain::Cognition,
            salience: UnitInterval::new(0.3),
            confidence: UnitInterval::new(0.3),
            evidence: Vec::new(),
        });
    }

    activations
}

fn detect_arousal(utterance: &str) -> Arousal {
    let letters: Vec<char> = utterance.chars().filter(|c| c.is_alphabetic()).collect();
    let caps = letters.iter().filter(|c| c.is_uppercase()).count();
    let caps_ratio = if letters.is_empty() {
        0.0
    } else {
        caps as f32 / letters.len() as f32
    };
    let exclaim_density = utterance.matches('!').count() as f32 / (utterance.len().max(1) as f32 / 40.0).max(1.0);

    if markers::high_arousal_regex().is_match(utterance) || caps_ratio > 0.4 || exclaim_density > 1.0 {
        Arousal::High
    } else if markers::low_arousal_regex().is_match(utterance) {
        Arousal::Low
    } else {
        Arousal::Medium
    }
}

fn detect_valence(utterance: &str) -> Valence {
    let pos = markers::positive_lexicon().is_match(utterance);
    let neg = markers::negative_lexicon().is_match(utterance);
    match (pos, neg) {
        (true, true) => Valence::Mixed,
        (true, false) => Valence::Positive,
        (false, true) => Valence::Negative,
        (false, false) => Valence::Neutral,
    }
}

fn detect_coherence(utterance: &str) -> Coherence {
    let words: Vec<&str> = utterance.split_whitespace().collect();
    if words.len() < 3 || words.len() > 200 {
        return Coherence::Low;
    }
    let sentences: Vec<&str> = utterance
        .split(|c| c == '.' || c == '!' || c == '?')
        .filter(|s| !s.trim().is_empty())
        .collect();
    if sentences.is_empty() {
        return Coherence::Medium;
    }
    let mean_sentence_len =
        sentences.iter().map(|s| s.split_whitespace().count()).sum::<usize>() as f32 / sentences.len() as f32;
    if mean_sentence_len < 3.0 {
        Coherence::Low
    } else if mean_sentence_len > 25.0 {
        Coherence::Medium
    } else {
        Coherence::High
    }
}

fn detect_goal(utterance: &str) -> Goal {
    let is_interrogative = utterance.trim_end().ends_with('?');
    let word_count = utterance.split_whitespace().count();

    if markers::regulatory_regex().is_match(utterance) {
        Goal::Regulate
    } else if markers::delegation_regex().is_match(utterance) {
        Goal::Decide
    } else if markers::decisional_regex().is_match(utterance) {
        Goal::Decide
    } else if markers::exploratory_regex().is_match(utterance) {
        Goal::Explore
    } else if markers::informative_regex().is_match(utterance) {
        Goal::Inform
    } else if word_count <= 4 && !is_interrogative {
        Goal::Wait
    } else if is_interrogative {
        Goal::Explore
    } else {
        Goal::Process
    }
}

fn detect_temporal(utterance: &str) -> Temporal {
    let past = markers::past_markers().find_iter(utterance).count() as f32;
    let future = markers::future_markers().find_iter(utterance).count() as f32;
    let total = (past + future).max(1.0);
    Temporal {
        past_salience: past / total,
        future_salience: future / total,
    }
}

/// Quick-classify a single utterance to its dominant domain, for loop
/// detection against recent history (not a full `FieldState` computation).
fn quick_dominant_domain(text: &str) -> Option<Domain> {
    markers::domain_markers()
        .iter()
        .filter(|m| m.regex.is_match(text))
        .max_by(|a, b| a.weight.partial_cmp(&b.weight).unwrap())
        .map(|m| m.domain)
}

fn loop_count(domains: &[DomainActivation], history: &[String]) -> u32 {
    let Some(dominant) = domains.first().map(|d| d.domain) else {
        return 0;
    };

    let recent: Vec<&String> = history.iter().rev().take(5).collect();
    let labels: Vec<Option<Domain>> = recent.iter().map(|t| quick_dominant_domain(t)).collect();

    let mut consecutive = 0u32;
    for label in &labels {
        if *label == Some(dominant) {
            consecutive += 1;
        } else {
            break;
        }
    }
    consecutive
}

fn estimate_uncertainty(utterance: &str, domains: &[DomainActivation]) -> f32 {
    let hedge_count = ["maybe", "i guess", "not sure", "forse", "non so"]
        .iter()
        .filter(|h| utterance.to_ascii_lowercase().contains(*h))
        .count() as f32;
    let top_confidence = domains.first().map(|d| d.confidence.get()).unwrap_or(0.3);
    (0.2 * hedge_count + (1.0 - top_confidence) * 0.5).clamp(0.0, 1.0)
}

/// Detects an alternating ABAB pattern across the last 4 quick-classified
/// history entries, independent of `loop_count`'s consecutive-match count.
pub fn alternating_pattern(history: &[String]) -> bool {
    let recent: Vec<Option<Domain>> = history
        .iter()
        .rev()
        .take(4)
        .map(|t| quick_dominant_domain(t))
        .collect();
    if recent.len() < 4 {
        return false;
    }
    recent[0].is_some() && recent[0] == recent[2] && recent[1] == recent[3] && recent[0] != recent[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perceive_always_produces_a_field_state() {
        let fs = perceive("", &[]);
        assert!(!fs.domains.is_empty());
    }

    #[test]
    fn empty_domain_defaults_to_cognition() {
        let fs = perceive("xyz plain text with no markers at all here", &[]);
        assert_eq!(fs.domains[0].domain, Domain::Cognition);
        assert_eq!(fs.domains[0].salience.get(), 0.3);
    }

    #[test]
    fn perceive_is_deterministic() {
        let a = perceive("I can't breathe, my heart is pounding, I'm scared", &[]);
        let b = perceive("I can't breathe, my heart is pounding, I'm scared", &[]);
        assert_eq!(a.domains.len(), b.domains.len());
        assert_eq!(a.arousal, b.arousal);
        assert_eq!(a.flags, b.flags);
    }

    #[test]
    fn emergency_utterance_sets_crisis_relevant_signals() {
        let fs = perceive("I can't breathe, my heart is pounding, I'm scared", &[]);
        assert_eq!(fs.arousal, Arousal::High);
        assert!(fs.domains.iter().any(|d| d.domain == Domain::Survival));
    }

    #[test]
    fn delegation_phrase_sets_delegation_flag() {
        let fs = perceive("Tu che dici, cosa dovrei fare?", &[]);
        assert!(fs.flags.contains(&Flag::DelegationAttempt));
    }

    #[test]
    fn both_polarity_lexicons_present_yields_mixed_valence() {
        let fs = perceive("I am so happy but also so angry about this", &[]);
        assert_eq!(fs.valence, Valence::Mixed);
    }

    #[test]
    fn repeated_utterance_increases_loop_count() {
        let history = vec![
            "Non so cosa fare".to_string(),
            "Non so cosa fare".to_string(),
        ];
        let fs = perceive("Non so cosa fare", &history);
        assert!(fs.loop_count >= 2);
    }

    #[test]
    fn very_short_non_interrogative_input_yields_wait_goal() {
        let fs = perceive("ok fine", &[]);
        assert_eq!(fs.goal, Goal::Wait);
    }
}
