//! Dimensional detector (component C): projects `FieldState`'s horizontal
//! domain salience onto 5 verticals, flags V_MODE/emergency/cross-dimensional
//! conditions, and computes an integration (phi) measure.

use std::collections::HashMap;

use common_types::{Coherence, DimensionalState, Domain, FieldState, Flag, Integration, Vertical};

const V_MODE_THRESHOLD: f32 = 0.5;
const EMERGENCY_THRESHOLD: f32 = 0.5;
const CROSS_DIMENSIONAL_THRESHOLD: f32 = 0.3;
const CROSS_DIMENSIONAL_MIN_COUNT: usize = 2;

/// `detect(utterance, field_state, prev_state) -> DimensionalState`.
///
/// `utterance`/`language` are accepted for symmetry with the other
/// components' signatures but the current projection is driven entirely by
/// `field_state`; `prev_state` is reserved for future continuity smoothing
/// and is presently unused beyond being accepted.
pub fn detect(field_state: &FieldState, _prev_state: Option<&DimensionalState>) -> DimensionalState {
    let horizontal = horizontal_weights(field_state);
    let vertical = vertical_weights(&horizontal);

    let primary_vertical = vertical
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(v, _)| *v)
        .unwrap_or(Vertical::Functional);

    let mut primary_horizontal: Vec<(Domain, f32)> = horizontal.iter().map(|(d, w)| (*d, *w)).collect();
    primary_horizontal.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    let primary_horizontal: Vec<Domain> = primary_horizontal.into_iter().take(3).map(|(d, _)| d).collect();

    let v_mode_triggered = vertical.get(&Vertical::Existential).copied().unwrap_or(0.0) >= V_MODE_THRESHOLD
        || horizontal.get(&Domain::Meaning).copied().unwrap_or(0.0) >= V_MODE_THRESHOLD
        || horizontal.get(&Domain::Identity).copied().unwrap_or(0.0) >= V_MODE_THRESHOLD;

    let emergency_detected = field_state.has_flag(Flag::Crisis)
        || vertical.get(&Vertical::Somatic).copied().unwrap_or(0.0) >= EMERGENCY_THRESHOLD
            && horizontal.get(&Domain::Survival).copied().unwrap_or(0.0) >= EMERGENCY_THRESHOLD;

    let active_verticals: Vec<f32> = vertical
        .values()
        .copied()
        .filter(|w| *w > CROSS_DIMENSIONAL_THRESHOLD)
        .collect();
    let cross_dimensional = active_verticals.len() >= CROSS_DIMENSIONAL_MIN_COUNT;

    let integration = compute_integration(field_state, &vertical, &active_verticals);

    DimensionalState {
        vertical,
        horizontal,
        primary_vertical,
        primary_horizontal,
        v_mode_triggered,
        emergency_detected,
        cross_dimensional,
        integration,
    }
}

fn horizontal_weights(field_state: &FieldState) -> HashMap<Domain, f32> {
    field_state
        .domains
        .iter()
        .map(|d| (d.domain, d.salience.get()))
        .collect()
}

fn vertical_weights(horizontal: &HashMap<Domain, f32>) -> HashMap<Vertical, f32> {
    let mut out: HashMap<Vertical, f32> = Vertical::ALL.iter().map(|v| (*v, 0.0)).collect();
    for (domain, weight) in horizontal {
        let v = domain.vertical();
        let entry = out.entry(v).or_insert(0.0);
        *entry = (*entry + weight).min(1.0);
    }
    out
}

/// Closed-form integration measure: phi rewards a coherent field (high
/// `FieldState.coherence`) whose activation is spread rather than
/// concentrated, penalized by variance (tension) across active verticals.
/// Deterministic and pure given the same inputs.
fn compute_integration(
    field_state: &FieldState,
    vertical: &HashMap<Vertical, f32>,
    active_verticals: &[f32],
) -> Integration {
    let coherence_factor = match field_state.coherence {
        Coherence::Low => 0.3,
        Coherence::Medium => 0.6,
        Coherence::High => 0.9,
    };

    let complexity = active_verticals.len() as u32;
    let tension = variance(vertical.values().copied().collect::<Vec<_>>().as_slice());

    let spread_bonus = if complexity >= 2 { 0.1 * (complexity as f32 - 1.0) } else { 0.0 };
    let phi = (coherence_factor * (1.0 - tension) + spread_bonus).clamp(0.0, 1.0);

    Integration {
        phi,
        complexity,
        coherence: coherence_factor,
        tension,
    }
}

fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;
    var.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::{Arousal, DomainActivation, Goal, Language, Temporal, UnitInterval, Valence};
    use std::collections::HashSet;

    fn field_state_with(domains: Vec<(Domain, f32)>, coherence: Coherence, flags: HashSet<Flag>) -> FieldState {
        FieldState {
            domains: domains
                .into_iter()
                .map(|(domain, salience)| DomainActivation {
                    domain,
                    salience: UnitInterval::new(salience),
                    confidence: UnitInterval::new(0.7),
                    evidence: Vec::new(),
                })
                .collect(),
            arousal: Arousal::Medium,
            valence: Valence::Neutral,
            coherence,
            temporal: Temporal::default(),
            goal: Goal::Process,
            loop_count: 0,
            flags,
            uncertainty: 0.2,
            language: Language::En,
        }
    }

    #[test]
    fn meaning_domain_triggers_v_mode() {
        let fs = field_state_with(vec![(Domain::Meaning, 0.9)], Coherence::High, HashSet::new());
        let ds = detect(&fs, None);
        assert!(ds.v_mode_triggered);
        assert_eq!(ds.primary_vertical, Vertical::Existential);
    }

    #[test]
    fn crisis_flag_triggers_emergency() {
        let mut flags = HashSet::new();
        flags.insert(Flag::Crisis);
        let fs = field_state_with(vec![(Domain::Survival, 0.9)], Coherence::Medium, flags);
        let ds = detect(&fs, None);
        assert!(ds.emergency_detected);
    }

    #[test]
    fn two_strong_domains_across_verticals_is_cross_dimensional() {
        let fs = field_state_with(
            vec![(Domain::Survival, 0.8), (Domain::Meaning, 0.8)],
            Coherence::High,
            HashSet::new(),
        );
        let ds = detect(&fs, None);
        assert!(ds.cross_dimensional);
    }

    #[test]
    fn detection_is_deterministic() {
        let fs = field_state_with(vec![(Domain::Work, 0.6)], Coherence::Medium, HashSet::new());
        let a = detect(&fs, None);
        let b = detect(&fs, None);
        assert_eq!(a.integration.phi, b.integration.phi);
        assert_eq!(a.primary_vertical, b.primary_vertical);
    }

    #[test]
    fn single_weak_domain_has_low_phi_penalty_from_tension() {
        let fs = field_state_with(vec![(Domain::Cognition, 0.3)], Coherence::Low, HashSet::new());
        let ds = detect(&fs, None);
        assert!(ds.integration.phi <= 0.4);
    }
}
