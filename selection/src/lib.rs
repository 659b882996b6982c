//! Selection (component E, "S2"): turns a dimensional profile plus governor
//! deltas into a concrete `ProtocolSelection`, with a companion curver that
//! may only ever shrink the result.

use std::collections::HashSet;

use common_types::{
    ActionTag, Atmosphere, Depth, DimensionalState, FieldState, FivePointScale, Goal, Length, Mode, Pacing, Primitive,
    ProtocolSelection, Tone, UnitInterval, Valence, Vertical,
};
use governor::GovernorResult;

/// Extra selection-time context (currently just whether this is a repeat
/// turn in a loop, which nudges pacing down).
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionContext {
    pub loop_count: u32,
}

/// `select(field_state, dimensional_state, governor_result, context) -> ProtocolSelection`.
pub fn select(
    field_state: &FieldState,
    dimensional_state: &DimensionalState,
    governor_result: &GovernorResult,
    context: SelectionContext,
) -> ProtocolSelection {
    let atmosphere = governor_result.effect.atmosphere.unwrap_or_else(|| default_atmosphere(dimensional_state));
    let mode = governor_result.effect.mode.unwrap_or_else(|| default_mode(atmosphere, dimensional_state));
    let primitive = governor_result
        .effect
        .primitive
        .unwrap_or_else(|| default_primitive(field_state, dimensional_state, atmosphere));

    let base_depth = default_depth(dimensional_state, atmosphere);
    let depth = match governor_result.effect.depth_ceiling {
        Some(ceiling) => base_depth.min(ceiling),
        None => base_depth,
    };

    let length = default_length(atmosphere, depth);

    let mut pacing = match governor_result.effect.pacing {
        Some(g) => Pacing::Normal.min(g),
        None => Pacing::Normal,
    };
    if context.loop_count >= 2 {
        pacing = pacing.min(Pacing::Conservative);
    }

    let tone = default_tone(field_state.valence);

    let forbidden: HashSet<ActionTag> = governor_result.effect.forbidden.iter().copied().collect();
    let required: HashSet<ActionTag> = governor_result.effect.required.iter().copied().collect();

    let confidence = UnitInterval::new(dimensional_state.integration.phi);

    ProtocolSelection {
        atmosphere,
        mode,
        primitive,
        depth,
        length,
        pacing,
        tone,
        forbidden,
        required,
        confidence,
    }
}

fn default_atmosphere(ds: &DimensionalState) -> Atmosphere {
    if ds.emergency_detected {
        Atmosphere::Emergency
    } else if ds.v_mode_triggered {
        Atmosphere::VMode
    } else if ds.primary_vertical == Vertical::Functional {
        Atmosphere::Decision
    } else {
        Atmosphere::HumanField
    }
}

fn default_mode(atmosphere: Atmosphere, ds: &DimensionalState) -> Mode {
    match atmosphere {
        Atmosphere::Emergency => Mode::Contract,
        Atmosphere::VMode => Mode::Expand,
        _ if ds.integration.tension > 0.5 => Mode::Regulate,
        _ => Mode::Expand,
    }
}

fn default_primitive(field_state: &FieldState, ds: &DimensionalState, atmosphere: Atmosphere) -> Primitive {
    if atmosphere == Atmosphere::Emergency {
        return Primitive::Ground;
    }
    if atmosphere == Atmosphere::VMode {
        return Primitive::ReturnAgency;
    }

    match ds.primary_vertical {
        Vertical::Somatic => Primitive::Ground,
        Vertical::Relational => Primitive::ReflectRelation,
        Vertical::Existential => Primitive::HoldIdentity,
        Vertical::Transcendent => Primitive::HoldSpace,
        Vertical::Functional => match field_state.goal {
            Goal::Decide => Primitive::MapDecision,
            Goal::Inform => Primitive::Inform,
            Goal::Explore => Primitive::Open,
            Goal::Act => Primitive::CompleteTask,
            _ => Primitive::Reflect,
        },
    }
}

fn default_depth(ds: &DimensionalState, atmosphere: Atmosphere) -> Depth {
    if atmosphere == Atmosphere::Emergency {
        return Depth::Surface;
    }
    if ds.integration.phi >= 0.7 && ds.integration.tension < 0.4 {
        Depth::Deep
    } else if ds.integration.phi >= 0.4 {
        Depth::Medium
    } else {
        Depth::Surface
    }
}

fn default_length(atmosphere: Atmosphere, depth: Depth) -> Length {
    if atmosphere == Atmosphere::Emergency {
        return Length::Minimal;
    }
    match depth {
        Depth::Surface => Length::Brief,
        Depth::Medium | Depth::Deep => Length::Moderate,
    }
}

fn default_tone(valence: Valence) -> Tone {
    let warmth = match valence {
        Valence::Negative | Valence::Mixed => FivePointScale::new(4),
        Valence::Positive => FivePointScale::new(3),
        Valence::Neutral => FivePointScale::new(3),
    };
    Tone {
        warmth,
        directness: FivePointScale::new(3),
    }
}

/// Stochastic-field diagnostics consumed only by the curver; opaque to every
/// other component.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldDiagnostics {
    pub free_energy: f32,
    pub entropy: f32,
}

/// A coarse summary of the regulatory manifold's current stability.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifoldState {
    pub stable: bool,
    pub potential: f32,
}

#[derive(Debug, Clone, Default)]
pub struct CurvatureTrace {
    pub rules_applied: Vec<&'static str>,
}

/// `curve(selection, manifold_state, field_diagnostics) -> (selection', trace)`.
///
/// May only shrink the allowed set, with one deepening exception:
/// stable + low free energy + low potential allows surface -> medium.
pub fn curve(
    mut selection: ProtocolSelection,
    manifold: ManifoldState,
    diagnostics: FieldDiagnostics,
) -> (ProtocolSelection, CurvatureTrace) {
    let mut trace = CurvatureTrace::default();

    let low_free_energy = diagnostics.free_energy < 0.3;
    let low_potential = manifold.potential < 0.3;
    let can_deepen = manifold.stable && low_free_energy && low_potential;

    if can_deepen && selection.depth == Depth::Surface {
        selection.depth = Depth::Medium;
        trace.rules_applied.push("stable_low_energy_deepen");
        return (selection, trace);
    }

    if diagnostics.entropy > 0.7 {
        selection.depth = match selection.depth {
            Depth::Deep => Depth::Medium,
            Depth::Medium => Depth::Surface,
            Depth::Surface => Depth::Surface,
        };
        trace.rules_applied.push("high_entropy_shrinks_depth");
    }

    if diagnostics.free_energy > 0.7 {
        selection.forbidden.insert(ActionTag::Recommend);
        selection.length = selection.length.min(Length::Brief);
        trace.rules_applied.push("high_free_energy_adds_forbidden");
    }

    if manifold.potential > 0.7 {
        selection.length = Length::Minimal;
        trace.rules_applied.push("high_potential_shrinks_length");
    }

    if selection.atmosphere != Atmosphere::VMode
        && matches!(selection.primitive, Primitive::HoldIdentity)
        && diagnostics.entropy > 0.5
    {
        selection.atmosphere = Atmosphere::VMode;
        selection.primitive = Primitive::ReturnAgency;
        selection.forbidden.extend(common_types::V_MODE_FORBIDDEN.iter().copied());
        selection.required.insert(ActionTag::ReturnAgency);
        trace.rules_applied.push("identity_boundary_forces_v_mode");
    }

    (selection, trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::{Arousal, Coherence, Domain, DomainActivation, Integration, Language, Temporal};
    use std::collections::HashMap;

    fn field_state(goal: Goal, valence: Valence) -> FieldState {
        FieldState {
            domains: vec![DomainActivation {
                domain: Domain::Decision,
                salience: UnitInterval::new(0.6),
                confidence: UnitInterval::new(0.7),
                evidence: Vec::new(),
            }],
            arousal: Arousal::Medium,
            valence,
            coherence: Coherence::High,
            temporal: Temporal::default(),
            goal,
            loop_count: 0,
            flags: Default::default(),
            uncertainty: 0.2,
            language: Language::En,
        }
    }

    fn dimensional_state(primary: Vertical, phi: f32, tension: f32) -> DimensionalState {
        let mut vertical = HashMap::new();
        vertical.insert(primary, 0.8);
        DimensionalState {
            vertical,
            horizontal: HashMap::new(),
            primary_vertical: primary,
            primary_horizontal: vec![],
            v_mode_triggered: false,
            emergency_detected: false,
            cross_dimensional: false,
            integration: Integration {
                phi,
                complexity: 1,
                coherence: 0.8,
                tension,
            },
        }
    }

    #[test]
    fn functional_decide_goal_selects_map_decision() {
        let fs = field_state(Goal::Decide, Valence::Neutral);
        let ds = dimensional_state(Vertical::Functional, 0.6, 0.2);
        let gr = governor::apply(&fs);
        let sel = select(&fs, &ds, &gr, SelectionContext::default());
        assert_eq!(sel.primitive, Primitive::MapDecision);
    }

    #[test]
    fn emergency_atmosphere_forces_ground_and_surface() {
        let mut fs = field_state(Goal::Process, Valence::Negative);
        fs.flags.insert(common_types::Flag::Crisis);
        let mut ds = dimensional_state(Vertical::Somatic, 0.6, 0.2);
        ds.emergency_detected = true;
        let gr = governor::apply(&fs);
        let sel = select(&fs, &ds, &gr, SelectionContext::default());
        assert_eq!(sel.atmosphere, Atmosphere::Emergency);
        assert_eq!(sel.primitive, Primitive::Ground);
        assert_eq!(sel.depth, Depth::Surface);
    }

    #[test]
    fn curve_never_deepens_except_stable_low_energy_case() {
        let fs = field_state(Goal::Explore, Valence::Neutral);
        let ds = dimensional_state(Vertical::Functional, 0.3, 0.2);
        let gr = governor::apply(&fs);
        let sel = select(&fs, &ds, &gr, SelectionContext::default());
        assert_eq!(sel.depth, Depth::Surface);

        let (curved, trace) = curve(
            sel.clone(),
            ManifoldState { stable: true, potential: 0.1 },
            FieldDiagnostics { free_energy: 0.1, entropy: 0.1 },
        );
        assert_eq!(curved.depth, Depth::Medium);
        assert!(trace.rules_applied.contains(&"stable_low_energy_deepen"));
    }

    #[test]
    fn curve_shrinks_on_high_entropy() {
        let fs = field_state(Goal::Explore, Valence::Neutral);
        let ds = dimensional_state(Vertical::Functional, 0.9, 0.1);
        let gr = governor::apply(&fs);
        let sel = select(&fs, &ds, &gr, SelectionContext::default());
        assert_eq!(sel.depth, Depth::Deep);

        let (curved, _) = curve(
            sel,
            ManifoldState { stable: false, potential: 0.5 },
            FieldDiagnostics { free_energy: 0.2, entropy: 0.9 },
        );
        assert_eq!(curved.depth, Depth::Medium);
    }

    #[test]
    fn identity_boundary_rule_populates_forbidden_and_required() {
        let fs = field_state(Goal::Explore, Valence::Neutral);
        let ds = dimensional_state(Vertical::Existential, 0.6, 0.2);
        let gr = governor::apply(&fs);
        let sel = select(&fs, &ds, &gr, SelectionContext::default());
        assert_eq!(sel.primitive, Primitive::HoldIdentity);
        assert_ne!(sel.atmosphere, Atmosphere::VMode);

        let (curved, trace) = curve(
            sel,
            ManifoldState { stable: false, potential: 0.5 },
            FieldDiagnostics { free_energy: 0.2, entropy: 0.9 },
        );
        assert!(trace.rules_applied.contains(&"identity_boundary_forces_v_mode"));
        assert_eq!(curved.atmosphere, Atmosphere::VMode);
        assert_eq!(curved.primitive, Primitive::ReturnAgency);
        assert!(curved.required.contains(&ActionTag::ReturnAgency));
        assert!(common_types::V_MODE_FORBIDDEN.iter().all(|tag| curved.forbidden.contains(tag)));
    }
}
