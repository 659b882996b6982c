//! Phased planner (component G, "S3a/S3b"): generates 1-3 candidate plans
//! from a selection, then commits one deterministically given the bridge's
//! merged signals.

use std::collections::HashSet;

use bridge::{EarlySignals, EarlySignalsStatus};
use common_types::{
    ActType, ActionTag, Depth, FivePointScale, Length, PlanConstraints, PlanMetadata, PlanSource, ProtocolSelection,
    ResponsePlan, RiskFlags, SpeechAct, UnitInterval, V_MODE_FORBIDDEN,
};

#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub candidates: Vec<ResponsePlan>,
    /// Index of the candidate the generator itself recommends (usually 0).
    pub recommended_index: usize,
}

/// `generate_candidates(selection, risk, turn) -> CandidateSet`.
pub fn generate_candidates(selection: &ProtocolSelection, risk: RiskFlags, turn: u32) -> CandidateSet {
    let mut candidates = Vec::new();

    if risk.emergency {
        candidates.push(canonical_plan(
            PlanSource::Emergency,
            vec![SpeechAct { act: ActType::Ground, force: UnitInterval::new(0.9) }],
            Length::Minimal,
            risk,
            turn,
        ));
    } else if risk.v_mode {
        candidates.push(canonical_plan(
            PlanSource::VMode,
            vec![SpeechAct { act: ActType::ReturnAgency, force: UnitInterval::new(0.9) }],
            Length::Brief,
            risk,
            turn,
        ));
    }

    let primary_acts: Vec<SpeechAct> = selection
        .primitive
        .base_acts()
        .iter()
        .map(|(act, force)| SpeechAct { act: *act, force: UnitInterval::new(*force) })
        .collect();
    candidates.push(plan_from_selection(selection, primary_acts, PlanSource::Selection, risk, turn));

    let conservative_depth = match selection.depth {
        Depth::Deep => Depth::Medium,
        Depth::Medium => Depth::Surface,
        Depth::Surface => Depth::Surface,
    };
    let conservative_acts: Vec<SpeechAct> = selection
        .primitive
        .base_acts()
        .iter()
        .map(|(act, force)| SpeechAct { act: *act, force: UnitInterval::new(force * 0.7) })
        .collect();
    let mut conservative_selection = selection.clone();
    conservative_selection.depth = conservative_depth;
    conservative_selection.length = Length::Brief;
    candidates.push(plan_from_selection(&conservative_selection, conservative_acts, PlanSource::Selection, risk, turn));

    candidates.push(minimal_safe_plan(risk, turn));

    CandidateSet { candidates, recommended_index: 0 }
}

fn plan_from_selection(
    selection: &ProtocolSelection,
    acts: Vec<SpeechAct>,
    source: PlanSource,
    risk: RiskFlags,
    turn: u32,
) -> ResponsePlan {
    let constraints = PlanConstraints {
        max_length: common_types::max_length_for_depth(selection.depth),
        warmth: selection.tone.warmth,
        brevity: selection.length,
        pronouns: None,
        tools_allowed: true,
        must_require_user_effort: false,
        forbidden: selection.forbidden.clone(),
        required: selection.required.clone(),
        language: common_types::Language::default(),
    };

    ResponsePlan {
        id: uuid::Uuid::new_v4().to_string(),
        acts,
        constraints,
        metadata: PlanMetadata { risk, potency: 1.0, withdrawal_bias: 0.0, turn, timestamp: now() },
        confidence: selection.confidence,
        source,
    }
}

fn canonical_plan(source: PlanSource, acts: Vec<SpeechAct>, length: Length, risk: RiskFlags, turn: u32) -> ResponsePlan {
    let mut forbidden: HashSet<ActionTag> = HashSet::new();
    let mut required: HashSet<ActionTag> = HashSet::new();
    if source == PlanSource::VMode {
        forbidden.extend(V_MODE_FORBIDDEN.iter().copied());
        required.insert(ActionTag::ReturnAgency);
    }

    let depth = if source == PlanSource::Emergency { Depth::Surface } else { Depth::Surface };

    ResponsePlan {
        id: uuid::Uuid::new_v4().to_string(),
        acts,
        constraints: PlanConstraints {
            max_length: common_types::max_length_for_depth(depth),
            warmth: FivePointScale::new(4),
            brevity: length,
            pronouns: None,
            tools_allowed: false,
            must_require_user_effort: false,
            forbidden,
            required,
            language: common_types::Language::default(),
        },
        metadata: PlanMetadata { risk, potency: 1.0, withdrawal_bias: 0.0, turn, timestamp: now() },
        confidence: UnitInterval::new(0.95),
        source,
    }
}

fn minimal_safe_plan(risk: RiskFlags, turn: u32) -> ResponsePlan {
    ResponsePlan {
        id: uuid::Uuid::new_v4().to_string(),
        acts: vec![
            SpeechAct { act: ActType::Acknowledge, force: UnitInterval::new(0.3) },
            SpeechAct { act: ActType::Hold, force: UnitInterval::new(0.5) },
        ],
        constraints: PlanConstraints {
            max_length: common_types::max_length_for_depth(Depth::Surface),
            warmth: FivePointScale::new(3),
            brevity: Length::Minimal,
            pronouns: None,
            tools_allowed: false,
            must_require_user_effort: false,
            forbidden: HashSet::new(),
            required: HashSet::new(),
            language: common_types::Language::default(),
        },
        metadata: PlanMetadata { risk, potency: 1.0, withdrawal_bias: 0.0, turn, timestamp: now() },
        confidence: UnitInterval::new(0.5),
        source: PlanSource::Fallback,
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvent {
    VetoByConstitution { reason: String },
}

#[derive(Debug, Clone)]
pub struct CommittedPlan {
    pub plan: ResponsePlan,
    pub events: Vec<PlanEvent>,
}

/// Lifecycle overrides applied during commit, independent of the governor's
/// own `LifecycleDeltas` (which are folded in earlier, at selection time).
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleOverrides {
    pub potency: f32,
    pub withdrawal_bias: f32,
}

/// `commit(candidates, signals, status, lifecycle) -> CommittedPlan`.
/// Fully deterministic in its inputs.
pub fn commit(
    candidates: CandidateSet,
    signals: &EarlySignals,
    status: &EarlySignalsStatus,
    lifecycle: LifecycleOverrides,
) -> CommittedPlan {
    let CandidateSet { candidates, recommended_index } = candidates;
    let last = candidates.len() - 1;
    let mut pick = recommended_index.min(last);

    if let Some(suggestion) = signals
        .candidate_suggestions
        .iter()
        .find(|s| s.confidence >= 0.6 && candidates.iter().any(|c| c.has_act(s.leading_act)))
    {
        if let Some(idx) = candidates.iter().position(|c| c.has_act(suggestion.leading_act)) {
            pick = idx;
        }
    }

    if bridge::highest_severity_veto(signals).map(|v| v.severity >= 0.8).unwrap_or(false) {
        pick = (pick + 1).min(last);
    }

    if status.timed_out {
        pick = (pick + 1).min(last);
    }

    let mut plan = candidates[pick].clone();
    plan.id = uuid::Uuid::new_v4().to_string();

    apply_signals_to_constraints(&mut plan.constraints, signals);
    apply_lifecycle_overrides(&mut plan.constraints, lifecycle);

    let mut events = Vec::new();
    if !validate(&plan) {
        let mut fallback = candidates[last].clone();
        fallback.id = uuid::Uuid::new_v4().to_string();
        if !validate(&fallback) {
            enforce_invariants(&mut fallback);
        }
        plan = fallback;
        events.push(PlanEvent::VetoByConstitution {
            reason: "committed candidate failed post-merge invariant validation".to_string(),
        });
    }

    CommittedPlan { plan, events }
}

/// Last-resort patch applied when even the minimal-safe fallback fails
/// `validate` (e.g. a v_mode turn whose fallback carries no return-agency
/// act). Forces the §3 plan-level invariants directly instead of handing
/// back a plan `validate` would reject.
fn enforce_invariants(plan: &mut ResponsePlan) {
    if plan.metadata.risk.v_mode {
        if !plan.has_act(ActType::ReturnAgency) {
            plan.acts.push(SpeechAct { act: ActType::ReturnAgency, force: UnitInterval::new(0.9) });
        }
        plan.constraints.forbidden.extend(V_MODE_FORBIDDEN.iter().copied());
        plan.constraints.required.insert(ActionTag::ReturnAgency);
    }
    if plan.metadata.risk.emergency && !plan.has_act(ActType::Ground) {
        plan.acts.push(SpeechAct { act: ActType::Ground, force: UnitInterval::new(0.9) });
    }
}

fn apply_signals_to_constraints(constraints: &mut PlanConstraints, signals: &EarlySignals) {
    constraints.forbidden.extend(signals.forbidden.iter().copied());
    constraints.required.extend(signals.required.iter().copied());
    if let Some(max_length) = signals.max_length {
        constraints.max_length = constraints.max_length.min(max_length);
    }
    if let Some(delta) = signals.brevity_delta {
        if delta < 0 {
            constraints.brevity = match constraints.brevity {
                Length::Moderate => Length::Brief,
                Length::Brief => Length::Minimal,
                Length::Minimal => Length::Minimal,
            };
        }
    }
    let warmth_score = (constraints.warmth.get() as i32 + signals.warmth_delta).clamp(1, 5) as u8;
    constraints.warmth = FivePointScale::new(warmth_score);
    constraints.tools_allowed &= !signals.disable_tools;
    constraints.must_require_user_effort |= signals.must_require_user_effort;
}

fn apply_lifecycle_overrides(constraints: &mut PlanConstraints, lifecycle: LifecycleOverrides) {
    if lifecycle.potency < 0.2 {
        constraints.max_length = constraints.max_length.min(60);
        constraints.brevity = Length::Minimal;
    }
    if lifecycle.withdrawal_bias > 0.5 {
        constraints.warmth = FivePointScale::new(3);
        constraints.brevity = constraints.brevity.min(Length::Brief);
    }
}

/// Checks the §3 plan-level invariants: a V_MODE plan must require
/// return-agency and must not carry a forbidden V_MODE act tag as required;
/// an emergency plan must ground.
fn validate(plan: &ResponsePlan) -> bool {
    if plan.metadata.risk.v_mode {
        if !plan.has_act(ActType::ReturnAgency) {
            return false;
        }
        if !V_MODE_FORBIDDEN.iter().all(|tag| plan.constraints.forbidden.contains(tag)) {
            return false;
        }
    }
    if plan.metadata.risk.emergency && !plan.has_act(ActType::Ground) {
        return false;
    }
    if !plan.constraints.forbidden.is_disjoint(&plan.constraints.required) {
        return false;
    }
    true
}
