//! Selection and plan types (components E, G) plus the constraint-merge function (component A).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::{ActType, ActionTag, Primitive};
use crate::field::Language;
use crate::scalar::{FivePointScale, UnitInterval};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Atmosphere {
    Operational,
    HumanField,
    Decision,
    VMode,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Expand,
    Regulate,
    Contract,
}

/// Ordered surface < medium < deep; `min` across inputs picks the shallowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Depth {
    Surface,
    Medium,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Length {
    Minimal,
    Brief,
    Moderate,
}

/// Ordered slow < conservative < normal < responsive; the "slowest wins" merge takes `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pacing {
    Slow,
    Conservative,
    Normal,
    Responsive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tone {
    pub warmth: FivePointScale,
    pub directness: FivePointScale,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            warmth: FivePointScale::default(),
            directness: FivePointScale::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSelection {
    pub atmosphere: Atmosphere,
    pub mode: Mode,
    pub primitive: Primitive,
    pub depth: Depth,
    pub length: Length,
    pub pacing: Pacing,
    pub tone: Tone,
    pub forbidden: HashSet<ActionTag>,
    pub required: HashSet<ActionTag>,
    pub confidence: UnitInterval,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeechAct {
    pub act: ActType,
    pub force: UnitInterval,
}

/// Frozen, mergeable constraint bundle. `merge_constraints` is the single
/// point where selection, governor, and lifecycle inputs are combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConstraints {
    pub max_length: u32,
    pub warmth: FivePointScale,
    pub brevity: Length,
    pub pronouns: Option<String>,
    pub tools_allowed: bool,
    pub must_require_user_effort: bool,
    pub forbidden: HashSet<ActionTag>,
    pub required: HashSet<ActionTag>,
    pub language: Language,
}

impl Default for PlanConstraints {
    fn default() -> Self {
        Self {
            max_length: 600,
            warmth: FivePointScale::default(),
            brevity: Length::Moderate,
            pronouns: None,
            tools_allowed: true,
            must_require_user_effort: false,
            forbidden: HashSet::new(),
            required: HashSet::new(),
            language: Language::default(),
        }
    }
}

/// Depth-derived upper bound on output length; used when no narrower bound is given.
pub fn max_length_for_depth(depth: Depth) -> u32 {
    match depth {
        Depth::Surface => 200,
        Depth::Medium => 600,
        Depth::Deep => 1200,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GovernorDeltas {
    pub depth_ceiling: Option<Depth>,
    pub pacing: Option<Pacing>,
    pub tools_allowed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleDeltas {
    pub max_length_cap: Option<u32>,
    pub brevity_floor: Option<Length>,
    pub force_neutral_warmth: bool,
}

/// Combine selection, governor, and lifecycle inputs into one `PlanConstraints`:
/// depth/pacing take the most restrictive value, forbidden/required union,
/// max_length takes the minimum, tools_allowed is a conjunction.
pub fn merge_constraints(
    selection: &ProtocolSelection,
    governor: GovernorDeltas,
    lifecycle: LifecycleDeltas,
) -> PlanConstraints {
    let depth = match governor.depth_ceiling {
        Some(ceiling) => selection.depth.min(ceiling),
        None => selection.depth,
    };
    let mut max_length = max_length_for_depth(depth);
    if let Some(cap) = lifecycle.max_length_cap {
        max_length = max_length.min(cap);
    }

    let mut brevity = selection.length;
    if let Some(floor) = lifecycle.brevity_floor {
        brevity = brevity.min(floor);
    }

    let mut warmth = selection.tone.warmth;
    if lifecycle.force_neutral_warmth {
        warmth = FivePointScale::new(3);
    }

    let pacing = match governor.pacing {
        Some(g) => selection.pacing.min(g),
        None => selection.pacing,
    };
    let _ = pacing; // pacing is surfaced via ExecutionContext, not PlanConstraints itself.

    let tools_allowed = governor.tools_allowed.unwrap_or(true);

    PlanConstraints {
        max_length,
        warmth,
        brevity,
        pronouns: None,
        tools_allowed,
        must_require_user_effort: false,
        forbidden: selection.forbidden.clone(),
        required: selection.required.clone(),
        language: Language::default(),
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RiskFlags {
    pub emergency: bool,
    pub v_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanSource {
    Selection,
    Fallback,
    Emergency,
    VMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub risk: RiskFlags,
    pub potency: f32,
    pub withdrawal_bias: f32,
    pub turn: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePlan {
    pub id: String,
    pub acts: Vec<SpeechAct>,
    pub constraints: PlanConstraints,
    pub metadata: PlanMetadata,
    pub confidence: UnitInterval,
    pub source: PlanSource,
}

impl ResponsePlan {
    pub fn has_act(&self, act: ActType) -> bool {
        self.acts.iter().any(|a| a.act == act)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn base_selection() -> ProtocolSelection {
        ProtocolSelection {
            atmosphere: Atmosphere::Operational,
            mode: Mode::Regulate,
            primitive: Primitive::Validate,
            depth: Depth::Deep,
            length: Length::Moderate,
            pacing: Pacing::Responsive,
            tone: Tone::default(),
            forbidden: HashSet::new(),
            required: HashSet::new(),
            confidence: UnitInterval::new(0.9),
        }
    }

    #[test]
    fn depth_ceiling_restricts_max_length() {
        let sel = base_selection();
        let pc = merge_constraints(
            &sel,
            GovernorDeltas {
                depth_ceiling: Some(Depth::Surface),
                ..Default::default()
            },
            LifecycleDeltas::default(),
        );
        assert_eq!(pc.max_length, max_length_for_depth(Depth::Surface));
    }

    #[test]
    fn lifecycle_cap_wins_when_smaller() {
        let sel = base_selection();
        let pc = merge_constraints(
            &sel,
            GovernorDeltas::default(),
            LifecycleDeltas {
                max_length_cap: Some(60),
                brevity_floor: Some(Length::Minimal),
                force_neutral_warmth: true,
            },
        );
        assert_eq!(pc.max_length, 60);
        assert_eq!(pc.brevity, Length::Minimal);
        assert_eq!(pc.warmth.get(), 3);
    }

    #[test]
    fn tools_disallowed_by_governor_is_respected() {
        let sel = base_selection();
        let pc = merge_constraints(
            &sel,
            GovernorDeltas {
                tools_allowed: Some(false),
                ..Default::default()
            },
            LifecycleDeltas::default(),
        );
        assert!(!pc.tools_allowed);
    }
}
