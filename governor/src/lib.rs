//! Policy / Governor (component D): a fixed ordered rule list evaluated in
//! full against `FieldState`, merged into one `GovernorResult`, then checked
//! against a small set of hard invariants.

use common_types::{ActionTag, Depth, Domain, Flag, Pacing, Vertical};
use error_types::GovernorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    DomainDefault,
    Domain,
    CrossDomain,
    Constitutional,
}

#[derive(Debug, Clone, Default)]
pub struct GovernorEffect {
    pub atmosphere: Option<common_types::Atmosphere>,
    pub mode: Option<common_types::Mode>,
    pub primitive: Option<common_types::Primitive>,
    pub depth_ceiling: Option<Depth>,
    pub pacing: Option<Pacing>,
    pub forbidden: Vec<ActionTag>,
    pub required: Vec<ActionTag>,
    pub escalate: bool,
    pub l2_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct GovernorResult {
    pub rules_applied: Vec<&'static str>,
    pub effect: GovernorEffect,
}

struct Rule {
    id: &'static str,
    precedence: Precedence,
    r#override: bool,
    activate: fn(&common_types::FieldState) -> bool,
    effect: fn(&mut GovernorEffect),
}

fn rule_table() -> &'static [Rule] {
    const TABLE: &[Rule] = &[
        Rule {
            id: "default_l2_enabled",
            precedence: Precedence::DomainDefault,
            r#override: false,
            activate: |_| true,
            effect: |e| e.l2_enabled = true,
        },
        Rule {
            id: "survival_domain_emergency",
            precedence: Precedence::Domain,
            r#override: false,
            activate: |fs| {
                fs.domains
                    .iter()
                    .any(|d| d.domain == Domain::Survival && d.salience.get() >= 0.5)
            },
            effect: |e| {
                e.atmosphere = Some(common_types::Atmosphere::Emergency);
                e.depth_ceiling = Some(Depth::Surface);
                e.escalate = true;
            },
        },
        Rule {
            id: "crisis_flag_emergency",
            precedence: Precedence::Constitutional,
            r#override: true,
            activate: |fs| fs.has_flag(Flag::Crisis),
            effect: |e| {
                e.atmosphere = Some(common_types::Atmosphere::Emergency);
                e.depth_ceiling = Some(Depth::Surface);
                e.primitive = Some(common_types::Primitive::Ground);
                e.escalate = true;
            },
        },
        Rule {
            id: "delegation_requires_v_mode",
            precedence: Precedence::Constitutional,
            r#override: false,
            activate: |fs| fs.has_flag(Flag::DelegationAttempt),
            effect: |e| {
                e.atmosphere = Some(common_types::Atmosphere::VMode);
                e.primitive = Some(common_types::Primitive::ReturnAgency);
                e.required.push(ActionTag::ReturnAgency);
                e.required.push(ActionTag::ReturnOwnership);
                e.forbidden.push(ActionTag::DecideForUser);
            },
        },
        Rule {
            id: "high_arousal_forces_surface",
            precedence: Precedence::Domain,
            r#override: false,
            activate: |fs| fs.has_flag(Flag::HighArousal),
            effect: |e| {
                e.depth_ceiling = Some(Depth::Surface);
                e.pacing = Some(Pacing::Slow);
            },
        },
        Rule {
            id: "meaning_domain_forbids_prescription",
            precedence: Precedence::CrossDomain,
            r#override: false,
            activate: |fs| {
                fs.domains
                    .iter()
                    .any(|d| d.domain == Domain::Meaning && d.salience.get() >= 0.5)
            },
            effect: |e| {
                e.forbidden.push(ActionTag::Recommend);
                e.forbidden.push(ActionTag::Advise);
                e.mode = Some(common_types::Mode::Expand);
            },
        },
        Rule {
            id: "identity_domain_forbids_labeling",
            precedence: Precedence::CrossDomain,
            r#override: false,
            activate: |fs| {
                fs.domains
                    .iter()
                    .any(|d| d.domain == Domain::Identity && d.salience.get() >= 0.5)
            },
            effect: |e| {
                e.forbidden.push(ActionTag::Label);
                e.forbidden.push(ActionTag::DefineIdentity);
            },
        },
        Rule {
            id: "dependency_signal_slows_pacing",
            precedence: Precedence::Domain,
            r#override: false,
            activate: |fs| fs.has_flag(Flag::DependencySignal),
            effect: |e| {
                e.pacing = Some(Pacing::Conservative);
            },
        },
        Rule {
            id: "shutdown_disables_l2_tools",
            precedence: Precedence::Domain,
            r#override: false,
            activate: |fs| fs.has_flag(Flag::Shutdown),
            effect: |e| {
                e.l2_enabled = false;
            },
        },
    ];
    TABLE
}

/// `apply(field_state) -> GovernorResult`.
pub fn apply(field_state: &common_types::FieldState) -> GovernorResult {
    let mut rules_applied = Vec::new();
    let mut effect = GovernorEffect::default();
    let mut atmosphere_precedence: Option<Precedence> = None;
    let mut mode_precedence: Option<Precedence> = None;
    let mut primitive_precedence: Option<Precedence> = None;
    let mut depth_ceiling: Option<Depth> = None;
    let mut pacing: Option<Pacing> = None;
    let mut escalate = false;
    let mut forbidden = std::collections::HashSet::new();
    let mut required = std::collections::HashSet::new();
    let mut atmosphere = None;
    let mut mode = None;
    let mut primitive = None;

    for rule in rule_table() {
        if !(rule.activate)(field_state) {
            continue;
        }
        let mut delta = GovernorEffect::default();
        (rule.effect)(&mut delta);
        rules_applied.push(rule.id);

        if let Some(a) = delta.atmosphere {
            let wins = rule.r#override
                || atmosphere_precedence.is_none()
                || rule.precedence >= atmosphere_precedence.unwrap();
            if wins {
                atmosphere = Some(a);
                atmosphere_precedence = Some(rule.precedence);
            }
        }
        if let Some(m) = delta.mode {
            let wins = rule.r#override || mode_precedence.is_none() || rule.precedence >= mode_precedence.unwrap();
            if wins {
                mode = Some(m);
                mode_precedence = Some(rule.precedence);
            }
        }
        if let Some(p) = delta.primitive {
            let wins =
                rule.r#override || primitive_precedence.is_none() || rule.precedence >= primitive_precedence.unwrap();
            if wins {
                primitive = Some(p);
                primitive_precedence = Some(rule.precedence);
            }
        }
        if let Some(d) = delta.depth_ceiling {
            depth_ceiling = Some(depth_ceiling.map_or(d, |current| current.min(d)));
        }
        if let Some(p) = delta.pacing {
            pacing = Some(pacing.map_or(p, |current| current.min(p)));
        }
        forbidden.extend(delta.forbidden);
        required.extend(delta.required);
        escalate |= delta.escalate;
    }

    // l2_enabled is a conjunction: true unless some applied rule explicitly
    // disabled it (only `shutdown_disables_l2_tools` does, today).
    let l2_enabled = !rules_applied.iter().any(|id| *id == "shutdown_disables_l2_tools");

    GovernorResult {
        rules_applied,
        effect: GovernorEffect {
            atmosphere,
            mode,
            primitive,
            depth_ceiling,
            pacing,
            forbidden: forbidden.into_iter().collect(),
            required: required.into_iter().collect(),
            escalate,
            l2_enabled,
        },
    }
}

/// Checks the post-merge invariants listed in SPEC_FULL §4.D. A violation
/// means the rule table itself is wrong, not that the turn should fail.
pub fn check_invariants(field_state: &common_types::FieldState, result: &GovernorResult) -> Result<(), GovernorError> {
    let survival_active = field_state
        .domains
        .iter()
        .any(|d| d.domain == Domain::Survival && d.salience.get() >= 0.5);
    if survival_active && result.effect.atmosphere != Some(common_types::Atmosphere::Emergency) {
        return Err(GovernorError::InvariantViolated(
            "SURVIVAL domain active but atmosphere != Emergency".into(),
        ));
    }

    if field_state.has_flag(Flag::DelegationAttempt) && result.effect.atmosphere != Some(common_types::Atmosphere::VMode)
    {
        return Err(GovernorError::InvariantViolated(
            "delegation_attempt flag set but atmosphere != VMode".into(),
        ));
    }

    if field_state.has_flag(Flag::HighArousal) && result.effect.depth_ceiling != Some(Depth::Surface) {
        return Err(GovernorError::InvariantViolated(
            "high arousal flag set but depth_ceiling != Surface".into(),
        ));
    }

    let meaning_active = field_state
        .domains
        .iter()
        .any(|d| d.domain == Domain::Meaning && d.salience.get() >= 0.5);
    if meaning_active
        && !(result.effect.forbidden.contains(&ActionTag::Recommend)
            && result.effect.forbidden.contains(&ActionTag::Advise))
    {
        return Err(GovernorError::InvariantViolated(
            "MEANING domain active but recommend/advise not forbidden".into(),
        ));
    }

    let identity_active = field_state
        .domains
        .iter()
        .any(|d| d.domain == Domain::Identity && d.salience.get() >= 0.5);
    if identity_active
        && !(result.effect.forbidden.contains(&ActionTag::Label)
            && result.effect.forbidden.contains(&ActionTag::DefineIdentity))
    {
        return Err(GovernorError::InvariantViolated(
            "IDENTITY domain active but label/define_identity not forbidden".into(),
        ));
    }

    Ok(())
}

/// Projects a vertical-level view for callers that only care whether the
/// existential vertical is implicated (used by the planner's V_MODE check).
pub fn implicates_vertical(field_state: &common_types::FieldState, vertical: Vertical) -> bool {
    field_state.domains.iter().any(|d| d.domain.vertical() == vertical && d.salience.get() >= 0.5)
}
