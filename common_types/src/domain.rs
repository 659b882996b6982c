//! Domain/vertical taxonomy and the primitive -> speech-act table.

use serde::{Deserialize, Serialize};

/// 17 horizontal content domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Survival,
    Body,
    Health,
    Safety,
    Social,
    Conflict,
    Loss,
    Emotion,
    Work,
    Decision,
    Time,
    Finance,
    Cognition,
    Meaning,
    Identity,
    Creativity,
    Spirituality,
}

impl Domain {
    pub const ALL: [Domain; 17] = [
        Domain::Survival,
        Domain::Body,
        Domain::Health,
        Domain::Safety,
        Domain::Social,
        Domain::Conflict,
        Domain::Loss,
        Domain::Emotion,
        Domain::Work,
        Domain::Decision,
        Domain::Time,
        Domain::Finance,
        Domain::Cognition,
        Domain::Meaning,
        Domain::Identity,
        Domain::Creativity,
        Domain::Spirituality,
    ];

    /// Fixed projection used by the dimensional detector.
    pub fn vertical(self) -> Vertical {
        match self {
            Domain::Survival | Domain::Body | Domain::Health | Domain::Safety => {
                Vertical::Somatic
            }
            Domain::Work | Domain::Decision | Domain::Time | Domain::Finance | Domain::Cognition => {
                Vertical::Functional
            }
            Domain::Social | Domain::Conflict | Domain::Loss | Domain::Emotion => {
                Vertical::Relational
            }
            Domain::Meaning | Domain::Identity | Domain::Creativity => Vertical::Existential,
            Domain::Spirituality => Vertical::Transcendent,
        }
    }
}

/// 5 verticals, orthogonal to the horizontal domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vertical {
    Somatic,
    Functional,
    Relational,
    Existential,
    Transcendent,
}

impl Vertical {
    pub const ALL: [Vertical; 5] = [
        Vertical::Somatic,
        Vertical::Functional,
        Vertical::Relational,
        Vertical::Existential,
        Vertical::Transcendent,
    ];
}

/// The 14 named primitives (P01..P14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Ground,
    Validate,
    Reflect,
    Open,
    Crystallize,
    ReturnAgency,
    HoldSpace,
    MapDecision,
    Inform,
    CompleteTask,
    Invite,
    Acknowledge,
    ReflectRelation,
    HoldIdentity,
}

impl Primitive {
    pub const ALL: [Primitive; 14] = [
        Primitive::Ground,
        Primitive::Validate,
        Primitive::Reflect,
        Primitive::Open,
        Primitive::Crystallize,
        Primitive::ReturnAgency,
        Primitive::HoldSpace,
        Primitive::MapDecision,
        Primitive::Inform,
        Primitive::CompleteTask,
        Primitive::Invite,
        Primitive::Acknowledge,
        Primitive::ReflectRelation,
        Primitive::HoldIdentity,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Primitive::Ground => "P01",
            Primitive::Validate => "P02",
            Primitive::Reflect => "P03",
            Primitive::Open => "P04",
            Primitive::Crystallize => "P05",
            Primitive::ReturnAgency => "P06",
            Primitive::HoldSpace => "P07",
            Primitive::MapDecision => "P08",
            Primitive::Inform => "P09",
            Primitive::CompleteTask => "P10",
            Primitive::Invite => "P11",
            Primitive::Acknowledge => "P12",
            Primitive::ReflectRelation => "P13",
            Primitive::HoldIdentity => "P14",
        }
    }

    /// The fixed primitive -> base acts table used by S3a candidate generation.
    pub fn base_acts(self) -> &'static [(ActType, f32)] {
        match self {
            Primitive::Ground => &[(ActType::Ground, 0.8)],
            Primitive::Validate => &[(ActType::Validate, 0.7), (ActType::Acknowledge, 0.3)],
            Primitive::Reflect => &[(ActType::Mirror, 0.6)],
            Primitive::Open => &[(ActType::Question, 0.5), (ActType::OfferFrame, 0.3)],
            Primitive::Crystallize => &[(ActType::Name, 0.6), (ActType::Map, 0.4)],
            Primitive::ReturnAgency => &[(ActType::ReturnAgency, 0.9)],
            Primitive::HoldSpace => &[(ActType::Hold, 0.8)],
            Primitive::MapDecision => &[(ActType::Map, 0.7), (ActType::Question, 0.3)],
            Primitive::Inform => &[(ActType::OfferFrame, 0.6)],
            Primitive::CompleteTask => &[(ActType::Acknowledge, 0.5), (ActType::OfferFrame, 0.4)],
            Primitive::Invite => &[(ActType::Question, 0.5)],
            Primitive::Acknowledge => &[(ActType::Acknowledge, 0.6)],
            Primitive::ReflectRelation => &[(ActType::Mirror, 0.5), (ActType::Validate, 0.4)],
            Primitive::HoldIdentity => &[(ActType::Hold, 0.6), (ActType::Boundary, 0.4)],
        }
    }
}

/// Speech act vocabulary for `ResponsePlan.acts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActType {
    Ground,
    Validate,
    Mirror,
    Acknowledge,
    Hold,
    Name,
    Map,
    Question,
    Boundary,
    ReturnAgency,
    OfferFrame,
}

/// Closed set of action tags used for `forbidden`/`required` constraint sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionTag {
    Recommend,
    Advise,
    DecideForUser,
    Label,
    DefineIdentity,
    Prescribe,
    MeaningAssignment,
    IdentityLabeling,
    ReturnAgency,
    ReturnOwnership,
}

/// The forbidden-prescription set referenced by the V_MODE invariant.
pub const V_MODE_FORBIDDEN: &[ActionTag] = &[
    ActionTag::Recommend,
    ActionTag::DecideForUser,
    ActionTag::Label,
    ActionTag::DefineIdentity,
    ActionTag::Prescribe,
    ActionTag::MeaningAssignment,
    ActionTag::IdentityLabeling,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_domain_has_a_vertical() {
        for d in Domain::ALL {
            let _ = d.vertical();
        }
    }

    #[test]
    fn survival_is_somatic() {
        assert_eq!(Domain::Survival.vertical(), Vertical::Somatic);
        assert_eq!(Domain::Spirituality.vertical(), Vertical::Transcendent);
    }

    #[test]
    fn every_primitive_has_base_acts() {
        for p in Primitive::ALL {
            assert!(!p.base_acts().is_empty());
            assert!(p.base_acts().len() <= 3);
        }
    }

    #[test]
    fn return_agency_primitive_contains_return_agency_act() {
        let acts: Vec<ActType> = Primitive::ReturnAgency
            .base_acts()
            .iter()
            .map(|(a, _)| *a)
            .collect();
        assert!(acts.contains(&ActType::ReturnAgency));
    }
}
