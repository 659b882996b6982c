use common_types::{Atmosphere, FivePointScale, Language, Length, PlanConstraints, RuntimeCategory};
use std::collections::HashSet;
use verifier::{verify, VerificationAction};

fn constraints(max_length: u32) -> PlanConstraints {
    PlanConstraints {
        max_length,
        warmth: FivePointScale::default(),
        brevity: Length::Moderate,
        pronouns: None,
        tools_allowed: true,
        must_require_user_effort: false,
        forbidden: HashSet::new(),
        required: HashSet::new(),
        language: Language::En,
    }
}

#[test]
fn diagnostic_phrase_stops_the_turn() {
    let decision = verify(
        "You have depression and should see a doctor immediately.",
        Atmosphere::HumanField,
        false,
        RuntimeCategory::Decision,
        &constraints(500),
        Language::En,
    );
    assert_eq!(decision.action, VerificationAction::Stop);
}

#[test]
fn dependency_creation_phrase_stops_the_turn() {
    let decision = verify(
        "You need me, only I can help you through this. Up to you what happens next.",
        Atmosphere::HumanField,
        false,
        RuntimeCategory::Decision,
        &constraints(500),
        Language::En,
    );
    assert_eq!(decision.action, VerificationAction::Stop);
}

#[test]
fn clean_decision_response_is_accepted() {
    let decision = verify(
        "It sounds like a hard spot to be in. Up to you how you want to move forward.",
        Atmosphere::HumanField,
        false,
        RuntimeCategory::Decision,
        &constraints(500),
        Language::En,
    );
    assert_eq!(decision.action, VerificationAction::Accept);
}
