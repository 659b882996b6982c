//! Verifier (component I): the last gate before a response leaves the
//! pipeline. Five ordered checks against the executor's output text,
//! grounded on the teacher's static regex-policy-table pattern
//! (`VulnPolicy`/`default_vulnerability_policies`), generalized from a
//! single harm panel to the full constitutional/consistency/responsibility
//! ladder spec.md §4.I describes.

use std::sync::OnceLock;

use regex::Regex;

use common_types::{Atmosphere, Language, PlanConstraints, RuntimeCategory};
use error_types::VerifierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationAction {
    Accept,
    Fallback,
    Stop,
}

#[derive(Debug, Clone)]
pub struct VerificationDecision {
    pub action: VerificationAction,
    pub violations: Vec<VerifierError>,
}

struct ConstitutionalRule {
    name: &'static str,
    pattern: Regex,
    severity: f32,
}

fn constitutional_panel() -> &'static Vec<ConstitutionalRule> {
    static INIT: OnceLock<Vec<ConstitutionalRule>> = OnceLock::new();
    INIT.get_or_init(|| {
        let table: &[(&str, &str, f32)] = &[
            (
                "forbidden_prescription",
                r"(?i)\b(you should|you must|i recommend|i advise|devi|dovresti|ti consiglio)\b",
                0.85,
            ),
            (
                "identity_assignment",
                r"(?i)\b(you are (a|an)\b.*\b(person|type)|sei (una persona|il tipo))\b",
                0.9,
            ),
            (
                "diagnostic_phrase",
                r"(?i)\b(you have (depression|anxiety|bpd|a disorder)|hai (la depressione|un disturbo))\b",
                0.95,
            ),
            (
                "dependency_creation",
                r"(?i)\b(you need me|only i can help|non posso vivere senza di te|hai bisogno di me)\b",
                0.8,
            ),
        ];
        table
            .iter()
            .map(|(name, pattern, severity)| ConstitutionalRule {
                name,
                pattern: Regex::new(pattern).unwrap(),
                severity: *severity,
            })
            .collect()
    })
}

fn grounding_lexeme_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(breath|here|now|respiro|qui|ora)\b").unwrap())
}

fn ownership_return_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| {
        Regex::new(r"(?i)\b(what do you think|your call|only you can|solo tu puoi|cosa ne pensi)\b").unwrap()
    })
}

fn responsibility_markers(category: RuntimeCategory) -> &'static [&'static str] {
    match category {
        RuntimeCategory::Mail => &["you can reply", "your decision", "rispondi tu", "decidi tu"],
        RuntimeCategory::Relation => &["how you want to handle it", "your relationship", "la tua relazione"],
        RuntimeCategory::Decision => &["your choice", "up to you", "la tua scelta", "sta a te"],
    }
}

fn agency_shift_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| {
        Regex::new(r"(?i)\b(i'?ll decide for you|i'?ll take it from here|ci penso io|decido io)\b").unwrap()
    })
}

/// `verify(output, atmosphere, v_mode, category, constraints, language) -> VerificationDecision`.
pub fn verify(
    output: &str,
    atmosphere: Atmosphere,
    v_mode: bool,
    category: RuntimeCategory,
    constraints: &PlanConstraints,
    language: Language,
) -> VerificationDecision {
    let mut violations = Vec::new();

    // 1. Constitutional regex panel.
    for rule in constitutional_panel() {
        if rule.pattern.is_match(output) {
            violations.push(VerifierError::ConstitutionalViolation(rule.name.to_string(), rule.severity));
            if rule.severity >= 0.8 {
                return VerificationDecision { action: VerificationAction::Stop, violations };
            }
        }
    }

    // 2. Atmosphere/primitive consistency.
    if atmosphere == Atmosphere::Emergency && !grounding_lexeme_regex().is_match(output) {
        violations.push(VerifierError::ResponsibilityMarkerMissing("emergency_grounding".to_string()));
        return VerificationDecision { action: VerificationAction::Fallback, violations };
    }
    if v_mode {
        let ends_interrogative = output.trim_end().ends_with('?');
        let has_ownership_return = ownership_return_regex().is_match(output);
        if !ends_interrogative && !has_ownership_return {
            violations.push(VerifierError::ResponsibilityMarkerMissing("v_mode_ownership_return".to_string()));
            return VerificationDecision { action: VerificationAction::Fallback, violations };
        }
    }

    // 3. Responsibility-return marker for MAIL/RELATION/DECISION categories.
    let lower = output.to_ascii_lowercase();
    let markers = responsibility_markers(category);
    let has_marker = markers.iter().any(|m| lower.contains(m));
    if !has_marker {
        violations.push(VerifierError::ResponsibilityMarkerMissing(format!("{:?}", category)));
        return VerificationDecision { action: VerificationAction::Fallback, violations };
    }

    // 4. Length bound, post-truncation.
    if output.len() as u32 > constraints.max_length {
        violations.push(VerifierError::LengthExceeded);
        return VerificationDecision { action: VerificationAction::Fallback, violations };
    }

    // 5. Agency-shift phrase overriding a responsibility-return marker.
    if has_marker && agency_shift_regex().is_match(output) {
        violations.push(VerifierError::AgencyShiftOverride);
        return VerificationDecision { action: VerificationAction::Stop, violations };
    }

    let _ = language;
    VerificationDecision { action: VerificationAction::Accept, violations }
}

/// Localized minimal-presence string emitted on `stop`, regardless of
/// whatever the executor actually produced.
pub fn minimal_presence(language: Language) -> &'static str {
    match language {
        Language::It => "Sono qui con te.",
        Language::Es => "Estoy aqui contigo.",
        Language::Fr => "Je suis la avec toi.",
        _ => "I'm here with you.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::FivePointScale;
    use std::collections::HashSet;

    fn constraints(max_length: u32) -> PlanConstraints {
        PlanConstraints {
            max_length,
            warmth: FivePointScale::default(),
            brevity: common_types::Length::Moderate,
            pronouns: None,
            tools_allowed: true,
            must_require_user_effort: false,
            forbidden: HashSet::new(),
            required: HashSet::new(),
            language: Language::En,
        }
    }

    #[test]
    fn prescriptive_phrase_with_high_severity_stops() {
        let decision = verify(
            "You should leave your job immediately.",
            Atmosphere::HumanField,
            false,
            RuntimeCategory::Decision,
            &constraints(500),
            Language::En,
        );
        assert_eq!(decision.action, VerificationAction::Stop);
    }

    #[test]
    fn emergency_without_grounding_lexeme_falls_back() {
        let decision = verify(
            "Everything will be fine, I promise.",
            Atmosphere::Emergency,
            false,
            RuntimeCategory::Mail,
            &constraints(500),
            Language::En,
        );
        assert_eq!(decision.action, VerificationAction::Fallback);
    }

    #[test]
    fn emergency_with_grounding_lexeme_and_marker_is_accepted() {
        let decision = verify(
            "Let's stay with your breath, here, now. What comes next is your choice.",
            Atmosphere::Emergency,
            false,
            RuntimeCategory::Decision,
            &constraints(500),
            Language::En,
        );
        assert_eq!(decision.action, VerificationAction::Accept);
    }

    #[test]
    fn v_mode_without_question_or_ownership_return_falls_back() {
        let decision = verify(
            "That sounds like a lot to carry. Your choice matters here.",
            Atmosphere::VMode,
            true,
            RuntimeCategory::Decision,
            &constraints(500),
            Language::En,
        );
        assert_eq!(decision.action, VerificationAction::Fallback);
    }

    #[test]
    fn missing_responsibility_marker_falls_back() {
        let decision = verify(
            "I understand this is hard.",
            Atmosphere::HumanField,
            false,
            RuntimeCategory::Relation,
            &constraints(500),
            Language::En,
        );
        assert_eq!(decision.action, VerificationAction::Fallback);
    }

    #[test]
    fn output_over_max_length_falls_back() {
        let long_text = format!("Up to you. {}", "x".repeat(600));
        let decision = verify(
            &long_text,
            Atmosphere::HumanField,
            false,
            RuntimeCategory::Decision,
            &constraints(100),
            Language::En,
        );
        assert_eq!(decision.action, VerificationAction::Fallback);
    }

    #[test]
    fn agency_shift_phrase_overriding_marker_stops() {
        let decision = verify(
            "Your choice matters, but I'll decide for you anyway.",
            Atmosphere::HumanField,
            false,
            RuntimeCategory::Decision,
            &constraints(500),
            Language::En,
        );
        assert_eq!(decision.action, VerificationAction::Stop);
    }

    #[test]
    fn minimal_presence_is_localized() {
        assert_eq!(minimal_presence(Language::It), "Sono qui con te.");
        assert_eq!(minimal_presence(Language::De), "I'm here with you.");
    }
}
