//! Executor (component H, "L2"): dispatches a committed plan to one of
//! three runtime tiers and produces the final response text plus an audit
//! entry. Per SPEC_FULL's "L2 blindness" invariant, this crate never sees
//! raw user text beyond what `ExecutionContext` hands it — constraints and
//! primitive choice are the only inputs that shape the call.

use sha2::{Digest, Sha256};

use common_types::{Atmosphere, Depth, Language, Primitive, ProtocolSelection, ResponsePlan};
use llm_orchestrator::provider::{ChatTurn, LLMProvider};
use templates::TemplateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Surface,
    Medium,
    Deep,
}

/// Context handed to the executor. Deliberately narrow: no raw utterance,
/// no history, no field/dimensional state — only what the plan already
/// decided.
pub struct ExecutionContext<'a> {
    pub plan: &'a ResponsePlan,
    pub atmosphere: Atmosphere,
    pub language: Language,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub runtime_used: Tier,
    pub latency_ms: u64,
    pub constraints_hash: String,
    pub output_hash: String,
    pub fallback_from: Option<Tier>,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub text: String,
    pub tier: Tier,
    pub audit: AuditEntry,
}

/// `select_tier(atmosphere, arousal_high, depth) -> Tier`.
pub fn select_tier(atmosphere: Atmosphere, arousal_high: bool, depth: Depth) -> Tier {
    if atmosphere == Atmosphere::Emergency || arousal_high {
        return Tier::Surface;
    }
    match depth {
        Depth::Surface => Tier::Surface,
        Depth::Medium => Tier::Medium,
        Depth::Deep => Tier::Deep,
    }
}

/// `execute(context, tier, templates, provider) -> ExecutionResult`.
pub async fn execute(
    context: &ExecutionContext<'_>,
    tier: Tier,
    template_store: &dyn TemplateStore,
    provider: &dyn LLMProvider,
) -> ExecutionResult {
    let start = std::time::Instant::now();
    let (text, actual_tier, fallback_from) = match tier {
        Tier::Surface => (surface(context, template_store), Tier::Surface, None),
        Tier::Medium => match medium(context, provider).await {
            Some(text) => (text, Tier::Medium, None),
            None => (surface(context, template_store), Tier::Surface, Some(Tier::Medium)),
        },
        Tier::Deep => match deep(context, provider).await {
            Some(text) => (text, Tier::Deep, None),
            None => match medium(context, provider).await {
                Some(text) => (text, Tier::Medium, Some(Tier::Deep)),
                None => (surface(context, template_store), Tier::Surface, Some(Tier::Deep)),
            },
        },
    };

    let truncated = truncate_at_sentence_boundary(&text, context.plan.constraints.max_length as usize);
    let latency_ms = start.elapsed().as_millis() as u64;

    let audit = AuditEntry {
        runtime_used: actual_tier,
        latency_ms,
        constraints_hash: hash_constraints(context.plan),
        output_hash: hash_text(&truncated),
        fallback_from,
    };

    ExecutionResult { text: truncated, tier: actual_tier, audit }
}

fn surface(context: &ExecutionContext<'_>, template_store: &dyn TemplateStore) -> String {
    let primitive = leading_primitive(context.plan);
    template_store
        .get(primitive, context.language)
        .unwrap_or_else(|| template_store.get(primitive, Language::En).unwrap_or_default())
}

async fn medium(context: &ExecutionContext<'_>, provider: &dyn LLMProvider) -> Option<String> {
    let system_prompt = medium_system_prompt(context);
    let messages = [ChatTurn { role: "user", content: "Respond to the current turn.".to_string() }];
    provider
        .generate(&system_prompt, &messages, 400, 0.7)
        .await
        .ok()
        .map(|out| out.content)
}

async fn deep(context: &ExecutionContext<'_>, provider: &dyn LLMProvider) -> Option<String> {
    let analysis_prompt = format!(
        "Analyze the current turn under atmosphere {:?} with primitive {:?}. Return a short structured \
         analysis: patterns observed, what to focus on, what to avoid. Be terse.",
        context.atmosphere,
        leading_primitive(context.plan)
    );
    let analysis = provider
        .generate(&analysis_prompt, &[], 200, 0.2)
        .await
        .ok()?
        .content;

    let generation_prompt = format!(
        "{}\n\nAnalysis from the prior pass:\n{}",
        medium_system_prompt(context),
        analysis
    );
    let messages = [ChatTurn { role: "user", content: "Respond to the current turn.".to_string() }];
    provider
        .generate(&generation_prompt, &messages, 600, 0.7)
        .await
        .ok()
        .map(|out| out.content)
}

fn medium_system_prompt(context: &ExecutionContext<'_>) -> String {
    let forbidden: Vec<String> = context.plan.constraints.forbidden.iter().map(|f| format!("{:?}", f)).collect();
    let required: Vec<String> = context.plan.constraints.required.iter().map(|f| format!("{:?}", f)).collect();
    format!(
        "You are responding under atmosphere {:?}, leading primitive {:?}. \
         Rules you must not break: {}. \
         Things you must include: {}. \
         Keep the response under {} characters.",
        context.atmosphere,
        leading_primitive(context.plan),
        if forbidden.is_empty() { "none".to_string() } else { forbidden.join(", ") },
        if required.is_empty() { "none".to_string() } else { required.join(", ") },
        context.plan.constraints.max_length,
    )
}

fn leading_primitive(plan: &ResponsePlan) -> Primitive {
    // The plan carries acts, not a primitive directly; the first act's
    // dominant primitive is recovered via the shared base-acts table.
    plan.acts
        .first()
        .map(|a| primitive_for_act(a.act))
        .unwrap_or(Primitive::Acknowledge)
}

fn primitive_for_act(act: common_types::ActType) -> Primitive {
    Primitive::ALL
        .into_iter()
        .find(|p| p.base_acts().iter().any(|(a, _)| *a == act))
        .unwrap_or(Primitive::Acknowledge)
}

fn truncate_at_sentence_boundary(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut byte_len = max_len;
    while byte_len > 0 && !text.is_char_boundary(byte_len) {
        byte_len -= 1;
    }
    let window = &text[..byte_len];
    if let Some(last_boundary) = window.rfind(['.', '!', '?']) {
        window[..=last_boundary].to_string()
    } else {
        window.to_string()
    }
}

fn hash_constraints(plan: &ResponsePlan) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plan.constraints.max_length.to_le_bytes());
    hasher.update([plan.constraints.warmth.get()]);
    hasher.update(format!("{:?}{:?}", plan.constraints.forbidden, plan.constraints.required));
    format!("{:x}", hasher.finalize())
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Kept for callers that want a quick tier decision straight from a
/// selection, without separately unpacking atmosphere/depth.
pub fn select_tier_for_selection(selection: &ProtocolSelection, arousal_high: bool) -> Tier {
    select_tier(selection.atmosphere, arousal_high, selection.depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::{ActType, FivePointScale, Length, PlanConstraints, PlanMetadata, PlanSource, RiskFlags, SpeechAct, UnitInterval};
    use llm_orchestrator::provider::{Availability, FnLlmProvider, GenerateOutput, ProviderFailure};
    use std::collections::HashSet;

    fn plan(acts: Vec<SpeechAct>, max_length: u32) -> ResponsePlan {
        ResponsePlan {
            id: "test".to_string(),
            acts,
            constraints: PlanConstraints {
                max_length,
                warmth: FivePointScale::default(),
                brevity: Length::Moderate,
                pronouns: None,
                tools_allowed: true,
                must_require_user_effort: false,
                forbidden: HashSet::new(),
                required: HashSet::new(),
                language: Language::En,
            },
            metadata: PlanMetadata {
                risk: RiskFlags::default(),
                potency: 1.0,
                withdrawal_bias: 0.0,
                turn: 1,
                timestamp: chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap(),
            },
            confidence: UnitInterval::new(0.8),
            source: PlanSource::Selection,
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl LLMProvider for FailingProvider {
        async fn generate(
            &self,
            _system_prompt: &str,
            _messages: &[ChatTurn],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<GenerateOutput, ProviderFailure> {
            Err(ProviderFailure::ProviderUnavailable)
        }

        async fn check_availability(&self) -> Availability {
            Availability { available: false, provider_id: "failing".into() }
        }
    }

    #[test]
    fn emergency_atmosphere_always_selects_surface() {
        assert_eq!(select_tier(Atmosphere::Emergency, false, Depth::Deep), Tier::Surface);
    }

    #[test]
    fn high_arousal_forces_surface_regardless_of_depth() {
        assert_eq!(select_tier(Atmosphere::HumanField, true, Depth::Deep), Tier::Surface);
    }

    #[test]
    fn depth_maps_directly_to_tier_otherwise() {
        assert_eq!(select_tier(Atmosphere::HumanField, false, Depth::Medium), Tier::Medium);
        assert_eq!(select_tier(Atmosphere::Decision, false, Depth::Deep), Tier::Deep);
    }

    #[tokio::test]
    async fn surface_tier_never_calls_the_provider() {
        let p = plan(vec![SpeechAct { act: ActType::Ground, force: UnitInterval::new(0.8) }], 200);
        let ctx = ExecutionContext { plan: &p, atmosphere: Atmosphere::Emergency, language: Language::En };
        let store = templates::StaticTemplateStore::new();
        let result = execute(&ctx, Tier::Surface, &store, &FailingProvider).await;
        assert_eq!(result.tier, Tier::Surface);
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn medium_falls_back_to_surface_on_provider_error() {
        let p = plan(vec![SpeechAct { act: ActType::Validate, force: UnitInterval::new(0.7) }], 200);
        let ctx = ExecutionContext { plan: &p, atmosphere: Atmosphere::HumanField, language: Language::En };
        let store = templates::StaticTemplateStore::new();
        let result = execute(&ctx, Tier::Medium, &store, &FailingProvider).await;
        assert_eq!(result.tier, Tier::Surface);
        assert_eq!(result.audit.fallback_from, Some(Tier::Medium));
    }

    #[tokio::test]
    async fn deep_falls_back_through_medium_to_surface_on_repeated_failure() {
        let p = plan(vec![SpeechAct { act: ActType::Map, force: UnitInterval::new(0.6) }], 200);
        let ctx = ExecutionContext { plan: &p, atmosphere: Atmosphere::Decision, language: Language::En };
        let store = templates::StaticTemplateStore::new();
        let result = execute(&ctx, Tier::Deep, &store, &FailingProvider).await;
        assert_eq!(result.tier, Tier::Surface);
        assert_eq!(result.audit.fallback_from, Some(Tier::Deep));
    }

    #[tokio::test]
    async fn deep_succeeds_with_working_provider() {
        let p = plan(vec![SpeechAct { act: ActType::Map, force: UnitInterval::new(0.6) }], 500);
        let ctx = ExecutionContext { plan: &p, atmosphere: Atmosphere::Decision, language: Language::En };
        let store = templates::StaticTemplateStore::new();
        let provider = FnLlmProvider::new(|sys: &str, _msgs: &[ChatTurn]| format!("generated:{}", sys.len()));
        let result = execute(&ctx, Tier::Deep, &store, &provider).await;
        assert_eq!(result.tier, Tier::Deep);
        assert!(result.text.starts_with("generated:"));
    }

    #[test]
    fn truncation_prefers_sentence_boundary() {
        let text = "First sentence. Second sentence. Third sentence that runs long.";
        let truncated = truncate_at_sentence_boundary(text, 30);
        assert!(truncated.ends_with('.'));
        assert!(truncated.len() <= 30);
    }

    #[test]
    fn hard_truncation_when_no_sentence_boundary_in_budget() {
        let text = "anunbrokenrunoftextwithnosentenceboundaryatallwhatsoever";
        let truncated = truncate_at_sentence_boundary(text, 10);
        assert_eq!(truncated.len(), 10);
    }

    #[test]
    fn truncation_never_splits_a_multibyte_char() {
        let text = "Perché è così importante? Perché sì, è così: niente panico, respiriamo insieme.";
        for max_len in 0..text.len() {
            let truncated = truncate_at_sentence_boundary(text, max_len);
            assert!(text.is_char_boundary(truncated.len()));
        }
    }
}
