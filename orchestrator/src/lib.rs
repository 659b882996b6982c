//! Orchestrator (component M): the single entry point that drives one turn
//! through PERMIT -> SENSE -> CLARIFY -> PLAN -> ACT -> VERIFY -> STOP,
//! owning the turn-level deadline and every cross-component wiring decision.
//! Every other crate in this workspace is a pure function or a narrow trait;
//! this is the only place that knows the full shape of a turn.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common_types::{
    ActionTag, Arousal, Atmosphere, Flag, Language, LifecycleState, Primitive, RuntimeCategory, Session,
};
use config::{ContributorProfile, PipelineConfig};
use governor::GovernorResult;
use lifecycle::{CycleDecision, CycleOutcome, RandomSource, ThreadRngSource};
use llm_orchestrator::provider::LLMProvider;
use memory::{Episode, MemoryStore, RegulatoryDelta, RegulatoryState, WorkingMemory};
use observability::{Event, EventType, Observer};
use patterns::PatternLibrary;
use templates::TemplateStore;
use verifier::VerificationAction;

const WORKING_MEMORY_CAPACITY: usize = 20;
const MAX_VERIFY_RETRIES: u32 = 2;

/// Everything a caller needs from one turn: the text that actually left the
/// pipeline, what it cost to produce, and the updated lifecycle state the
/// caller is responsible for persisting alongside the session (mirrors
/// `common_types::Session` not embedding `LifecycleState` itself).
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub text: String,
    pub tier: executor::Tier,
    pub success: bool,
    pub turn: u32,
    pub correlation_id: String,
    pub atmosphere: Atmosphere,
    pub primitive: Primitive,
    pub required: HashSet<ActionTag>,
    pub lifecycle_state: LifecycleState,
}

pub struct Orchestrator {
    template_store: Arc<dyn TemplateStore>,
    provider: Arc<dyn LLMProvider>,
    memory_store: Arc<dyn MemoryStore>,
    pattern_library: Arc<dyn PatternLibrary>,
    observer: Arc<Observer>,
    config: PipelineConfig,
    working_memory: Mutex<HashMap<String, WorkingMemory>>,
}

impl Orchestrator {
    pub fn new(
        template_store: Arc<dyn TemplateStore>,
        provider: Arc<dyn LLMProvider>,
        memory_store: Arc<dyn MemoryStore>,
        pattern_library: Arc<dyn PatternLibrary>,
        observer: Arc<Observer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            template_store,
            provider,
            memory_store,
            pattern_library,
            observer,
            config,
            working_memory: Mutex::new(HashMap::new()),
        }
    }

    /// Drives one turn to completion, bounded by `config.turn_deadline_ms`.
    /// A deadline breach never panics or propagates an error: it produces a
    /// tagged fallback `TurnOutput` with `success: false`.
    pub async fn run_turn(&self, session: &mut Session, lifecycle_state: LifecycleState, utterance: &str) -> TurnOutput {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let deadline = Duration::from_millis(self.config.turn_deadline_ms);

        match tokio::time::timeout(deadline, self.run_turn_inner(session, lifecycle_state, utterance, &correlation_id))
            .await
        {
            Ok(output) => output,
            Err(_) => {
                tracing::warn!(correlation_id, turn_deadline_ms = self.config.turn_deadline_ms, "turn deadline exceeded");
                self.observer.emit(
                    Event::new(EventType::PipelineEnd, correlation_id.clone())
                        .with_session(session.id.clone(), session.turn)
                        .with_payload(serde_json::json!({"success": false, "reason": "turn_deadline_exceeded"})),
                );
                TurnOutput {
                    text: verifier::minimal_presence(session.language).to_string(),
                    tier: executor::Tier::Surface,
                    success: false,
                    turn: session.turn,
                    correlation_id,
                    atmosphere: Atmosphere::HumanField,
                    primitive: Primitive::Acknowledge,
                    required: HashSet::new(),
                    lifecycle_state,
                }
            }
        }
    }

    async fn run_turn_inner(
        &self,
        session: &mut Session,
        lifecycle_state: LifecycleState,
        utterance: &str,
        correlation_id: &str,
    ) -> TurnOutput {
        let start = std::time::Instant::now();
        self.observer.emit(
            Event::new(EventType::PipelineStart, correlation_id.to_string())
                .with_session(session.id.clone(), session.turn),
        );

        // PERMIT: advance the turn counter and dissipate lifecycle state.
        let turn = session.begin_turn();
        let mut rng: Box<dyn RandomSource> = Box::new(ThreadRngSource);
        let dissipation = lifecycle_dissipation_config(&self.config.dissipation);
        let CycleOutcome { state: lifecycle_after, decision: lifecycle_decision } =
            lifecycle::cycle(lifecycle_state, dissipation, rng.as_mut());

        if lifecycle_decision == CycleDecision::ForceExit || lifecycle_decision == CycleDecision::Withdraw {
            self.observer.emit(
                Event::new(EventType::RubiconWithdraw, correlation_id.to_string())
                    .with_session(session.id.clone(), turn),
            );
            return self.minimal_presence_turn(session, turn, lifecycle_after, correlation_id, start);
        }

        // SENSE.
        let history: Vec<String> = session.history.iter().cloned().collect();
        let field_state = perception::perceive(utterance, &history);
        session.record_utterance(utterance);
        let dimensional_state = dimensional::detect(&field_state, None);
        let governor_result = governor::apply(&field_state);
        if let Err(e) = governor::check_invariants(&field_state, &governor_result) {
            tracing::error!(correlation_id, error = %e, "governor invariant violated");
        }

        // CLARIFY: selection plus the curver's bounded-shrink pass.
        let selection_context = selection::SelectionContext { loop_count: field_state.loop_count };
        let selection = selection::select(&field_state, &dimensional_state, &governor_result, selection_context);
        let (manifold, diagnostics) = derive_field_diagnostics(&dimensional_state, &lifecycle_after, lifecycle_decision);
        let (curved, _curvature_trace) = selection::curve(selection, manifold, diagnostics);

        let risk = common_types::RiskFlags {
            emergency: curved.atmosphere == Atmosphere::Emergency,
            v_mode: curved.atmosphere == Atmosphere::VMode,
        };

        // PLAN: S3a candidate generation runs alongside the bridge's signal gather.
        let regulatory = self.memory_store.get(&session.subject_id).unwrap_or_default();
        let contributors = self.build_contributors(&field_state, utterance, &lifecycle_decision, &governor_result, &regulatory);
        let selection_for_candidates = curved.clone();
        let (candidate_set, (signals, status)) = tokio::join!(
            async move { planner::generate_candidates(&selection_for_candidates, risk, turn) },
            bridge::gather(contributors, self.config.bridge_deadline_ms)
        );
        if status.timed_out {
            tracing::warn!(correlation_id, "bridge contributors missed the deadline");
        }

        let committed = planner::commit(
            candidate_set,
            &signals,
            &status,
            planner::LifecycleOverrides { potency: lifecycle_after.potency, withdrawal_bias: lifecycle_after.withdrawal_bias },
        );
        for event in &committed.events {
            let planner::PlanEvent::VetoByConstitution { reason } = event;
            self.observer.emit(
                Event::new(EventType::BoundaryBlocked, correlation_id.to_string())
                    .with_session(session.id.clone(), turn)
                    .with_payload(serde_json::json!({"reason": reason})),
            );
        }

        // ACT / VERIFY, retrying at a lower tier on a soft fallback.
        let mut tier = executor::select_tier(curved.atmosphere, field_state.arousal == Arousal::High, curved.depth);
        let mut retries = 0;
        let v_mode = curved.atmosphere == Atmosphere::VMode;
        let primitive = leading_primitive(&committed.plan);
        let category = category_for(primitive);

        let (final_text, final_tier, action) = loop {
            let ctx = executor::ExecutionContext { plan: &committed.plan, atmosphere: curved.atmosphere, language: field_state.language };
            let result = executor::execute(&ctx, tier, self.template_store.as_ref(), self.provider.as_ref()).await;
            if result.audit.fallback_from.is_some() {
                self.observer.emit(
                    Event::new(EventType::ProviderFailover, correlation_id.to_string())
                        .with_session(session.id.clone(), turn),
                );
            }

            let decision = verifier::verify(
                &result.text,
                curved.atmosphere,
                v_mode,
                category,
                &committed.plan.constraints,
                field_state.language,
            );

            match decision.action {
                VerificationAction::Accept => break (result.text, result.tier, decision.action),
                VerificationAction::Stop => {
                    self.observer.emit(
                        Event::new(EventType::BoundaryBlocked, correlation_id.to_string())
                            .with_session(session.id.clone(), turn),
                    );
                    break (result.text, result.tier, decision.action);
                }
                VerificationAction::Fallback => {
                    self.observer.emit(
                        Event::new(EventType::VerifyFailed, correlation_id.to_string())
                            .with_session(session.id.clone(), turn),
                    );
                    if decision
                        .violations
                        .iter()
                        .any(|v| matches!(v, error_types::VerifierError::ResponsibilityMarkerMissing(_)))
                    {
                        self.observer.emit(
                            Event::new(EventType::ResponsibilityReturnMissing, correlation_id.to_string())
                                .with_session(session.id.clone(), turn),
                        );
                    }
                    if retries >= MAX_VERIFY_RETRIES || tier == executor::Tier::Surface {
                        break (result.text, result.tier, decision.action);
                    }
                    tier = lower_tier(tier);
                    retries += 1;
                }
            }
        };

        let success = action == VerificationAction::Accept;
        let text = if success {
            self.observer.emit(
                Event::new(EventType::ResponsibilityReturned, correlation_id.to_string())
                    .with_session(session.id.clone(), turn),
            );
            final_text
        } else {
            verifier::minimal_presence(field_state.language).to_string()
        };

        // STOP: persist state and record the episode.
        session.record_response(&text);
        self.store_regulatory(session, &lifecycle_after, &field_state);
        self.record_episode(session, utterance, &text, primitive, &field_state);

        self.observer.emit(
            Event::new(EventType::PipelineEnd, correlation_id.to_string())
                .with_session(session.id.clone(), turn)
                .with_payload(serde_json::json!({
                    "success": success,
                    "duration_ms": start.elapsed().as_millis() as f64,
                })),
        );

        TurnOutput {
            text,
            tier: final_tier,
            success,
            turn,
            correlation_id: correlation_id.to_string(),
            atmosphere: curved.atmosphere,
            primitive,
            required: committed.plan.constraints.required.clone(),
            lifecycle_state: lifecycle_after,
        }
    }

    /// PERMIT's short-circuit branch: lifecycle exhaustion or a withdrawal
    /// draw both skip SENSE onward and ship minimal presence only.
    fn minimal_presence_turn(
        &self,
        session: &mut Session,
        turn: u32,
        lifecycle_after: LifecycleState,
        correlation_id: &str,
        start: std::time::Instant,
    ) -> TurnOutput {
        let text = verifier::minimal_presence(session.language).to_string();
        session.record_response(&text);
        self.observer.emit(
            Event::new(EventType::PipelineEnd, correlation_id.to_string())
                .with_session(session.id.clone(), turn)
                .with_payload(serde_json::json!({
                    "success": false,
                    "duration_ms": start.elapsed().as_millis() as f64,
                })),
        );
        TurnOutput {
            text,
            tier: executor::Tier::Surface,
            success: false,
            turn,
            correlation_id: correlation_id.to_string(),
            atmosphere: Atmosphere::HumanField,
            primitive: Primitive::Acknowledge,
            required: HashSet::new(),
            lifecycle_state: lifecycle_after,
        }
    }

    fn store_regulatory(&self, session: &Session, lifecycle_after: &LifecycleState, field_state: &common_types::FieldState) {
        let delegation_seen = field_state.has_flag(Flag::DelegationAttempt);
        let previous = self.memory_store.get(&session.subject_id).unwrap_or_default();
        let delegation_trend = previous.delegation_trend * 0.9 + if delegation_seen { 0.1 } else { 0.0 };
        self.memory_store.update(
            &session.subject_id,
            RegulatoryDelta {
                potency: Some(lifecycle_after.potency),
                withdrawal_bias: Some(lifecycle_after.withdrawal_bias),
                delegation_trend: Some(delegation_trend),
                autonomy_trajectory: Some(lifecycle_after.autonomy_trajectory),
            },
        );
    }

    fn record_episode(
        &self,
        session: &Session,
        utterance: &str,
        output: &str,
        primitive: Primitive,
        field_state: &common_types::FieldState,
    ) {
        let episode = Episode {
            id: uuid::Uuid::new_v4().to_string(),
            ts: chrono::Utc::now(),
            utterance: utterance.to_string(),
            field_snapshot: serde_json::to_value(field_state).unwrap_or_else(|_| serde_json::json!({})),
            primitive_used: primitive.code().to_string(),
            output: output.to_string(),
            outcome_flags: field_state.flags.iter().map(|f| format!("{f:?}")).collect(),
            emotional_salience: field_state.domains.first().map(|d| d.salience.get()).unwrap_or(0.0),
            novelty: field_state.uncertainty,
        };
        let mut memories = self.working_memory.lock().unwrap();
        memories
            .entry(session.id.clone())
            .or_insert_with(|| WorkingMemory::new(WORKING_MEMORY_CAPACITY))
            .push(episode);
    }

    /// Builds the subset of contributor tasks enabled for the configured
    /// profile. Every contributor is grounded on a concrete upstream signal
    /// (perception flags, the pattern library, the lifecycle decision, or
    /// observability's own metrics) — none invent opinions from nothing.
    fn build_contributors(
        &self,
        field_state: &common_types::FieldState,
        utterance: &str,
        lifecycle_decision: &CycleDecision,
        governor_result: &GovernorResult,
        regulatory: &RegulatoryState,
    ) -> Vec<bridge::Contributor> {
        let mut out = Vec::new();
        for name in self.config.contributor_profile.enabled_contributors() {
            let contributor = match *name {
                "memory" => Some(contributor_memory(*regulatory)),
                "delegation_predictor" => Some(contributor_delegation_predictor(field_state)),
                "metacognitive" => Some(contributor_metacognitive(field_state)),
                "temporal" => Some(contributor_temporal(field_state)),
                "lifecycle_policy" => Some(contributor_lifecycle_policy(*lifecycle_decision)),
                "swarm_veto" => Some(contributor_swarm_veto(governor_result)),
                "pattern_suggestion" => Some(contributor_pattern_suggestion(self.pattern_library.as_ref(), utterance)),
                "second_order_observer" => Some(contributor_second_order_observer(self.observer.as_ref())),
                other => {
                    tracing::warn!(contributor = other, "unknown contributor name in profile, skipping");
                    None
                }
            };
            if let Some(c) = contributor {
                out.push(c);
            }
        }
        out
    }
}

fn lifecycle_dissipation_config(cfg: &config::DissipationConfig) -> lifecycle::DissipationConfig {
    lifecycle::DissipationConfig {
        potency_decay: cfg.potency_decay,
        withdrawal_increment: cfg.withdrawal_increment,
        force_exit_threshold: cfg.force_exit_threshold,
    }
}

/// Derives the curver's stochastic-field inputs from the dimensional and
/// lifecycle state. `free_energy`/`entropy` track the field's own tension
/// and lack of integration; `stable`/`potential` track whether the session
/// is dissipating toward withdrawal. This mapping is an explicit design
/// decision (no upstream component hands these over directly) recorded in
/// the grounding ledger.
fn derive_field_diagnostics(
    ds: &common_types::DimensionalState,
    lifecycle_after: &LifecycleState,
    lifecycle_decision: CycleDecision,
) -> (selection::ManifoldState, selection::FieldDiagnostics) {
    let free_energy = ds.integration.tension;
    let entropy = (1.0 - ds.integration.phi).clamp(0.0, 1.0);
    let stable = lifecycle_decision == CycleDecision::Continue && !lifecycle_after.force_exit_triggered;
    let potential = lifecycle_after.withdrawal_bias;
    (
        selection::ManifoldState { stable, potential },
        selection::FieldDiagnostics { free_energy, entropy },
    )
}

/// Maps a primitive to the responsibility-return category it is templated
/// for (see `templates`' marker-embedding); every primitive's canonical
/// template contains a substring from exactly one of these three marker
/// lists, so this mapping is read off the templates, not invented.
fn category_for(primitive: Primitive) -> RuntimeCategory {
    match primitive {
        Primitive::ReflectRelation => RuntimeCategory::Relation,
        Primitive::Crystallize | Primitive::ReturnAgency | Primitive::MapDecision => RuntimeCategory::Decision,
        _ => RuntimeCategory::Mail,
    }
}

/// Recovers the leading primitive from a committed plan's first act. Mirrors
/// the executor's own private `leading_primitive`/`primitive_for_act`, which
/// this crate cannot call directly.
fn leading_primitive(plan: &common_types::ResponsePlan) -> Primitive {
    plan.acts.first().map(|a| primitive_for_act(a.act)).unwrap_or(Primitive::Acknowledge)
}

fn primitive_for_act(act: common_types::ActType) -> Primitive {
    Primitive::ALL
        .into_iter()
        .find(|p| p.base_acts().iter().any(|(a, _)| *a == act))
        .unwrap_or(Primitive::Acknowledge)
}

fn lower_tier(tier: executor::Tier) -> executor::Tier {
    match tier {
        executor::Tier::Deep => executor::Tier::Medium,
        executor::Tier::Medium => executor::Tier::Surface,
        executor::Tier::Surface => executor::Tier::Surface,
    }
}

fn contributor_memory(regulatory: RegulatoryState) -> bridge::Contributor {
    let relapse_risk = (-regulatory.autonomy_trajectory).clamp(0.0, 1.0);
    bridge::Contributor {
        name: "memory",
        task: Box::new(move || {
            Box::pin(async move { bridge::EarlySignal { relapse_risk: Some(relapse_risk), ..Default::default() } })
        }),
    }
}

fn contributor_delegation_predictor(field_state: &common_types::FieldState) -> bridge::Contributor {
    let delegation_attempt = field_state.has_flag(Flag::DelegationAttempt);
    bridge::Contributor {
        name: "delegation_predictor",
        task: Box::new(move || {
            Box::pin(async move {
                if delegation_attempt {
                    bridge::EarlySignal {
                        required: vec![ActionTag::ReturnAgency],
                        candidate_suggestions: vec![bridge::CandidateSuggestion {
                            source: "delegation_predictor",
                            leading_act: common_types::ActType::ReturnAgency,
                            confidence: 0.8,
                        }],
                        ..Default::default()
                    }
                } else {
                    bridge::EarlySignal::default()
                }
            })
        }),
    }
}

fn contributor_metacognitive(field_state: &common_types::FieldState) -> bridge::Contributor {
    let high_uncertainty = field_state.uncertainty > 0.6;
    bridge::Contributor {
        name: "metacognitive",
        task: Box::new(move || {
            Box::pin(async move {
                if high_uncertainty {
                    bridge::EarlySignal { brevity_delta: Some(-1), forbidden: vec![ActionTag::Recommend], ..Default::default() }
                } else {
                    bridge::EarlySignal::default()
                }
            })
        }),
    }
}

fn contributor_temporal(field_state: &common_types::FieldState) -> bridge::Contributor {
    let past_heavy = field_state.temporal.past_salience > 0.7;
    bridge::Contributor {
        name: "temporal",
        task: Box::new(move || {
            Box::pin(async move {
                if past_heavy {
                    bridge::EarlySignal { warmth_delta: Some(1), ..Default::default() }
                } else {
                    bridge::EarlySignal::default()
                }
            })
        }),
    }
}

fn contributor_lifecycle_policy(decision: CycleDecision) -> bridge::Contributor {
    bridge::Contributor {
        name: "lifecycle_policy",
        task: Box::new(move || {
            Box::pin(async move {
                if decision == CycleDecision::Withdraw {
                    bridge::EarlySignal { disable_tools: true, must_require_user_effort: true, ..Default::default() }
                } else {
                    bridge::EarlySignal::default()
                }
            })
        }),
    }
}

fn contributor_swarm_veto(governor_result: &GovernorResult) -> bridge::Contributor {
    let escalate = governor_result.effect.escalate;
    bridge::Contributor {
        name: "swarm_veto",
        task: Box::new(move || {
            Box::pin(async move {
                if escalate {
                    bridge::EarlySignal {
                        vetoes: vec![bridge::Veto {
                            source: "swarm_veto",
                            severity: 0.85,
                            reason: "governor escalation flag set".to_string(),
                        }],
                        ..Default::default()
                    }
                } else {
                    bridge::EarlySignal::default()
                }
            })
        }),
    }
}

fn contributor_pattern_suggestion(library: &dyn PatternLibrary, utterance: &str) -> bridge::Contributor {
    let matched = library.matches(utterance);
    let suggestions: Vec<(PatternCategoryOwned, f32)> =
        matched.iter().map(|p| (PatternCategoryOwned(p.category), p.confidence_prior)).collect();
    bridge::Contributor {
        name: "pattern_suggestion",
        task: Box::new(move || {
            Box::pin(async move {
                let candidate_suggestions = suggestions
                    .iter()
                    .map(|(category, confidence)| bridge::CandidateSuggestion {
                        source: "pattern_suggestion",
                        leading_act: act_for_pattern_category(category.0),
                        confidence: *confidence,
                    })
                    .collect();
                bridge::EarlySignal { candidate_suggestions, ..Default::default() }
            })
        }),
    }
}

/// `patterns::PatternCategory` is `Copy`; this wrapper exists only so the
/// captured vector type is explicit at the closure boundary.
struct PatternCategoryOwned(patterns::PatternCategory);

fn act_for_pattern_category(category: patterns::PatternCategory) -> common_types::ActType {
    match category {
        patterns::PatternCategory::Delegation => common_types::ActType::ReturnAgency,
        patterns::PatternCategory::Dependency => common_types::ActType::Hold,
        patterns::PatternCategory::Crisis => common_types::ActType::Ground,
        patterns::PatternCategory::Relational => common_types::ActType::Mirror,
        patterns::PatternCategory::Decisional => common_types::ActType::Map,
    }
}

fn contributor_second_order_observer(observer: &Observer) -> bridge::Contributor {
    let snapshot = observer.metrics_snapshot();
    let degraded = snapshot.total_pipelines > 10 && snapshot.success_rate < 0.5;
    bridge::Contributor {
        name: "second_order_observer",
        task: Box::new(move || {
            Box::pin(async move {
                if degraded {
                    bridge::EarlySignal { brevity_delta: Some(-1), disable_tools: true, ..Default::default() }
                } else {
                    bridge::EarlySignal::default()
                }
            })
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_orchestrator::provider::NullLlmProvider;
    use memory::InMemoryStore;
    use templates::StaticTemplateStore;

    fn test_orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(StaticTemplateStore::new()),
            Arc::new(NullLlmProvider),
            Arc::new(InMemoryStore::new()),
            Arc::new(patterns::StaticPatternLibrary::new()),
            Arc::new(Observer::new()),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn a_turn_always_produces_nonempty_text() {
        let orchestrator = test_orchestrator();
        let mut session = Session::new("s1", "subj1");
        let output = orchestrator.run_turn(&mut session, LifecycleState::default(), "I don't know what to do").await;
        assert!(!output.text.is_empty());
        assert_eq!(output.turn, 1);
    }

    #[tokio::test]
    async fn crisis_utterance_stays_on_surface_tier() {
        let orchestrator = test_orchestrator();
        let mut session = Session::new("s2", "subj2");
        let output = orchestrator
            .run_turn(&mut session, LifecycleState::default(), "I can't breathe, my heart is pounding, I'm scared")
            .await;
        assert_eq!(output.tier, executor::Tier::Surface);
        assert_eq!(output.atmosphere, Atmosphere::Emergency);
    }

    #[tokio::test]
    async fn delegation_attempt_requires_return_agency() {
        let orchestrator = test_orchestrator();
        let mut session = Session::new("s3", "subj3");
        let output = orchestrator
            .run_turn(&mut session, LifecycleState::default(), "Tell me what to do, cosa dovrei fare?")
            .await;
        assert!(output.required.contains(&ActionTag::ReturnAgency));
        assert_eq!(output.atmosphere, Atmosphere::VMode);
    }

    #[test]
    fn category_for_maps_relation_primitive_correctly() {
        assert_eq!(category_for(Primitive::ReflectRelation), RuntimeCategory::Relation);
        assert_eq!(category_for(Primitive::MapDecision), RuntimeCategory::Decision);
        assert_eq!(category_for(Primitive::Ground), RuntimeCategory::Mail);
    }

    #[test]
    fn lower_tier_never_rises() {
        assert_eq!(lower_tier(executor::Tier::Deep), executor::Tier::Medium);
        assert_eq!(lower_tier(executor::Tier::Medium), executor::Tier::Surface);
        assert_eq!(lower_tier(executor::Tier::Surface), executor::Tier::Surface);
    }

    #[tokio::test]
    async fn force_exit_short_circuits_to_minimal_presence_before_sense() {
        let orchestrator = test_orchestrator();
        let mut session = Session::new("s4", "subj4");
        let exhausted = LifecycleState { potency: 0.05, force_exit_triggered: true, ..LifecycleState::default() };
        let output = orchestrator.run_turn(&mut session, exhausted, "anything at all").await;
        assert!(!output.success);
        assert_eq!(output.text, verifier::minimal_presence(session.language));
        assert_eq!(output.tier, executor::Tier::Surface);
        assert!(output.lifecycle_state.force_exit_triggered);
    }
}
