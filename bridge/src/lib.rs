//! Bridge (component F, signal aggregator): launches independent contributor
//! tasks in parallel, bounded by a deadline, and merges whatever came back
//! into one `EarlySignals`. Never fails the turn.

use std::collections::HashSet;
use std::time::Duration;

use common_types::{ActionTag, UnitInterval};
use error_types::BridgeError;
use futures::future::join_all;

/// One contributor's opinion. Every field is optional: a contributor that
/// has nothing to say for this turn returns `EarlySignal::default()`.
#[derive(Debug, Clone, Default)]
pub struct EarlySignal {
    pub forbidden: Vec<ActionTag>,
    pub required: Vec<ActionTag>,
    pub max_length: Option<u32>,
    pub brevity_delta: Option<i32>,
    pub warmth_delta: Option<i32>,
    pub disable_tools: bool,
    pub must_require_user_effort: bool,
    pub vetoes: Vec<Veto>,
    pub candidate_suggestions: Vec<CandidateSuggestion>,
    pub relapse_risk: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Veto {
    pub source: &'static str,
    pub severity: f32,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct CandidateSuggestion {
    pub source: &'static str,
    pub leading_act: common_types::ActType,
    pub confidence: f32,
}

/// Merged output of the contributor pool.
#[derive(Debug, Clone, Default)]
pub struct EarlySignals {
    pub forbidden: HashSet<ActionTag>,
    pub required: HashSet<ActionTag>,
    pub max_length: Option<u32>,
    pub brevity_delta: Option<i32>,
    pub warmth_delta: i32,
    pub disable_tools: bool,
    pub must_require_user_effort: bool,
    pub vetoes: Vec<Veto>,
    pub candidate_suggestions: Vec<CandidateSuggestion>,
    pub relapse_risk: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct EarlySignalsStatus {
    pub timed_out: bool,
    pub defaults_used: Vec<&'static str>,
    pub failures: Vec<BridgeError>,
}

/// A single contributor: a named, boxed async closure producing an
/// `EarlySignal`. Failures are caught by `gather` and treated as "no signal".
pub struct Contributor {
    pub name: &'static str,
    pub task: Box<dyn FnOnce() -> std::pin::Pin<Box<dyn std::future::Future<Output = EarlySignal> + Send>> + Send>,
}

/// Returns `EarlySignals` built entirely from nothing but contributor
/// timeouts — used when every contributor misses the deadline.
pub fn conservative_defaults() -> EarlySignals {
    EarlySignals {
        disable_tools: true,
        must_require_user_effort: true,
        max_length: Some(200),
        ..Default::default()
    }
}

/// `gather(input, deadline_ms) -> (EarlySignals, EarlySignalsStatus)`.
pub async fn gather(contributors: Vec<Contributor>, deadline_ms: u64) -> (EarlySignals, EarlySignalsStatus) {
    if contributors.is_empty() {
        return (conservative_defaults(), EarlySignalsStatus::default());
    }

    let deadline = Duration::from_millis(deadline_ms);
    let names: Vec<&'static str> = contributors.iter().map(|c| c.name).collect();

    let handles: Vec<_> = contributors
        .into_iter()
        .map(|c| tokio::spawn(async move { (c.task)().await }))
        .collect();
    let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

    let joined = tokio::time::timeout(deadline, join_all(handles)).await;

    let mut status = EarlySignalsStatus::default();
    let mut collected: Vec<EarlySignal> = Vec::new();

    match joined {
        Ok(results) => {
            for (name, result) in names.iter().zip(results.into_iter()) {
                match result {
                    Ok(signal) => collected.push(signal),
                    Err(join_err) => {
                        tracing::warn!(contributor = name, error = %join_err, "bridge contributor panicked");
                        status.defaults_used.push(name);
                        status.failures.push(BridgeError::ContributorFailed(name.to_string(), join_err.to_string()));
                    }
                }
            }
        }
        Err(_) => {
            tracing::warn!(deadline_ms, "bridge deadline elapsed before all contributors completed");
            for abort_handle in &abort_handles {
                abort_handle.abort();
            }
            status.timed_out = true;
            status.defaults_used.extend(names.iter().copied());
            status
                .failures
                .extend(names.iter().map(|n| BridgeError::ContributorTimeout(n.to_string())));
        }
    }

    if collected.is_empty() {
        return (conservative_defaults(), status);
    }

    (merge(collected), status)
}

fn merge(signals: Vec<EarlySignal>) -> EarlySignals {
    let mut out = EarlySignals::default();

    for s in signals {
        out.forbidden.extend(s.forbidden);
        out.required.extend(s.required);
        out.max_length = match (out.max_length, s.max_length) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, None) => a,
            (None, b) => b,
        };
        out.brevity_delta = match (out.brevity_delta, s.brevity_delta) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, None) => a,
            (None, b) => b,
        };
        out.warmth_delta = (out.warmth_delta + s.warmth_delta.unwrap_or(0)).clamp(-4, 4);
        out.disable_tools |= s.disable_tools;
        out.must_require_user_effort |= s.must_require_user_effort;
        out.vetoes.extend(s.vetoes);
        out.candidate_suggestions.extend(s.candidate_suggestions);
        out.relapse_risk = match (out.relapse_risk, s.relapse_risk) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
            (None, b) => b,
        };
    }

    out.candidate_suggestions
        .sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
    out.candidate_suggestions.truncate(2);

    out
}

/// Highest-severity veto, if any — used by the planner's commit step.
pub fn highest_severity_veto(signals: &EarlySignals) -> Option<&Veto> {
    signals.vetoes.iter().max_by(|a, b| a.severity.partial_cmp(&b.severity).unwrap())
}

/// Clamp a raw delta confidence into `UnitInterval` for downstream use.
pub fn confidence_of(suggestion: &CandidateSuggestion) -> UnitInterval {
    UnitInterval::new(suggestion.confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributor(name: &'static str, signal: EarlySignal) -> Contributor {
        Contributor {
            name,
            task: Box::new(move || Box::pin(async move { signal })),
        }
    }

    fn slow_contributor(name: &'static str, delay_ms: u64) -> Contributor {
        Contributor {
            name,
            task: Box::new(move || {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    EarlySignal::default()
                })
            }),
        }
    }

    #[tokio::test]
    async fn merges_max_length_as_minimum() {
        let contributors = vec![
            contributor("a", EarlySignal { max_length: Some(300), ..Default::default() }),
            contributor("b", EarlySignal { max_length: Some(150), ..Default::default() }),
        ];
        let (signals, status) = gather(contributors, 100).await;
        assert_eq!(signals.max_length, Some(150));
        assert!(!status.timed_out);
    }

    #[tokio::test]
    async fn timeout_produces_conservative_defaults() {
        let contributors = vec![slow_contributor("slow", 500)];
        let (signals, status) = gather(contributors, 10).await;
        assert!(status.timed_out);
        assert!(signals.disable_tools);
    }

    #[tokio::test]
    async fn union_of_forbidden_sets() {
        let contributors = vec![
            contributor(
                "a",
                EarlySignal { forbidden: vec![ActionTag::Recommend], ..Default::default() },
            ),
            contributor(
                "b",
                EarlySignal { forbidden: vec![ActionTag::Label], ..Default::default() },
            ),
        ];
        let (signals, _) = gather(contributors, 100).await;
        assert!(signals.forbidden.contains(&ActionTag::Recommend));
        assert!(signals.forbidden.contains(&ActionTag::Label));
    }

    #[tokio::test]
    async fn candidate_suggestions_truncated_to_two_by_confidence() {
        let contributors = vec![
            contributor(
                "a",
                EarlySignal {
                    candidate_suggestions: vec![CandidateSuggestion {
                        source: "a",
                        leading_act: common_types::ActType::Ground,
                        confidence: 0.4,
                    }],
                    ..Default::default()
                },
            ),
            contributor(
                "b",
                EarlySignal {
                    candidate_suggestions: vec![CandidateSuggestion {
                        source: "b",
                        leading_act: common_types::ActType::Hold,
                        confidence: 0.9,
                    }],
                    ..Default::default()
                },
            ),
            contributor(
                "c",
                EarlySignal {
                    candidate_suggestions: vec![CandidateSuggestion {
                        source: "c",
                        leading_act: common_types::ActType::Mirror,
                        confidence: 0.7,
                    }],
                    ..Default::default()
                },
            ),
        ];
        let (signals, _) = gather(contributors, 100).await;
        assert_eq!(signals.candidate_suggestions.len(), 2);
        assert_eq!(signals.candidate_suggestions[0].source, "b");
    }

    #[tokio::test]
    async fn empty_contributor_set_yields_conservative_defaults() {
        let (signals, status) = gather(vec![], 100).await;
        assert!(signals.disable_tools);
        assert!(!status.timed_out);
    }

    #[tokio::test]
    async fn deadline_miss_aborts_outstanding_contributors() {
        let finished = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = finished.clone();
        let contributor = Contributor {
            name: "slow",
            task: Box::new(move || {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                    EarlySignal::default()
                })
            }),
        };
        let (_, status) = gather(vec![contributor], 10).await;
        assert!(status.timed_out);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!finished.load(std::sync::atomic::Ordering::SeqCst), "aborted task still ran to completion");
    }
}
