//! Typed event stream and rolling metrics (component L).
//!
//! Grounded on the teacher's `self_critic` capped-history pattern,
//! generalized from a single criticism log to a typed, subscribable event
//! ring with latency percentiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const EVENT_RING_CAPACITY: usize = 1000;
const LATENCY_WINDOW: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    PipelineStart,
    PipelineEnd,
    StateTransition,
    BoundaryBlocked,
    VerifyFailed,
    RubiconWithdraw,
    ProviderFailover,
    ResponsibilityReturned,
    ResponsibilityReturnMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub ts: DateTime<Utc>,
    pub session_id: Option<String>,
    pub turn: Option<u32>,
    pub correlation_id: String,
    /// Free-form structured payload (e.g. duration_ms, success, violations).
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: EventType, correlation_id: impl Into<String>) -> Self {
        Self {
            event_type,
            ts: Utc::now(),
            session_id: None,
            turn: None,
            correlation_id: correlation_id.into(),
            payload: serde_json::json!({}),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>, turn: u32) -> Self {
        self.session_id = Some(session_id.into());
        self.turn = Some(turn);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_pipelines: u64,
    pub success_count: u64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub success_rate: f64,
}

type Handler = Box<dyn Fn(&Event) + Send + Sync>;

struct Subscription {
    id: u64,
    handler: Handler,
}

struct Inner {
    events: VecDeque<Event>,
    latencies_ms: VecDeque<f64>,
    subscriptions: Vec<Subscription>,
    total_pipelines: u64,
    success_count: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
            latencies_ms: VecDeque::new(),
            subscriptions: Vec::new(),
            total_pipelines: 0,
            success_count: 0,
        }
    }
}

/// Append-only event stream plus rolling latency metrics. The only
/// synchronization primitive in the pipeline that multiple turns may touch
/// concurrently (SPEC_FULL §5 shared-resource policy).
pub struct Observer {
    inner: Mutex<Inner>,
    next_subscription_id: AtomicU64,
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by `subscribe`; dropping it does *not* unsubscribe — callers
/// must call `unsubscribe` explicitly, matching SPEC_FULL §9's "scoped
/// resources" note that subscription handles are explicit.
pub struct SubscriptionHandle(u64);

impl Observer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_subscription_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        inner.subscriptions.push(Subscription {
            id,
            handler: Box::new(handler),
        });
        SubscriptionHandle(id)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscriptions.retain(|s| s.id != handle.0);
    }

    /// Emit an event: append to the ring, update metrics, then fan out to
    /// every subscriber in registration order. A panicking handler is caught
    /// so later handlers still run and emission order is preserved.
    pub fn emit(&self, event: Event) {
        let mut inner = self.inner.lock().unwrap();

        if event.event_type == EventType::PipelineEnd {
            inner.total_pipelines += 1;
            let success = event
                .payload
                .get("success")
                .and_then(|v| v.as_bool())
                .unwrap_or(true);
            if success {
                inner.success_count += 1;
            }
            if let Some(d) = event.payload.get("duration_ms").and_then(|v| v.as_f64()) {
                inner.latencies_ms.push_back(d);
                while inner.latencies_ms.len() > LATENCY_WINDOW {
                    inner.latencies_ms.pop_front();
                }
            }
        }

        inner.events.push_back(event.clone());
        while inner.events.len() > EVENT_RING_CAPACITY {
            inner.events.pop_front();
        }

        // Snapshot handler pointers so the mutex is released before running them.
        let handlers: Vec<&Handler> = inner.subscriptions.iter().map(|s| &s.handler).collect();
        for handler in handlers {
            if let Err(_panic) = catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                tracing::warn!("observability handler panicked; continuing to next subscriber");
            }
        }
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().unwrap();
        let mut sorted: Vec<f64> = inner.latencies_ms.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let p50 = percentile(&sorted, 0.50);
        let p95 = percentile(&sorted, 0.95);
        let success_rate = if inner.total_pipelines == 0 {
            1.0
        } else {
            inner.success_count as f64 / inner.total_pipelines as f64
        };
        MetricsSnapshot {
            total_pipelines: inner.total_pipelines,
            success_count: inner.success_count,
            latency_p50_ms: p50,
            latency_p95_ms: p95,
            success_rate,
        }
    }

    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let inner = self.inner.lock().unwrap();
        inner.events.iter().rev().take(n).cloned().collect()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.events.clear();
        inner.latencies_ms.clear();
        inner.total_pipelines = 0;
        inner.success_count = 0;
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn metrics_conservation_matches_pipeline_end_count() {
        let observer = Observer::new();
        for i in 0..5 {
            observer.emit(
                Event::new(EventType::PipelineEnd, format!("corr-{i}"))
                    .with_payload(serde_json::json!({"success": true, "duration_ms": 42.0})),
            );
        }
        let snapshot = observer.metrics_snapshot();
        assert_eq!(snapshot.total_pipelines, 5);
        assert_eq!(snapshot.success_count, 5);
        assert_eq!(snapshot.success_rate, 1.0);
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let observer = Observer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        observer.subscribe(move |_e| panic!("boom"));
        observer.subscribe(move |_e| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });

        observer.emit(Event::new(EventType::PipelineStart, "corr-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let observer = Observer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let handle = observer.subscribe(move |_e| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        observer.emit(Event::new(EventType::PipelineStart, "corr-1"));
        observer.unsubscribe(handle);
        observer.emit(Event::new(EventType::PipelineStart, "corr-2"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_ring_caps_at_capacity() {
        let observer = Observer::new();
        for i in 0..(EVENT_RING_CAPACITY + 10) {
            observer.emit(Event::new(EventType::StateTransition, format!("corr-{i}")));
        }
        assert_eq!(observer.recent_events(usize::MAX).len(), EVENT_RING_CAPACITY);
    }
}
