//! Per-subject regulatory key-value store. No utterance content is ever
//! persisted here — scalars only (SPEC_FULL §6 persisted-state layout).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegulatoryState {
    pub potency: f32,
    pub withdrawal_bias: f32,
    pub delegation_trend: f32,
    pub last_interaction_ts: DateTime<Utc>,
    pub autonomy_trajectory: f32,
}

impl Default for RegulatoryState {
    fn default() -> Self {
        Self {
            potency: 1.0,
            withdrawal_bias: 0.0,
            delegation_trend: 0.0,
            last_interaction_ts: Utc::now(),
            autonomy_trajectory: 0.0,
        }
    }
}

/// Delta applied via `MemoryStore::update`; `None` fields leave the stored value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegulatoryDelta {
    pub potency: Option<f32>,
    pub withdrawal_bias: Option<f32>,
    pub delegation_trend: Option<f32>,
    pub autonomy_trajectory: Option<f32>,
}

impl RegulatoryState {
    pub fn apply(mut self, delta: RegulatoryDelta) -> Self {
        if let Some(v) = delta.potency {
            self.potency = v;
        }
        if let Some(v) = delta.withdrawal_bias {
            self.withdrawal_bias = v;
        }
        if let Some(v) = delta.delegation_trend {
            self.delegation_trend = v;
        }
        if let Some(v) = delta.autonomy_trajectory {
            self.autonomy_trajectory = v;
        }
        self.last_interaction_ts = Utc::now();
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemoryStats {
    pub subjects: u64,
    pub size_bytes: u64,
}

/// Contract both the embedded-KV and in-memory backends must satisfy.
pub trait MemoryStore: Send + Sync {
    fn get(&self, subject_id: &str) -> Option<RegulatoryState>;
    fn put(&self, subject_id: &str, state: RegulatoryState);
    fn update(&self, subject_id: &str, delta: RegulatoryDelta) -> RegulatoryState;
    fn delete(&self, subject_id: &str);
    fn purge_expired(&self, threshold_ts: DateTime<Utc>) -> u64;
    fn stats(&self) -> MemoryStats;
}

/// Pure in-memory backend; used in tests and for deployments with no durable state.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<HashMap<String, RegulatoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryStore {
    fn get(&self, subject_id: &str) -> Option<RegulatoryState> {
        self.inner.lock().unwrap().get(subject_id).copied()
    }

    fn put(&self, subject_id: &str, state: RegulatoryState) {
        self.inner.lock().unwrap().insert(subject_id.to_string(), state);
    }

    fn update(&self, subject_id: &str, delta: RegulatoryDelta) -> RegulatoryState {
        let mut map = self.inner.lock().unwrap();
        let current = map.get(subject_id).copied().unwrap_or_default();
        let updated = current.apply(delta);
        map.insert(subject_id.to_string(), updated);
        updated
    }

    fn delete(&self, subject_id: &str) {
        self.inner.lock().unwrap().remove(subject_id);
    }

    fn purge_expired(&self, threshold_ts: DateTime<Utc>) -> u64 {
        let mut map = self.inner.lock().unwrap();
        let before = map.len();
        map.retain(|_, v| v.last_interaction_ts >= threshold_ts);
        (before - map.len()) as u64
    }

    fn stats(&self) -> MemoryStats {
        let map = self.inner.lock().unwrap();
        MemoryStats {
            subjects: map.len() as u64,
            size_bytes: (map.len() * std::mem::size_of::<RegulatoryState>()) as u64,
        }
    }
}

/// `sled`-backed regulatory store, grounded on the teacher's `etch`/`recall`
/// key-value pattern.
pub struct SledMemoryStore {
    db: Arc<sled::Db>,
}

impl SledMemoryStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> sled::Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn key(subject_id: &str) -> Vec<u8> {
        format!("regulatory:{subject_id}").into_bytes()
    }
}

impl MemoryStore for SledMemoryStore {
    fn get(&self, subject_id: &str) -> Option<RegulatoryState> {
        let bytes = self.db.get(Self::key(subject_id)).ok()??;
        match serde_json::from_slice(&bytes) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(error = %e, subject_id, "corrupt regulatory record");
                None
            }
        }
    }

    fn put(&self, subject_id: &str, state: RegulatoryState) {
        if let Ok(bytes) = serde_json::to_vec(&state) {
            let _ = self.db.insert(Self::key(subject_id), bytes);
            let _ = self.db.flush();
        }
    }

    fn update(&self, subject_id: &str, delta: RegulatoryDelta) -> RegulatoryState {
        let current = self.get(subject_id).unwrap_or_default();
        let updated = current.apply(delta);
        self.put(subject_id, updated);
        updated
    }

    fn delete(&self, subject_id: &str) {
        let _ = self.db.remove(Self::key(subject_id));
        let _ = self.db.flush();
    }

    fn purge_expired(&self, threshold_ts: DateTime<Utc>) -> u64 {
        let mut purged = 0u64;
        let prefix = b"regulatory:";
        let mut stale_keys = Vec::new();
        for item in self.db.scan_prefix(prefix).flatten() {
            let (k, v) = item;
            if let Ok(state) = serde_json::from_slice::<RegulatoryState>(&v) {
                if state.last_interaction_ts < threshold_ts {
                    stale_keys.push(k);
                }
            }
        }
        for k in stale_keys {
            if self.db.remove(k).is_ok() {
                purged += 1;
            }
        }
        let _ = self.db.flush();
        purged
    }

    fn stats(&self) -> MemoryStats {
        MemoryStats {
            subjects: self.db.len() as u64,
            size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_roundtrips() {
        let store = InMemoryStore::new();
        assert!(store.get("subj1").is_none());
        store.put("subj1", RegulatoryState::default());
        assert!(store.get("subj1").is_some());
        let updated = store.update(
            "subj1",
            RegulatoryDelta {
                potency: Some(0.5),
                ..Default::default()
            },
        );
        assert_eq!(updated.potency, 0.5);
        store.delete("subj1");
        assert!(store.get("subj1").is_none());
    }

    #[test]
    fn purge_expired_removes_old_subjects() {
        let store = InMemoryStore::new();
        store.put(
            "old",
            RegulatoryState {
                last_interaction_ts: Utc::now() - chrono::Duration::days(30),
                ..Default::default()
            },
        );
        store.put("fresh", RegulatoryState::default());
        let purged = store.purge_expired(Utc::now() - chrono::Duration::days(1));
        assert_eq!(purged, 1);
        assert!(store.get("old").is_none());
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn sled_store_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledMemoryStore::open(dir.path()).unwrap();
        store.put("subj1", RegulatoryState::default());
        let loaded = store.get("subj1").unwrap();
        assert_eq!(loaded.potency, 1.0);
        let stats = store.stats();
        assert_eq!(stats.subjects, 1);
    }
}
