//! Memory interfaces (component K): per-session working memory and the
//! per-subject regulatory key-value store.

pub mod regulatory;
pub mod working;

pub use regulatory::{InMemoryStore, MemoryStats, MemoryStore, RegulatoryDelta, RegulatoryState, SledMemoryStore};
pub use working::{Episode, WorkingMemory};
