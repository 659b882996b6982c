//! Shared types for the conversational response pipeline: enumerations,
//! scalar newtypes, and the constraint-merge function. No module downstream
//! redefines these; everything reads `common_types` as the source of truth.

pub mod dimensional;
pub mod domain;
pub mod field;
pub mod plan;
pub mod scalar;
pub mod session;

pub use dimensional::{DimensionalState, Integration};
pub use domain::{ActType, ActionTag, Domain, Primitive, Vertical, V_MODE_FORBIDDEN};
pub use field::{Arousal, Coherence, DomainActivation, FieldState, Flag, Goal, Language, Temporal, Valence};
pub use plan::{
    max_length_for_depth, merge_constraints, Atmosphere, Depth, GovernorDeltas, Length,
    LifecycleDeltas, Mode, Pacing, PlanConstraints, PlanMetadata, PlanSource, ProtocolSelection,
    ResponsePlan, RiskFlags, SpeechAct, Tone,
};
pub use scalar::{FivePointScale, UnitInterval};
pub use session::{LifecycleState, Session, DEFAULT_RESPONSE_HISTORY_LIMIT};

/// Responsibility-return runtime categories referenced by the verifier (component I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RuntimeCategory {
    Mail,
    Relation,
    Decision,
}
