//! Lifecycle regulators (component J): per-turn dissipation of a session's
//! `LifecycleState`, plus a probabilistic early-withdrawal check whose
//! source of randomness is injectable for deterministic tests.

use common_types::LifecycleState;
use rand::Rng;

pub const DEFAULT_POTENCY_DECAY: f32 = 0.9;
pub const DEFAULT_WITHDRAWAL_INCREMENT: f32 = 0.05;
pub const DEFAULT_FORCE_EXIT_THRESHOLD: f32 = 0.1;
const WITHDRAWAL_PROBABILITY_SCALE: f32 = 0.3;

#[derive(Debug, Clone, Copy)]
pub struct DissipationConfig {
    pub potency_decay: f32,
    pub withdrawal_increment: f32,
    pub force_exit_threshold: f32,
}

impl Default for DissipationConfig {
    fn default() -> Self {
        Self {
            potency_decay: DEFAULT_POTENCY_DECAY,
            withdrawal_increment: DEFAULT_WITHDRAWAL_INCREMENT,
            force_exit_threshold: DEFAULT_FORCE_EXIT_THRESHOLD,
        }
    }
}

/// Injectable source of randomness for the probabilistic withdrawal check.
/// `0.0..1.0`; the cycle withdraws when the draw is below the threshold.
pub trait RandomSource {
    fn next_unit(&mut self) -> f32;
}

pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn next_unit(&mut self) -> f32 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// A fixed-sequence source for deterministic tests.
pub struct FixedRngSource {
    values: Vec<f32>,
    idx: usize,
}

impl FixedRngSource {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, idx: 0 }
    }
}

impl RandomSource for FixedRngSource {
    fn next_unit(&mut self) -> f32 {
        let v = self.values.get(self.idx).copied().unwrap_or(1.0);
        self.idx += 1;
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDecision {
    Continue,
    Withdraw,
    ForceExit,
}

#[derive(Debug, Clone, Copy)]
pub struct CycleOutcome {
    pub state: LifecycleState,
    pub decision: CycleDecision,
}

/// `cycle(state, config, random) -> CycleOutcome`.
///
/// Once `force_exit_triggered` is set it stays set (sticky) until an
/// explicit session reset; every subsequent call short-circuits to
/// `ForceExit` without touching the dissipation math further. How a manual
/// reset should interact with a mid-turn `force_exit_triggered` is left to
/// the orchestrator (`reset_force_exit` is provided for that purpose).
pub fn cycle(mut state: LifecycleState, config: DissipationConfig, random: &mut dyn RandomSource) -> CycleOutcome {
    if state.force_exit_triggered {
        return CycleOutcome { state, decision: CycleDecision::ForceExit };
    }

    state.potency *= config.potency_decay;
    state.withdrawal_bias = (state.withdrawal_bias + config.withdrawal_increment).min(1.0);
    state.cycle_count += 1;

    if state.potency < config.force_exit_threshold {
        state.force_exit_triggered = true;
        return CycleOutcome { state, decision: CycleDecision::ForceExit };
    }

    let draw = random.next_unit();
    let withdrawal_probability = WITHDRAWAL_PROBABILITY_SCALE * state.withdrawal_bias;
    let decision = if draw < withdrawal_probability {
        CycleDecision::Withdraw
    } else {
        CycleDecision::Continue
    };

    CycleOutcome { state, decision }
}

/// Clears `force_exit_triggered` and resets dissipation state to baseline.
/// Used on an explicit session reset, not on any automatic condition.
pub fn reset_force_exit(_state: LifecycleState) -> LifecycleState {
    LifecycleState::default()
}

/// Records an observed user-autonomy signal (e.g. the user made an
/// independent decision this turn). Feeds `EarlySignals.memory.relapse_risk`
/// via its slope, tracked by the caller.
pub fn record_autonomy_signal(mut state: LifecycleState, magnitude: f32) -> LifecycleState {
    state.autonomy_trajectory = (state.autonomy_trajectory + magnitude).clamp(-1.0, 1.0);
    state
}

/// Derives a relapse-risk estimate from the current autonomy trajectory: a
/// negative slope (autonomy eroding) raises risk.
pub fn relapse_risk(state: &LifecycleState) -> f32 {
    (-state.autonomy_trajectory).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn potency_decays_each_cycle() {
        let state = LifecycleState::default();
        let mut rng = FixedRngSource::new(vec![1.0]);
        let outcome = cycle(state, DissipationConfig::default(), &mut rng);
        assert!((outcome.state.potency - 0.9).abs() < 1e-6);
        assert_eq!(outcome.state.cycle_count, 1);
    }

    #[test]
    fn withdrawal_bias_saturates_at_one() {
        let mut state = LifecycleState { withdrawal_bias: 0.98, ..LifecycleState::default() };
        let mut rng = FixedRngSource::new(vec![1.0]);
        let outcome = cycle(state, DissipationConfig::default(), &mut rng);
        state = outcome.state;
        assert!(state.withdrawal_bias <= 1.0);
    }

    #[test]
    fn low_potency_triggers_sticky_force_exit() {
        let state = LifecycleState { potency: 0.11, ..LifecycleState::default() };
        let mut rng = FixedRngSource::new(vec![1.0]);
        let outcome = cycle(state, DissipationConfig::default(), &mut rng);
        assert!(outcome.state.force_exit_triggered);
        assert_eq!(outcome.decision, CycleDecision::ForceExit);

        // Once triggered, subsequent cycles short-circuit regardless of the draw.
        let mut rng2 = FixedRngSource::new(vec![0.0]);
        let outcome2 = cycle(outcome.state, DissipationConfig::default(), &mut rng2);
        assert_eq!(outcome2.decision, CycleDecision::ForceExit);
    }

    #[test]
    fn low_draw_below_probability_withdraws() {
        let state = LifecycleState { withdrawal_bias: 1.0, ..LifecycleState::default() };
        let mut rng = FixedRngSource::new(vec![0.1]);
        let outcome = cycle(state, DissipationConfig::default(), &mut rng);
        assert_eq!(outcome.decision, CycleDecision::Withdraw);
    }

    #[test]
    fn high_draw_continues() {
        let state = LifecycleState { withdrawal_bias: 1.0, ..LifecycleState::default() };
        let mut rng = FixedRngSource::new(vec![0.9]);
        let outcome = cycle(state, DissipationConfig::default(), &mut rng);
        assert_eq!(outcome.decision, CycleDecision::Continue);
    }

    #[test]
    fn eroding_autonomy_raises_relapse_risk() {
        let mut state = LifecycleState::default();
        state = record_autonomy_signal(state, -0.6);
        assert!(relapse_risk(&state) > 0.5);
    }
}
