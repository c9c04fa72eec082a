use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::signal::bands::BrainwaveBands;

/// Number of alpha values (and likewise beta values) pooled into the trailing
/// variance estimate.
pub const VARIANCE_WINDOW_LEN: usize = 30;

/// Alpha at or below this is negligible; the beta/alpha ratio becomes the
/// sentinel instead of a division.
const MIN_RATIO_ALPHA: f32 = 0.01;

/// Substituted beta/alpha ratio when alpha is negligible. High enough that
/// the ratio condition always fails.
const RATIO_SENTINEL: f32 = 10.0;

/// Gamma's contribution to the composite noise level.
const GAMMA_NOISE_WEIGHT: f32 = 0.5;

/// Thresholds for the flow-state decision. Replaced wholesale between ticks;
/// never mutated field by field while a tick is in progress.
///
/// Values are accepted without range validation; a caller shipping an absurd
/// threshold gets the decision it asked for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowStateConfig {
    /// How long conditions must hold continuously before flow is declared.
    pub sustained_ms: u64,
    /// Ceiling on the beta/alpha ratio.
    pub ratio_threshold: f32,
    /// Ceiling on the pooled trailing variance.
    pub variance_threshold: f32,
    /// Ceiling on motion plus gamma noise.
    pub noise_threshold: f32,
    /// Gate floor: minimum total smoothed band power.
    pub min_signal_power: f32,
    /// Gate floor: minimum trailing variance (rejects flat-line signals).
    pub min_variance: f32,
    /// Gate floor: minimum smoothed alpha.
    pub min_alpha: f32,
}

impl Default for FlowStateConfig {
    fn default() -> Self {
        Self {
            sustained_ms: 5000,
            ratio_threshold: 1.0,
            variance_threshold: 0.05,
            noise_threshold: 0.5,
            min_signal_power: 0.05,
            min_variance: 0.001,
            min_alpha: 0.02,
        }
    }
}

impl FlowStateConfig {
    /// Map a UI coherence-threshold percentage (typically 0.70 to 0.85) onto
    /// the beta/alpha ratio ceiling.
    pub fn with_coherence_threshold(mut self, coherence_threshold: f32) -> Self {
        self.ratio_threshold = 1.0 - (coherence_threshold - 0.7) * 2.0;
        self
    }

    /// Map a UI time threshold directly onto the sustain duration.
    pub fn with_time_threshold(mut self, sustained_ms: u64) -> Self {
        self.sustained_ms = sustained_ms;
        self
    }
}

/// Pooled trailing window of recent smoothed alpha and beta values.
///
/// The gate, the state machine, and the coherence scorer all read the same
/// population variance over this one combined sample set.
#[derive(Default)]
pub struct VarianceWindow {
    alpha: VecDeque<f32>,
    beta: VecDeque<f32>,
}

impl VarianceWindow {
    pub fn new() -> Self {
        Self {
            alpha: VecDeque::with_capacity(VARIANCE_WINDOW_LEN),
            beta: VecDeque::with_capacity(VARIANCE_WINDOW_LEN),
        }
    }

    pub fn push(&mut self, alpha: f32, beta: f32) {
        if self.alpha.len() == VARIANCE_WINDOW_LEN {
            self.alpha.pop_front();
        }
        self.alpha.push_back(alpha);
        if self.beta.len() == VARIANCE_WINDOW_LEN {
            self.beta.pop_front();
        }
        self.beta.push_back(beta);
    }

    /// Population variance over the combined alpha and beta samples.
    /// Returns 0 before any values have been pushed.
    pub fn variance(&self) -> f32 {
        let count = self.alpha.len() + self.beta.len();
        if count == 0 {
            return 0.0;
        }
        let values = self.alpha.iter().chain(self.beta.iter());
        let mean = values.clone().sum::<f32>() / count as f32;
        values
            .map(|v| {
                let delta = v - mean;
                delta * delta
            })
            .sum::<f32>()
            / count as f32
    }

    pub fn clear(&mut self) {
        self.alpha.clear();
        self.beta.clear();
    }
}

/// Diagnostic output of one tick, recomputed fresh every time regardless of
/// the machine's state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FlowState {
    pub is_active: bool,
    /// Milliseconds the conditions have held continuously; 0 while idle.
    pub sustained_ms: u64,
    pub beta_alpha_ratio: f32,
    pub signal_variance: f32,
    pub noise_level: f32,
}

/// Transition tag returned by each tick so callers can poll synchronously
/// instead of registering handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowTransition {
    None,
    Entered,
    Exited,
}

/// Per-tick inputs to the state machine.
#[derive(Clone, Copy, Debug)]
pub struct FlowInputs<'a> {
    pub bands: &'a BrainwaveBands,
    pub motion_level: f32,
    /// Pooled trailing variance from the shared [`VarianceWindow`].
    pub variance: f32,
    /// Verdict of the signal-quality gate for this tick.
    pub gate_valid: bool,
}

/// Three-state, time-debounced flow decision: idle, accumulating (conditions
/// currently met, timer running), active (sustain duration satisfied).
///
/// Any single failing tick fully resets the accumulation timer; there is no
/// partial credit or decay grace period.
#[derive(Default)]
pub struct FlowStateMachine {
    started_at: Option<Instant>,
    active: bool,
}

impl FlowStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance one tick: (state, inputs, now, config) to (state', output,
    /// transition). `Entered` and `Exited` each fire exactly once, at the
    /// tick of the transition.
    pub fn update(
        &mut self,
        inputs: &FlowInputs,
        now: Instant,
        config: &FlowStateConfig,
    ) -> (FlowState, FlowTransition) {
        let bands = inputs.bands;
        let beta_alpha_ratio = if bands.alpha > MIN_RATIO_ALPHA {
            bands.beta / bands.alpha
        } else {
            RATIO_SENTINEL
        };
        let noise_level = inputs.motion_level + bands.gamma * GAMMA_NOISE_WEIGHT;
        let conditions_met = inputs.gate_valid
            && beta_alpha_ratio < config.ratio_threshold
            && inputs.variance < config.variance_threshold
            && noise_level < config.noise_threshold;

        let mut transition = FlowTransition::None;
        let sustained_ms;
        if conditions_met {
            let started = *self.started_at.get_or_insert(now);
            sustained_ms = now.duration_since(started).as_millis() as u64;
            if !self.active && sustained_ms >= config.sustained_ms {
                self.active = true;
                transition = FlowTransition::Entered;
            }
        } else {
            self.started_at = None;
            sustained_ms = 0;
            if self.active {
                self.active = false;
                transition = FlowTransition::Exited;
            }
        }

        let state = FlowState {
            is_active: self.active,
            sustained_ms,
            beta_alpha_ratio,
            signal_variance: inputs.variance,
            noise_level,
        };
        (state, transition)
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.active = false;
    }
}
