use serde::{Deserialize, Serialize};

use crate::signal::bands::BrainwaveBands;

/// Advisory three-way classification of the coherence scalar. May momentarily
/// disagree with the flow state machine's debounced decision; the continuous
/// indicator is meant to show trend before (or without) a sustained trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoherenceZone {
    Flow,
    Stabilizing,
    Noise,
}

/// Zone boundaries, inclusive at the lower edge.
pub fn coherence_zone(coherence: f32) -> CoherenceZone {
    if coherence >= 0.7 {
        CoherenceZone::Flow
    } else if coherence >= 0.4 {
        CoherenceZone::Stabilizing
    } else {
        CoherenceZone::Noise
    }
}

/// Sentinels and weights of the coherence heuristic. These are empirically
/// tuned constants, kept configurable rather than derived from the flow
/// thresholds; the two heuristics are allowed to disagree.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherenceTuning {
    /// Guard floor on total smoothed power.
    pub min_total_power: f32,
    /// Guard floor on aggregate electrode quality.
    pub min_electrode_quality: f32,
    /// Guard floor on smoothed alpha.
    pub min_alpha: f32,
    /// Returned when total power is below its floor.
    pub no_signal_score: f32,
    /// Returned when electrode contact is unreliable.
    pub poor_contact_score: f32,
    /// Returned when no relaxed-state marker is detectable.
    pub no_alpha_score: f32,
    pub alpha_weight: f32,
    pub ratio_weight: f32,
    pub theta_weight: f32,
    pub stability_weight: f32,
}

impl Default for CoherenceTuning {
    fn default() -> Self {
        Self {
            min_total_power: 0.05,
            min_electrode_quality: 0.5,
            min_alpha: 0.01,
            no_signal_score: 0.1,
            poor_contact_score: 0.15,
            no_alpha_score: 0.2,
            alpha_weight: 0.35,
            ratio_weight: 0.25,
            theta_weight: 0.2,
            stability_weight: 0.2,
        }
    }
}

/// Continuous [0, 1] proxy for proximity to a calm, low-variance mental
/// state. Deliberately decoupled from the flow state machine's discrete
/// decision so the graph can show trend continuously.
#[derive(Default)]
pub struct CoherenceScorer {
    tuning: CoherenceTuning,
}

impl CoherenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tuning(tuning: CoherenceTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &CoherenceTuning {
        &self.tuning
    }

    /// Score one tick. Guard clauses are ordered and short-circuit: no
    /// usable signal, then unreliable contact, then missing alpha. Past the
    /// guards, a weighted sum of clamped alpha, ratio, theta, and stability
    /// terms.
    pub fn score(&self, bands: &BrainwaveBands, electrode_quality: f32, variance: f32) -> f32 {
        let t = &self.tuning;
        let total_power = bands.total();
        if total_power < t.min_total_power {
            return t.no_signal_score;
        }
        if electrode_quality < t.min_electrode_quality {
            return t.poor_contact_score;
        }
        if bands.alpha < t.min_alpha {
            return t.no_alpha_score;
        }

        let alpha_score = (bands.alpha / total_power * 3.0).min(1.0);
        let ratio_score = (1.5 - bands.beta / bands.alpha).clamp(0.0, 1.0);
        let theta_score = (bands.theta / total_power * 2.5).min(1.0);
        let stability_score = (1.0 - variance.sqrt() * 3.0).clamp(0.0, 1.0);

        (alpha_score * t.alpha_weight
            + ratio_score * t.ratio_weight
            + theta_score * t.theta_weight
            + stability_score * t.stability_weight)
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands(delta: f32, theta: f32, alpha: f32, beta: f32, gamma: f32) -> BrainwaveBands {
        BrainwaveBands {
            delta,
            theta,
            alpha,
            beta,
            gamma,
        }
    }

    #[test]
    fn no_signal_guard_wins_over_everything() {
        let scorer = CoherenceScorer::new();
        // Total power 0.04, below the 0.05 floor, despite perfect contact.
        let b = bands(0.01, 0.01, 0.01, 0.005, 0.005);
        assert_eq!(scorer.score(&b, 1.0, 0.0), 0.1);
    }

    #[test]
    fn poor_contact_guard_comes_second() {
        let scorer = CoherenceScorer::new();
        let b = bands(0.1, 0.1, 0.2, 0.05, 0.05);
        assert_eq!(scorer.score(&b, 0.3, 0.0), 0.15);
    }

    #[test]
    fn missing_alpha_guard_comes_third() {
        let scorer = CoherenceScorer::new();
        let b = bands(0.2, 0.2, 0.005, 0.1, 0.1);
        assert_eq!(scorer.score(&b, 1.0, 0.0), 0.2);
    }

    #[test]
    fn weighted_sum_matches_hand_computation() {
        let scorer = CoherenceScorer::new();
        // total = 1.0, alpha term saturates (0.4 * 3 > 1), ratio term
        // 1.5 - 0.5 = 1.0 (clamped), theta term 0.2 * 2.5 = 0.5,
        // stability 1 - sqrt(0.04) * 3 = 0.4.
        let b = bands(0.1, 0.2, 0.4, 0.2, 0.1);
        let expected = 1.0 * 0.35 + 1.0 * 0.25 + 0.5 * 0.2 + 0.4 * 0.2;
        assert!((scorer.score(&b, 1.0, 0.04) - expected).abs() < 1e-6);
    }

    #[test]
    fn high_variance_zeroes_the_stability_term() {
        let scorer = CoherenceScorer::new();
        let calm = scorer.score(&bands(0.1, 0.2, 0.4, 0.2, 0.1), 1.0, 0.0);
        let shaky = scorer.score(&bands(0.1, 0.2, 0.4, 0.2, 0.1), 1.0, 1.0);
        assert!((calm - shaky - 0.2).abs() < 1e-6);
    }

    #[test]
    fn zone_boundaries_are_inclusive_at_the_lower_edge() {
        assert_eq!(coherence_zone(0.70), CoherenceZone::Flow);
        assert_eq!(coherence_zone(0.699999), CoherenceZone::Stabilizing);
        assert_eq!(coherence_zone(0.40), CoherenceZone::Stabilizing);
        assert_eq!(coherence_zone(0.399999), CoherenceZone::Noise);
        assert_eq!(coherence_zone(1.0), CoherenceZone::Flow);
        assert_eq!(coherence_zone(0.0), CoherenceZone::Noise);
    }
}
