use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

/// Default EMA smoothing factor; higher adapts slower and traces smoother.
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.85;

/// Total corrected power below this is treated as a signal-free tick and the
/// whole band update is skipped, guarding the relative-power division.
pub const MIN_TOTAL_POWER: f32 = 1e-6;

/// Ratio cap applied to the mental-state indices before scaling to [0, 1].
const INDEX_RATIO_CAP: f32 = 2.0;
const INDEX_EPSILON: f32 = 1e-6;

/// The five canonical EEG frequency bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Frequency range in Hz; lower bound inclusive, upper exclusive.
    pub fn range_hz(self) -> (f32, f32) {
        match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 44.0),
        }
    }

    /// Gain multiplier counteracting the natural 1/f spectral slope.
    pub fn slope_gain(self) -> f32 {
        match self {
            Band::Delta => 1.0,
            Band::Theta => 1.5,
            Band::Alpha => 2.0,
            Band::Beta => 3.0,
            Band::Gamma => 4.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }

    fn index(self) -> usize {
        match self {
            Band::Delta => 0,
            Band::Theta => 1,
            Band::Alpha => 2,
            Band::Beta => 3,
            Band::Gamma => 4,
        }
    }
}

/// Relative power per canonical band.
///
/// Values are non-negative and intended to lie in [0, 1]. A fresh snapshot
/// from one normalizer update sums to 1; the smoothed counterpart generally
/// does not, since each band is smoothed independently and skipped updates
/// retain previous values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrainwaveBands {
    pub delta: f32,
    pub theta: f32,
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl BrainwaveBands {
    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Gamma => self.gamma,
        }
    }

    pub fn set(&mut self, band: Band, value: f32) {
        match band {
            Band::Delta => self.delta = value,
            Band::Theta => self.theta = value,
            Band::Alpha => self.alpha = value,
            Band::Beta => self.beta = value,
            Band::Gamma => self.gamma = value,
        }
    }

    pub fn total(&self) -> f32 {
        self.delta + self.theta + self.alpha + self.beta + self.gamma
    }

    /// (alpha + theta) / (beta + gamma), capped at 2 and scaled to [0, 1].
    pub fn relaxation_index(&self) -> f32 {
        scaled_ratio((self.alpha + self.theta) / (self.beta + self.gamma + INDEX_EPSILON))
    }

    /// theta / alpha, capped at 2 and scaled to [0, 1].
    pub fn meditation_index(&self) -> f32 {
        scaled_ratio(self.theta / (self.alpha + INDEX_EPSILON))
    }

    /// beta / (alpha + theta), capped at 2 and scaled to [0, 1].
    pub fn focus_index(&self) -> f32 {
        scaled_ratio(self.beta / (self.alpha + self.theta + INDEX_EPSILON))
    }
}

fn scaled_ratio(ratio: f32) -> f32 {
    ratio.min(INDEX_RATIO_CAP) / INDEX_RATIO_CAP
}

/// Maps per-channel spectral band powers onto one relative-power snapshot,
/// with slope correction, EMA smoothing, and a bounded per-band history.
///
/// All routine invalidity (no valid channels, near-zero power, malformed
/// external values) is a skipped update: previous raw and smoothed values are
/// retained unchanged and the call reports `false`.
pub struct BandPowerNormalizer {
    raw: BrainwaveBands,
    smoothed: BrainwaveBands,
    history: [VecDeque<f32>; 5],
    history_len: usize,
    smoothing_factor: f32,
}

impl BandPowerNormalizer {
    pub fn new(history_len: usize) -> Self {
        Self::with_smoothing(history_len, DEFAULT_SMOOTHING_FACTOR)
    }

    pub fn with_smoothing(history_len: usize, smoothing_factor: f32) -> Self {
        Self {
            raw: BrainwaveBands::default(),
            smoothed: BrainwaveBands::default(),
            history: std::array::from_fn(|_| VecDeque::with_capacity(history_len)),
            history_len,
            smoothing_factor,
        }
    }

    /// Fold one tick's per-channel band powers (indexed as `Band::ALL`) into
    /// the normalizer. Returns `false` when the update was skipped.
    pub fn update(&mut self, channel_powers: &[[f32; 5]]) -> bool {
        if channel_powers.is_empty() {
            debug!("band update skipped: no channels with a full window");
            return false;
        }
        let mut corrected = [0.0f32; 5];
        for (i, band) in Band::ALL.iter().enumerate() {
            let avg = channel_powers.iter().map(|powers| powers[i]).sum::<f32>()
                / channel_powers.len() as f32;
            corrected[i] = avg * band.slope_gain();
        }
        let total: f32 = corrected.iter().sum();
        if !total.is_finite() || total < MIN_TOTAL_POWER {
            debug!("band update skipped: total corrected power {total} below floor");
            return false;
        }
        for (i, band) in Band::ALL.iter().enumerate() {
            let relative = (corrected[i] / total).clamp(0.0, 1.0);
            self.store(*band, relative);
        }
        true
    }

    /// Apply an externally computed relative power for one band, bypassing
    /// the spectral path. Non-finite or out-of-range values are discarded.
    pub fn apply_band_value(&mut self, band: Band, value: f32) -> bool {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            debug!("discarding {} band event with value {value}", band.label());
            return false;
        }
        self.store(band, value);
        true
    }

    fn store(&mut self, band: Band, raw_value: f32) {
        self.raw.set(band, raw_value);
        let previous = self.smoothed.get(band);
        self.smoothed.set(
            band,
            previous * self.smoothing_factor + raw_value * (1.0 - self.smoothing_factor),
        );
        let history = &mut self.history[band.index()];
        if history.len() == self.history_len {
            history.pop_front();
        }
        history.push_back(raw_value);
    }

    /// Latest raw relative-power snapshot.
    pub fn raw(&self) -> &BrainwaveBands {
        &self.raw
    }

    /// EMA-smoothed counterpart of `raw`.
    pub fn smoothed(&self) -> &BrainwaveBands {
        &self.smoothed
    }

    /// Rolling raw-value history for one band, oldest first. Display only.
    pub fn history(&self, band: Band) -> impl Iterator<Item = f32> + '_ {
        self.history[band.index()].iter().copied()
    }

    pub fn reset(&mut self) {
        self.raw = BrainwaveBands::default();
        self.smoothed = BrainwaveBands::default();
        for history in &mut self.history {
            history.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_powers_sum_to_one_with_slope_correction() {
        let mut normalizer = BandPowerNormalizer::new(16);
        assert!(normalizer.update(&[[1.0, 1.0, 1.0, 1.0, 1.0]]));
        let raw = normalizer.raw();
        assert!((raw.total() - 1.0).abs() < 1e-6);
        // Equal input power, so relative shares follow the slope gains.
        let gain_total: f32 = Band::ALL.iter().map(|b| b.slope_gain()).sum();
        assert!((raw.gamma - 4.0 / gain_total).abs() < 1e-6);
        assert!((raw.delta - 1.0 / gain_total).abs() < 1e-6);
    }

    #[test]
    fn zero_power_update_is_skipped() {
        let mut normalizer = BandPowerNormalizer::new(16);
        assert!(normalizer.update(&[[0.2, 0.2, 0.2, 0.2, 0.2]]));
        let smoothed_before = *normalizer.smoothed();
        assert!(!normalizer.update(&[[0.0; 5], [0.0; 5]]));
        assert_eq!(*normalizer.smoothed(), smoothed_before);
        assert!(normalizer.smoothed().total().is_finite());
    }

    #[test]
    fn no_channels_skips_the_update() {
        let mut normalizer = BandPowerNormalizer::new(16);
        assert!(!normalizer.update(&[]));
        assert_eq!(*normalizer.raw(), BrainwaveBands::default());
    }

    #[test]
    fn ema_follows_the_configured_factor() {
        let mut normalizer = BandPowerNormalizer::with_smoothing(16, 0.85);
        normalizer.apply_band_value(Band::Alpha, 1.0);
        assert!((normalizer.smoothed().alpha - 0.15).abs() < 1e-6);
        normalizer.apply_band_value(Band::Alpha, 1.0);
        assert!((normalizer.smoothed().alpha - (0.15 * 0.85 + 0.15)).abs() < 1e-6);
    }

    #[test]
    fn malformed_band_events_are_discarded() {
        let mut normalizer = BandPowerNormalizer::new(16);
        assert!(!normalizer.apply_band_value(Band::Theta, f32::NAN));
        assert!(!normalizer.apply_band_value(Band::Theta, -0.1));
        assert!(!normalizer.apply_band_value(Band::Theta, 1.5));
        assert_eq!(normalizer.raw().theta, 0.0);
        assert_eq!(normalizer.history(Band::Theta).count(), 0);
    }

    #[test]
    fn history_is_bounded_and_ordered() {
        let mut normalizer = BandPowerNormalizer::new(3);
        for value in [0.1, 0.2, 0.3, 0.4] {
            normalizer.apply_band_value(Band::Beta, value);
        }
        let history: Vec<f32> = normalizer.history(Band::Beta).collect();
        assert_eq!(history, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn indices_are_capped_ratios() {
        let bands = BrainwaveBands {
            delta: 0.0,
            theta: 0.3,
            alpha: 0.3,
            beta: 0.1,
            gamma: 0.1,
        };
        // (0.3 + 0.3) / 0.2 = 3.0, capped at 2 and scaled to 1.0.
        assert!((bands.relaxation_index() - 1.0).abs() < 1e-4);
        // 0.3 / 0.3 = 1.0 -> 0.5 after scaling.
        assert!((bands.meditation_index() - 0.5).abs() < 1e-4);
        // 0.1 / 0.6 ≈ 0.1667 -> ≈ 0.0833 after scaling.
        assert!((bands.focus_index() - 0.0833).abs() < 1e-3);
    }
}
