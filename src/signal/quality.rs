use serde::{Deserialize, Serialize};

use crate::signal::flow::FlowStateConfig;

/// Electrode quality below this is treated as unreliable contact.
pub const MIN_ELECTRODE_QUALITY: f32 = 0.5;

/// Accelerometer full-scale divisor: a 1 g-per-axis triple maps to motion
/// level 1.0.
pub const MOTION_FULL_SCALE: f32 = 3.0;

/// Per-electrode scalp contact code, as reported by the headband's
/// horseshoe indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactQuality {
    Good,
    Medium,
    Poor,
    Off,
}

impl ContactQuality {
    /// Decode a wire code; values outside {1, 2, 3, 4} are unknown.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ContactQuality::Good),
            2 => Some(ContactQuality::Medium),
            3 => Some(ContactQuality::Poor),
            4 => Some(ContactQuality::Off),
            _ => None,
        }
    }

    /// Weight used in the aggregate quality scalar.
    pub fn weight(self) -> f32 {
        match self {
            ContactQuality::Good => 1.0,
            ContactQuality::Medium => 0.5,
            ContactQuality::Poor | ContactQuality::Off => 0.0,
        }
    }
}

/// Aggregate contact quality across all electrodes, in [0, 1].
pub fn electrode_quality(contacts: &[ContactQuality]) -> f32 {
    if contacts.is_empty() {
        return 0.0;
    }
    contacts.iter().map(|c| c.weight()).sum::<f32>() / contacts.len() as f32
}

/// Normalized motion level from an accelerometer triple.
pub fn motion_level(x: f32, y: f32, z: f32) -> f32 {
    (x.abs() + y.abs() + z.abs()) / MOTION_FULL_SCALE
}

/// Current-tick inputs to the signal-quality gate.
#[derive(Clone, Copy, Debug)]
pub struct GateInputs {
    /// Sum of the smoothed relative band powers.
    pub total_power: f32,
    /// Pooled trailing variance of recent alpha and beta values.
    pub variance: f32,
    /// Aggregate electrode contact quality in [0, 1].
    pub electrode_quality: f32,
    /// Smoothed alpha value.
    pub alpha: f32,
}

/// Composite validity predicate over the current tick's signal conditions.
///
/// Stateless and re-evaluated every tick. The power and variance floors
/// reject flat-line or disconnected signals that would otherwise trivially
/// satisfy the flow conditions; the alpha floor rejects signals with no
/// detectable relaxed-state marker at all. Invalidity is a steady-state
/// condition, not an error: downstream stages treat the tick as "no real
/// signal" and carry on.
pub fn gate_valid(config: &FlowStateConfig, inputs: &GateInputs) -> bool {
    inputs.total_power >= config.min_signal_power
        && inputs.variance >= config.min_variance
        && inputs.electrode_quality >= MIN_ELECTRODE_QUALITY
        && inputs.alpha >= config.min_alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_codes_round_trip() {
        assert_eq!(ContactQuality::from_code(1), Some(ContactQuality::Good));
        assert_eq!(ContactQuality::from_code(2), Some(ContactQuality::Medium));
        assert_eq!(ContactQuality::from_code(3), Some(ContactQuality::Poor));
        assert_eq!(ContactQuality::from_code(4), Some(ContactQuality::Off));
        assert_eq!(ContactQuality::from_code(0), None);
        assert_eq!(ContactQuality::from_code(5), None);
    }

    #[test]
    fn quality_is_a_weighted_average() {
        use ContactQuality::*;
        let quality = electrode_quality(&[Good, Good, Medium, Off]);
        assert!((quality - (1.0 + 1.0 + 0.5 + 0.0) / 4.0).abs() < 1e-6);
        assert_eq!(electrode_quality(&[]), 0.0);
    }

    #[test]
    fn motion_level_sums_absolute_axes() {
        assert!((motion_level(1.0, -1.0, 1.0) - 1.0).abs() < 1e-6);
        assert_eq!(motion_level(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn gate_requires_every_condition() {
        let config = FlowStateConfig::default();
        let valid = GateInputs {
            total_power: 0.5,
            variance: 0.01,
            electrode_quality: 1.0,
            alpha: 0.2,
        };
        assert!(gate_valid(&config, &valid));

        assert!(!gate_valid(&config, &GateInputs { total_power: 0.01, ..valid }));
        assert!(!gate_valid(&config, &GateInputs { variance: 0.0, ..valid }));
        assert!(!gate_valid(
            &config,
            &GateInputs { electrode_quality: 0.4, ..valid }
        ));
        assert!(!gate_valid(&config, &GateInputs { alpha: 0.01, ..valid }));
    }

    #[test]
    fn gate_bounds_are_inclusive() {
        let config = FlowStateConfig::default();
        let edge = GateInputs {
            total_power: config.min_signal_power,
            variance: config.min_variance,
            electrode_quality: MIN_ELECTRODE_QUALITY,
            alpha: config.min_alpha,
        };
        assert!(gate_valid(&config, &edge));
    }
}
