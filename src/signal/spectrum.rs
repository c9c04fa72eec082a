use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

use crate::signal::error::SignalError;

/// Default high-pass cutoff used to strip DC drift before windowing.
pub const DEFAULT_HIGHPASS_CUTOFF_HZ: f32 = 1.0;

/// Windowed FFT over a fixed-size real sample window, plus band-power queries
/// against the most recently computed magnitude spectrum.
///
/// The FFT plan, Hann coefficients, and scratch buffers are all built once in
/// the constructor and reused on every call, so `process` allocates nothing.
/// The analyzer holds no state besides those tables and the last spectrum:
/// processing the same window twice yields bit-for-bit identical magnitudes.
pub struct SpectralAnalyzer {
    sample_rate_hz: f32,
    window_size: usize,
    freq_resolution: f32,
    hann: Vec<f32>,
    /// Smoothing coefficient of the single-pole high-pass, `None` when the
    /// pre-filter is disabled.
    highpass_alpha: Option<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_input: Vec<Complex32>,
    fft_scratch: Vec<Complex32>,
    /// Magnitudes of the first N/2 bins (real-input symmetry).
    magnitudes: Vec<f32>,
}

impl SpectralAnalyzer {
    /// Build an analyzer with the default 1 Hz DC-drift high-pass enabled.
    pub fn new(window_size: usize, sample_rate_hz: f32) -> Result<Self, SignalError> {
        Self::with_highpass(window_size, sample_rate_hz, Some(DEFAULT_HIGHPASS_CUTOFF_HZ))
    }

    /// Build an analyzer with an explicit high-pass cutoff, or none at all.
    pub fn with_highpass(
        window_size: usize,
        sample_rate_hz: f32,
        highpass_cutoff_hz: Option<f32>,
    ) -> Result<Self, SignalError> {
        if window_size < 2 || !window_size.is_power_of_two() {
            return Err(SignalError::InvalidWindowSize(window_size));
        }
        if sample_rate_hz <= 0.0 {
            return Err(SignalError::InvalidSampleRate);
        }
        let hann = (0..window_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (window_size - 1) as f32).cos()))
            .collect();
        let highpass_alpha = highpass_cutoff_hz.map(|cutoff_hz| {
            // RC high-pass: alpha = RC / (RC + dt), RC = 1 / (2*pi*fc).
            let rc = 1.0 / (2.0 * PI * cutoff_hz);
            let dt = 1.0 / sample_rate_hz;
            rc / (rc + dt)
        });
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_size);
        let scratch_len = fft.get_inplace_scratch_len();
        Ok(Self {
            sample_rate_hz,
            window_size,
            freq_resolution: sample_rate_hz / window_size as f32,
            hann,
            highpass_alpha,
            fft,
            fft_input: vec![Complex32::ZERO; window_size],
            fft_scratch: vec![Complex32::ZERO; scratch_len],
            magnitudes: vec![0.0; window_size / 2],
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }

    /// Frequency spacing between adjacent bins (sampleRate / N).
    pub fn freq_resolution(&self) -> f32 {
        self.freq_resolution
    }

    /// Transform one window of exactly `window_size` samples: high-pass (when
    /// enabled), Hann window, FFT, then magnitude per bin.
    ///
    /// The caller guarantees the window length; shorter buffers must be
    /// excluded upstream.
    pub fn process(&mut self, window: &[f32]) {
        debug_assert_eq!(window.len(), self.window_size);
        match self.highpass_alpha {
            Some(alpha) => {
                let mut prev_x = window[0];
                let mut prev_y = 0.0f32;
                for ((&x, &w), slot) in window
                    .iter()
                    .zip(self.hann.iter())
                    .zip(self.fft_input.iter_mut())
                {
                    let y = alpha * (prev_y + x - prev_x);
                    prev_y = y;
                    prev_x = x;
                    *slot = Complex32::new(y * w, 0.0);
                }
            }
            None => {
                for ((&x, &w), slot) in window
                    .iter()
                    .zip(self.hann.iter())
                    .zip(self.fft_input.iter_mut())
                {
                    *slot = Complex32::new(x * w, 0.0);
                }
            }
        }
        self.fft
            .process_with_scratch(&mut self.fft_input, &mut self.fft_scratch);
        for (slot, bin) in self.magnitudes.iter_mut().zip(self.fft_input.iter()) {
            *slot = bin.norm();
        }
    }

    /// Magnitude spectrum from the last `process` call (N/2 bins).
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Average squared magnitude over bins whose center frequency falls in
    /// `[low_hz, high_hz)`. Bin 0 (DC) is always excluded. Returns 0 when no
    /// bins qualify.
    pub fn band_power(&self, low_hz: f32, high_hz: f32) -> f32 {
        let (sum, count) = self.band_fold(low_hz, high_hz);
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    /// Unnormalized sum of squared magnitudes over the same bin selection as
    /// `band_power`; used when absolute rather than comparative power matters.
    pub fn band_power_sum(&self, low_hz: f32, high_hz: f32) -> f32 {
        self.band_fold(low_hz, high_hz).0
    }

    fn band_fold(&self, low_hz: f32, high_hz: f32) -> (f32, usize) {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for (bin, &magnitude) in self.magnitudes.iter().enumerate().skip(1) {
            let freq = bin as f32 * self.freq_resolution;
            if freq >= low_hz && freq < high_hz {
                sum += magnitude * magnitude;
                count += 1;
            }
        }
        (sum, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f32, sample_rate_hz: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq_hz * i as f32 / sample_rate_hz).sin())
            .collect()
    }

    #[test]
    fn rejects_bad_construction_params() {
        assert!(SpectralAnalyzer::new(200, 256.0).is_err());
        assert!(SpectralAnalyzer::new(1, 256.0).is_err());
        assert!(SpectralAnalyzer::new(256, 0.0).is_err());
    }

    #[test]
    fn ten_hertz_tone_lands_in_alpha() {
        let mut analyzer = SpectralAnalyzer::new(256, 256.0).unwrap();
        analyzer.process(&sine(10.0, 256.0, 256));
        let alpha = analyzer.band_power_sum(8.0, 13.0);
        let total = analyzer.band_power_sum(1.0, 44.0);
        assert!(total > 0.0);
        assert!(
            alpha / total >= 0.9,
            "alpha share was {}",
            alpha / total
        );
    }

    #[test]
    fn twenty_hertz_tone_lands_in_beta() {
        let mut analyzer = SpectralAnalyzer::new(256, 256.0).unwrap();
        analyzer.process(&sine(20.0, 256.0, 256));
        let beta = analyzer.band_power_sum(13.0, 30.0);
        let total = analyzer.band_power_sum(1.0, 44.0);
        assert!(beta / total >= 0.9, "beta share was {}", beta / total);
    }

    #[test]
    fn repeated_process_is_bit_identical() {
        let mut analyzer = SpectralAnalyzer::new(128, 256.0).unwrap();
        let window = sine(12.0, 256.0, 128);
        analyzer.process(&window);
        let first = analyzer.magnitudes().to_vec();
        analyzer.process(&window);
        assert_eq!(first, analyzer.magnitudes());
    }

    #[test]
    fn band_power_excludes_dc() {
        // A constant window has all its energy in bin 0; with the high-pass
        // disabled nothing should leak into a range that nominally starts at 0.
        let mut analyzer = SpectralAnalyzer::with_highpass(64, 64.0, None).unwrap();
        analyzer.process(&[1.0; 64]);
        let low = analyzer.band_power(0.0, 1.0);
        assert_eq!(low, 0.0);
    }

    #[test]
    fn empty_range_returns_zero() {
        let mut analyzer = SpectralAnalyzer::new(64, 64.0).unwrap();
        analyzer.process(&sine(10.0, 64.0, 64));
        assert_eq!(analyzer.band_power(200.0, 300.0), 0.0);
        assert_eq!(analyzer.band_power_sum(200.0, 300.0), 0.0);
    }

    #[test]
    fn band_power_averages_while_sum_accumulates() {
        let mut analyzer = SpectralAnalyzer::new(256, 256.0).unwrap();
        analyzer.process(&sine(10.0, 256.0, 256));
        // [8, 13) covers bins 8..=12 at 1 Hz resolution.
        let avg = analyzer.band_power(8.0, 13.0);
        let sum = analyzer.band_power_sum(8.0, 13.0);
        assert!((sum - avg * 5.0).abs() < sum * 1e-5);
    }
}
