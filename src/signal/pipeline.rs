use std::time::Instant;

use log::debug;

use crate::signal::bands::{Band, BandPowerNormalizer, BrainwaveBands};
use crate::signal::buffer::SampleBuffer;
use crate::signal::coherence::{coherence_zone, CoherenceScorer, CoherenceTuning, CoherenceZone};
use crate::signal::error::SignalError;
use crate::signal::flow::{
    FlowInputs, FlowState, FlowStateConfig, FlowStateMachine, FlowTransition, VarianceWindow,
};
use crate::signal::quality::{self, ContactQuality, GateInputs};
use crate::signal::source::{EventSource, SignalEvent};
use crate::signal::spectrum::SpectralAnalyzer;

/// Electrode channels on the headband (standard four-electrode placement).
pub const CHANNEL_COUNT: usize = 4;

pub const DEFAULT_WINDOW_SIZE: usize = 256;
pub const DEFAULT_SAMPLE_RATE_HZ: f32 = 256.0;

/// Band state exposed to UI, audio, and persistence consumers.
#[derive(Clone, Copy, Debug)]
pub struct StateSnapshot {
    pub bands: BrainwaveBands,
    pub smoothed_bands: BrainwaveBands,
    pub relaxation_index: f32,
    pub meditation_index: f32,
    pub focus_index: f32,
}

/// Everything the core derives on one tick.
#[derive(Clone, Copy, Debug)]
pub struct TickOutput {
    pub snapshot: StateSnapshot,
    pub flow: FlowState,
    pub transition: FlowTransition,
    pub coherence: f32,
    pub zone: CoherenceZone,
}

/// Per-connection context owning every piece of mutable pipeline state:
/// sample buffers, spectral scratch, EMA and history, the variance window,
/// and the flow timer.
///
/// One instance serves exactly one device connection from a single logical
/// task; a caller with several simultaneous connections instantiates one
/// pipeline per connection. On disconnect, call [`FlowPipeline::reset`]; no
/// state survives the boundary.
pub struct FlowPipeline {
    analyzer: SpectralAnalyzer,
    buffers: Vec<SampleBuffer>,
    window_scratch: Vec<f32>,
    normalizer: BandPowerNormalizer,
    variance: VarianceWindow,
    machine: FlowStateMachine,
    scorer: CoherenceScorer,
    config: FlowStateConfig,
    contacts: [ContactQuality; CHANNEL_COUNT],
    motion_level: f32,
}

impl FlowPipeline {
    pub fn new() -> Result<Self, SignalError> {
        Self::with_params(DEFAULT_WINDOW_SIZE, DEFAULT_SAMPLE_RATE_HZ)
    }

    pub fn with_params(window_size: usize, sample_rate_hz: f32) -> Result<Self, SignalError> {
        Ok(Self {
            analyzer: SpectralAnalyzer::new(window_size, sample_rate_hz)?,
            buffers: (0..CHANNEL_COUNT)
                .map(|_| SampleBuffer::new(window_size))
                .collect(),
            window_scratch: vec![0.0; window_size],
            normalizer: BandPowerNormalizer::new(window_size),
            variance: VarianceWindow::new(),
            machine: FlowStateMachine::new(),
            scorer: CoherenceScorer::new(),
            config: FlowStateConfig::default(),
            contacts: [ContactQuality::Off; CHANNEL_COUNT],
            motion_level: 0.0,
        })
    }

    pub fn config(&self) -> &FlowStateConfig {
        &self.config
    }

    /// Replace the whole configuration between ticks. Atomic by construction;
    /// a tick in progress never observes a half-applied config.
    pub fn set_config(&mut self, config: FlowStateConfig) {
        self.config = config;
    }

    pub fn set_coherence_tuning(&mut self, tuning: CoherenceTuning) {
        self.scorer = CoherenceScorer::with_tuning(tuning);
    }

    /// Route one event from the device-connection layer.
    pub fn ingest(&mut self, event: SignalEvent) -> Result<(), SignalError> {
        match event {
            SignalEvent::Samples {
                channel, samples, ..
            } => self.push_samples(channel, &samples),
            SignalEvent::BandPower { band, values } => {
                self.push_band_power(band, &values);
                Ok(())
            }
            SignalEvent::Motion { x, y, z } => {
                self.set_motion(x, y, z);
                Ok(())
            }
            SignalEvent::Contact { codes } => {
                self.set_contact_codes(codes);
                Ok(())
            }
        }
    }

    /// Drain a source, ingesting every pending event. Returns how many were
    /// consumed.
    pub fn pump<S: EventSource>(&mut self, source: &mut S) -> Result<usize, SignalError> {
        let mut count = 0;
        while let Some(event) = source.next_event()? {
            self.ingest(event)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn push_samples(&mut self, channel: usize, samples: &[f32]) -> Result<(), SignalError> {
        let buffer =
            self.buffers
                .get_mut(channel)
                .ok_or(SignalError::ChannelOutOfRange {
                    channel,
                    channels: CHANNEL_COUNT,
                })?;
        buffer.push_slice(samples);
        Ok(())
    }

    /// Apply a pre-computed relative band-power event; multiple values are
    /// averaged to one. Malformed events are silently discarded.
    pub fn push_band_power(&mut self, band: Band, values: &[f32]) {
        if values.is_empty() {
            debug!("discarding empty {} band event", band.label());
            return;
        }
        let value = values.iter().sum::<f32>() / values.len() as f32;
        self.normalizer.apply_band_value(band, value);
    }

    pub fn set_motion(&mut self, x: f32, y: f32, z: f32) {
        self.motion_level = quality::motion_level(x, y, z);
    }

    /// Update electrode contact codes. A frame containing any unknown code is
    /// discarded whole and the previous qualities are retained.
    pub fn set_contact_codes(&mut self, codes: [u8; CHANNEL_COUNT]) {
        let mut contacts = [ContactQuality::Off; CHANNEL_COUNT];
        for (slot, &code) in contacts.iter_mut().zip(codes.iter()) {
            match ContactQuality::from_code(code) {
                Some(contact) => *slot = contact,
                None => {
                    debug!("discarding contact frame with unknown code {code}");
                    return;
                }
            }
        }
        self.contacts = contacts;
    }

    pub fn motion_level(&self) -> f32 {
        self.motion_level
    }

    pub fn electrode_quality(&self) -> f32 {
        quality::electrode_quality(&self.contacts)
    }

    /// Rolling raw history for one band, oldest first. Display only.
    pub fn band_history(&self, band: Band) -> impl Iterator<Item = f32> + '_ {
        self.normalizer.history(band)
    }

    /// Advance the pipeline one tick: spectral stage over every channel with
    /// a full window, band normalization, gate, flow decision, and coherence
    /// score. Worst case is "no band update this tick"; the derived outputs
    /// are still recomputed from the retained smoothed state.
    pub fn update(&mut self, now: Instant) -> TickOutput {
        self.refresh_bands();

        let smoothed = *self.normalizer.smoothed();
        self.variance.push(smoothed.alpha, smoothed.beta);
        let variance = self.variance.variance();
        let electrode_quality = self.electrode_quality();

        let gate_valid = quality::gate_valid(
            &self.config,
            &GateInputs {
                total_power: smoothed.total(),
                variance,
                electrode_quality,
                alpha: smoothed.alpha,
            },
        );

        let (flow, transition) = self.machine.update(
            &FlowInputs {
                bands: &smoothed,
                motion_level: self.motion_level,
                variance,
                gate_valid,
            },
            now,
            &self.config,
        );

        let coherence = self.scorer.score(&smoothed, electrode_quality, variance);
        let zone = coherence_zone(coherence);

        TickOutput {
            snapshot: StateSnapshot {
                bands: *self.normalizer.raw(),
                smoothed_bands: smoothed,
                relaxation_index: smoothed.relaxation_index(),
                meditation_index: smoothed.meditation_index(),
                focus_index: smoothed.focus_index(),
            },
            flow,
            transition,
            coherence,
            zone,
        }
    }

    /// Return every piece of per-connection state to its initial value
    /// (disconnect/reconnect boundary).
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.normalizer.reset();
        self.variance.clear();
        self.machine.reset();
        self.contacts = [ContactQuality::Off; CHANNEL_COUNT];
        self.motion_level = 0.0;
    }

    fn refresh_bands(&mut self) {
        let mut channel_powers = [[0.0f32; 5]; CHANNEL_COUNT];
        let mut valid = 0;
        for buffer in &self.buffers {
            // Channels still short of a full window sit this tick out.
            if !buffer.copy_latest_into(&mut self.window_scratch) {
                continue;
            }
            self.analyzer.process(&self.window_scratch);
            for (slot, band) in channel_powers[valid].iter_mut().zip(Band::ALL.iter()) {
                let (low_hz, high_hz) = band.range_hz();
                *slot = self.analyzer.band_power(low_hz, high_hz);
            }
            valid += 1;
        }
        if valid == 0 {
            return;
        }
        self.normalizer.update(&channel_powers[..valid]);
    }
}
