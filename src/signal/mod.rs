// Spectral analysis and flow-state decision core.
pub mod bands;
pub mod buffer;
pub mod coherence;
pub mod error;
pub mod flow;
pub mod pipeline;
pub mod quality;
pub mod source;
pub mod spectrum;

// Re-export the public surface so callers can work from one import path.
pub use bands::{Band, BandPowerNormalizer, BrainwaveBands};
pub use buffer::SampleBuffer;
pub use coherence::{coherence_zone, CoherenceScorer, CoherenceTuning, CoherenceZone};
pub use error::SignalError;
pub use flow::{
    FlowInputs, FlowState, FlowStateConfig, FlowStateMachine, FlowTransition, VarianceWindow,
};
pub use pipeline::{FlowPipeline, StateSnapshot, TickOutput, CHANNEL_COUNT};
pub use quality::{electrode_quality, gate_valid, motion_level, ContactQuality, GateInputs};
pub use source::{EventSource, ManualSource, SignalEvent};
pub use spectrum::SpectralAnalyzer;
