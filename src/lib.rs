//! Flow-state analysis core for a four-electrode EEG headband.
//!
//! Raw scalp samples (or pre-computed band-power events) go in; out come a
//! continuous coherence score in [0, 1] for live graphing and a debounced
//! flow-state decision for triggering downstream rewards. The pipeline is
//! single-threaded and pull-based: a host loop feeds events into a
//! [`signal::FlowPipeline`] and calls [`signal::FlowPipeline::update`] once
//! per tick. This is a best-effort heuristic pipeline, not a medical
//! instrument.

pub mod signal;

pub use signal::{
    coherence_zone, Band, BrainwaveBands, CoherenceZone, FlowPipeline, FlowState,
    FlowStateConfig, FlowTransition, SignalError, SignalEvent, StateSnapshot, TickOutput,
};
