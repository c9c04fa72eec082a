use std::collections::VecDeque;
use std::time::SystemTime;

use crate::signal::bands::Band;
use crate::signal::error::SignalError;

/// One input event from the device-connection layer (wireless link, bridge,
/// or playback).
#[derive(Clone, Debug)]
pub enum SignalEvent {
    /// Raw time-domain samples for one electrode channel (0..3).
    Samples {
        channel: usize,
        received_at: SystemTime,
        samples: Vec<f32>,
    },
    /// Pre-computed relative band power, bypassing the spectral stage when
    /// the raw waveform is unavailable. Multiple values are averaged to one.
    BandPower { band: Band, values: Vec<f32> },
    /// Accelerometer triple.
    Motion { x: f32, y: f32, z: f32 },
    /// Per-electrode contact codes: 1 good, 2 medium, 3 poor, 4 off.
    Contact { codes: [u8; 4] },
}

/// Something that can yield signal events on demand.
pub trait EventSource {
    fn next_event(&mut self) -> Result<Option<SignalEvent>, SignalError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<SignalEvent>,
}

impl ManualSource {
    pub fn new(events: impl IntoIterator<Item = SignalEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }
}

impl EventSource for ManualSource {
    fn next_event(&mut self) -> Result<Option<SignalEvent>, SignalError> {
        Ok(self.queue.pop_front())
    }
}
