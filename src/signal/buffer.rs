use std::collections::VecDeque;

/// Fixed-capacity sliding buffer of raw time-domain samples for one channel.
///
/// Pushing past capacity evicts the oldest sample, so the buffer always holds
/// the most recent `capacity` samples in arrival order.
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push_slice(&mut self, new_samples: &[f32]) {
        for &sample in new_samples {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first.
    ///
    /// Returns `false` (leaving `out` untouched) when fewer samples are
    /// buffered than requested; callers use this to exclude the channel from
    /// the current tick.
    pub fn copy_latest_into(&self, out: &mut [f32]) -> bool {
        if self.samples.len() < out.len() {
            return false;
        }
        let skip = self.samples.len() - out.len();
        for (dst, src) in out.iter_mut().zip(self.samples.iter().skip(skip)) {
            *dst = *src;
        }
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
