use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("fft window size must be a power of two (and at least 2), got {0}")]
    InvalidWindowSize(usize),
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("channel index {channel} out of range; pipeline has {channels} channels")]
    ChannelOutOfRange { channel: usize, channels: usize },
    #[error("event source failed: {0}")]
    Source(String),
}
