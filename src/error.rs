use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("frame size must be an even number of at least 2 samples, got {0}")]
    InvalidFrameSize(usize),

    #[error("sample rate must be a positive finite number of Hz, got {0}")]
    InvalidSampleRate(f64),

    #[error("reduction rate must be at least 1")]
    InvalidReductionRate,

    #[error("band {name:?} has an invalid range [{lower}, {upper})")]
    InvalidBand { name: String, lower: f64, upper: f64 },

    #[error("spectral intensity analysis needs at least one band")]
    NoBands,

    #[error("received an unexpected number of input channels, expected 1 but got {0}")]
    UnexpectedChannelCount(usize),

    #[error("audio is sampled at {actual} Hz but the pipeline expects {expected} Hz")]
    SampleRateMismatch { expected: f64, actual: f64 },

    #[error("failed to spawn {stage} thread: {reason}")]
    Spawn { stage: &'static str, reason: String },

    #[error("capture error: {0}")]
    Capture(String),
}
