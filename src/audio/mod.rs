//! Capture side of the pipeline: frame types and the sources that produce
//! time-domain frames.

pub mod chunker;
pub mod decode;
pub mod file;
pub mod frame;
#[cfg(feature = "microphone")]
pub mod microphone;
pub mod sink;

pub use frame::{Frame, RecordingOptions, CHANNEL_BUFFER_SIZE};
