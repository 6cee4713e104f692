//! Streaming spectrum pipeline for real-time audio visualization.
//!
//! ```text
//! capture ──▶ fft ──▶ downsample / downsample_dynamically ──▶ [spectral_intensity] ──▶ drop_frames ──▶ render
//! ```
//!
//! Every stage runs on its own thread and talks to its neighbours through
//! bounded crossbeam queues. A shared [`pipeline::Cancellation`] stops all of
//! them; closing the capture queue drains the chain from front to back.

pub mod audio;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod render;

pub use error::PipelineError;
