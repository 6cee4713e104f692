//! Streaming stages. Each stage owns one thread, reads frames from a bounded
//! input queue and writes to a bounded output queue it creates itself.
//! Dropping the output sender on exit is what shuts the next stage down.

pub mod downsample;
pub mod downsample_dynamically;
pub mod drop_frames;
pub mod fft;
pub mod spectral_intensity;

use crossbeam_channel::{select, Receiver, Sender};

use crate::error::PipelineError;
use crate::pipeline::CancellationToken;

pub use downsample::downsample;
pub use downsample_dynamically::downsample_dynamically;
pub use drop_frames::drop_frames_dynamically;
pub use fft::{fft, FftInterpreter, FrequencyContent, SpectrumFrame};
pub use spectral_intensity::{
    analyse_spectral_intensity, BandLayout, FrequencyBand, FrequencyBandIntensity,
    SpectralIntensityAnalysisOptions, SpectralIntensityFrame,
};

pub(crate) fn spawn_stage<F>(stage: &'static str, body: F) -> Result<(), PipelineError>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(stage.to_string())
        .spawn(move || {
            log::debug!("{} started", stage);
            body();
            log::debug!("{} stopped", stage);
        })
        .map(|_| ())
        .map_err(|e| PipelineError::Spawn {
            stage,
            reason: e.to_string(),
        })
}

/// Blocks for the next input frame. `None` on cancellation or closed input.
pub(crate) fn recv_or_cancel<T>(input: &Receiver<T>, cancel: &CancellationToken) -> Option<T> {
    select! {
        recv(input) -> frame => frame.ok(),
        recv(cancel.receiver()) -> _ => None,
    }
}

/// Blocks until `frame` is queued. `false` on cancellation or closed output.
pub(crate) fn send_or_cancel<T>(output: &Sender<T>, frame: T, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    select! {
        send(output, frame) -> sent => sent.is_ok(),
        recv(cancel.receiver()) -> _ => false,
    }
}
