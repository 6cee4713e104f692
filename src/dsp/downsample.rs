use crossbeam_channel::{bounded, Receiver};

use super::{recv_or_cancel, send_or_cancel, spawn_stage};
use crate::audio::frame::CHANNEL_BUFFER_SIZE;
use crate::error::PipelineError;
use crate::math::{add_to_average, Sample};
use crate::pipeline::CancellationToken;

/// Per-index running average over a window of frames.
#[derive(Clone, Debug)]
pub struct FrameAverager<T> {
    average: Vec<T>,
    count: usize,
}

impl<T: Sample> FrameAverager<T> {
    pub fn new(frame_size: usize) -> Self {
        Self {
            average: vec![T::zero(); frame_size],
            count: 0,
        }
    }

    /// Folds one frame in. Missing trailing samples count as zero and
    /// samples past `frame_size` are ignored.
    pub fn fold(&mut self, frame: &[T]) {
        for (i, slot) in self.average.iter_mut().enumerate() {
            let sample = frame.get(i).copied().unwrap_or_else(T::zero);
            *slot = add_to_average(*slot, sample, self.count);
        }
        self.count += 1;
    }

    /// Number of frames folded since the last reset.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn average(&self) -> &[T] {
        &self.average
    }

    /// Hands out the current average and starts a fresh window.
    pub fn take(&mut self) -> Vec<T> {
        self.count = 0;
        let len = self.average.len();
        std::mem::replace(&mut self.average, vec![T::zero(); len])
    }

    /// Puts back an average that could not be delivered, keeping its count.
    pub(crate) fn restore(&mut self, average: Vec<T>, count: usize) {
        self.average = average;
        self.count = count;
    }
}

/// Averages every `reduction_rate` consecutive frames into one.
///
/// Blocks on output when downstream is slower than upstream, so it belongs
/// in front of stages that keep up. Partial windows are never emitted.
pub fn downsample<T: Sample>(
    cancel: &CancellationToken,
    input: Receiver<Vec<T>>,
    frame_size: usize,
    reduction_rate: usize,
) -> Result<Receiver<Vec<T>>, PipelineError> {
    if reduction_rate == 0 {
        return Err(PipelineError::InvalidReductionRate);
    }
    if frame_size == 0 {
        return Err(PipelineError::InvalidFrameSize(frame_size));
    }

    let (output, receiver) = bounded(CHANNEL_BUFFER_SIZE);
    let cancel = cancel.clone();

    spawn_stage("downsample", move || {
        let mut averager = FrameAverager::new(frame_size);

        while let Some(frame) = recv_or_cancel(&input, &cancel) {
            averager.fold(&frame);

            if averager.count() == reduction_rate && !send_or_cancel(&output, averager.take(), &cancel) {
                return;
            }
        }

        if !averager.is_empty() {
            log::debug!(
                "downsample: discarding partial window of {} frames",
                averager.count()
            );
        }
    })?;

    Ok(receiver)
}
