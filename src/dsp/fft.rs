use crossbeam_channel::{bounded, Receiver};
use rustfft::{num_complex::Complex, FftPlanner};

use super::{recv_or_cancel, send_or_cancel, spawn_stage};
use crate::audio::frame::{validate_frame_size, Frame, RecordingOptions, CHANNEL_BUFFER_SIZE};
use crate::error::PipelineError;
use crate::pipeline::CancellationToken;

/// One-sided magnitude spectrum, `frame_size / 2` bins.
pub type SpectrumFrame = Vec<f64>;

/// Turns time-domain frames into one-sided magnitude spectra.
///
/// The upper half of the transform mirrors the lower half for real input,
/// so only the first `frame_size / 2` magnitudes are emitted.
pub fn fft(
    cancel: &CancellationToken,
    input: Receiver<Frame>,
    frame_size: usize,
) -> Result<Receiver<SpectrumFrame>, PipelineError> {
    validate_frame_size(frame_size)?;

    let (output, receiver) = bounded(CHANNEL_BUFFER_SIZE);
    let cancel = cancel.clone();

    let mut planner = FftPlanner::<f64>::new();
    let transform = planner.plan_fft_forward(frame_size);

    spawn_stage("fft", move || {
        let mut buffer = vec![Complex::new(0.0, 0.0); frame_size];
        let mut scratch = vec![Complex::new(0.0, 0.0); transform.get_inplace_scratch_len()];
        let mut warned = false;

        while let Some(frame) = recv_or_cancel(&input, &cancel) {
            if frame.len() != frame_size && !warned {
                log::warn!(
                    "fft: got a frame of {} samples, expected {}; padding/truncating",
                    frame.len(),
                    frame_size
                );
                warned = true;
            }

            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(frame.get(i).copied().unwrap_or(0.0), 0.0);
            }
            transform.process_with_scratch(&mut buffer, &mut scratch);

            let spectrum: SpectrumFrame = buffer[..frame_size / 2].iter().map(|c| c.norm()).collect();
            if !send_or_cancel(&output, spectrum, &cancel) {
                return;
            }
        }
    })?;

    Ok(receiver)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyContent {
    pub frequency: f64,
    pub intensity: f64,
}

/// Maps bin indices of a spectrum to the frequencies they stand for.
#[derive(Clone, Copy, Debug)]
pub struct FftInterpreter {
    options: RecordingOptions,
}

impl FftInterpreter {
    pub fn new(options: RecordingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RecordingOptions {
        self.options
    }

    /// Lower edge frequency of bin `index`, in Hz.
    pub fn bin_frequency(&self, index: usize) -> f64 {
        index as f64 * self.options.sample_rate() / self.options.frame_size() as f64
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_frequency(1)
    }

    pub fn bin_count(&self) -> usize {
        self.options.frame_size() / 2
    }

    pub fn nyquist(&self) -> f64 {
        self.options.sample_rate() / 2.0
    }

    pub fn frequency_content(&self, spectrum: &[f64]) -> Vec<FrequencyContent> {
        spectrum
            .iter()
            .enumerate()
            .map(|(i, &intensity)| FrequencyContent {
                frequency: self.bin_frequency(i),
                intensity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Cancellation;
    use std::f64::consts::PI;

    fn interpreter() -> FftInterpreter {
        FftInterpreter::new(RecordingOptions::new(44100.0, 8).unwrap())
    }

    #[test]
    fn bin_frequencies() {
        let interpreter = interpreter();
        assert_eq!(interpreter.bin_count(), 4);
        assert_eq!(interpreter.bin_frequency(0), 0.0);
        assert_eq!(interpreter.bin_frequency(1), 5512.5);
        assert_eq!(interpreter.bin_frequency(3), 16537.5);
        assert_eq!(interpreter.bin_width(), 5512.5);
        assert_eq!(interpreter.nyquist(), 22050.0);
    }

    #[test]
    fn frequency_content_pairs_bins() {
        let content = interpreter().frequency_content(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(content.len(), 4);
        assert_eq!(
            content[2],
            FrequencyContent {
                frequency: 11025.0,
                intensity: 2.0
            }
        );
    }

    #[test]
    fn emits_one_sided_magnitudes() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(4);
        let spectra = fft(&cancellation.token(), rx, 8).unwrap();

        tx.send(vec![1.0; 8]).unwrap();
        let tone: Frame = (0..8).map(|n| (2.0 * PI * 2.0 * n as f64 / 8.0).cos()).collect();
        tx.send(tone).unwrap();
        drop(tx);

        let dc = spectra.recv().unwrap();
        assert_eq!(dc.len(), 4);
        assert!((dc[0] - 8.0).abs() < 1e-9);
        assert!(dc[1..].iter().all(|m| m.abs() < 1e-9));

        let tone = spectra.recv().unwrap();
        assert!((tone[2] - 4.0).abs() < 1e-9);
        assert!(tone[0].abs() < 1e-9 && tone[1].abs() < 1e-9 && tone[3].abs() < 1e-9);

        assert!(spectra.recv().is_err());
    }

    #[test]
    fn short_frames_are_zero_padded() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(1);
        let spectra = fft(&cancellation.token(), rx, 4).unwrap();
        tx.send(vec![1.0]).unwrap();
        let spectrum = spectra.recv().unwrap();
        assert_eq!(spectrum.len(), 2);
        assert!((spectrum[0] - 1.0).abs() < 1e-12);
        assert!((spectrum[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_odd_frame_size() {
        let cancellation = Cancellation::new();
        let (_tx, rx) = bounded::<Frame>(1);
        assert_eq!(
            fft(&cancellation.token(), rx, 5).err(),
            Some(PipelineError::InvalidFrameSize(5))
        );
    }

    #[test]
    fn stops_on_cancel() {
        let cancellation = Cancellation::new();
        let (_tx, rx) = bounded::<Frame>(1);
        let spectra = fft(&cancellation.token(), rx, 4).unwrap();
        cancellation.cancel();
        assert!(spectra.recv().is_err());
    }
}
