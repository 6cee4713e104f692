//! Wires the stages into the capture → visualization chain.

mod cancel;

pub use cancel::{Cancellation, CancellationToken};

use crossbeam_channel::Receiver;

use crate::audio::{Frame, RecordingOptions};
use crate::dsp::{
    analyse_spectral_intensity, downsample, downsample_dynamically, drop_frames_dynamically, fft,
    BandLayout, FrequencyBand, SpectralIntensityAnalysisOptions, SpectralIntensityFrame, SpectrumFrame,
};
use crate::error::PipelineError;

/// How spectra are thinned out between the transform and the consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Average every N spectra. Only safe when the consumer keeps up.
    Fixed(usize),
    /// Average for as long as the next stage is busy.
    Adaptive,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub recording: RecordingOptions,
    pub reduction: Reduction,
    /// Fold spectra into these bands; `None` streams raw spectra.
    pub bands: Option<Vec<FrequencyBand>>,
}

/// Final queue of a running pipeline, always behind a frame dropper.
pub enum PipelineOutput {
    Spectrum(Receiver<SpectrumFrame>),
    Bands(Receiver<SpectralIntensityFrame>),
}

/// Spawns every stage for `config` on top of the capture queue `frames`.
pub fn build_pipeline(
    cancel: &CancellationToken,
    frames: Receiver<Frame>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let frame_size = config.recording.frame_size();
    let bin_count = frame_size / 2;

    // Reject bad settings before any stage thread starts.
    if config.reduction == Reduction::Fixed(0) {
        return Err(PipelineError::InvalidReductionRate);
    }
    let band_options = match &config.bands {
        Some(bands) => {
            let options = SpectralIntensityAnalysisOptions::new(config.recording)
                .with_bands(bands.iter().cloned());
            BandLayout::new(&options)?;
            Some(options)
        }
        None => None,
    };

    log::info!(
        "Pipeline: {}Hz, {} samples/frame ({:.1} frames/s), reduction {:?}",
        config.recording.sample_rate(),
        frame_size,
        config.recording.frame_rate(),
        config.reduction
    );

    let spectra = fft(cancel, frames, frame_size)?;
    let reduced = match config.reduction {
        Reduction::Fixed(rate) => downsample(cancel, spectra, bin_count, rate)?,
        Reduction::Adaptive => downsample_dynamically(cancel, spectra, bin_count)?,
    };

    match band_options {
        Some(options) => {
            for band in options.bands() {
                log::info!(
                    "Band {:<10} {:>8.1} - {:>8.1} Hz",
                    band.name,
                    band.lower_frequency,
                    band.upper_frequency
                );
            }
            let intensities = analyse_spectral_intensity(cancel, reduced, &options)?;
            Ok(PipelineOutput::Bands(drop_frames_dynamically(cancel, intensities)?))
        }
        None => Ok(PipelineOutput::Spectrum(drop_frames_dynamically(cancel, reduced)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::f64::consts::PI;

    fn tone(frame_size: usize, bin: usize) -> Frame {
        (0..frame_size)
            .map(|n| (2.0 * PI * bin as f64 * n as f64 / frame_size as f64).sin())
            .collect()
    }

    #[test]
    fn band_pipeline_reports_loudest_band() {
        let cancellation = Cancellation::new();
        let recording = RecordingOptions::new(1600.0, 16).unwrap();
        let config = PipelineConfig {
            recording,
            reduction: Reduction::Fixed(2),
            bands: Some(vec![
                FrequencyBand::new("low", 0.0, 400.0),
                FrequencyBand::new("high", 400.0, 800.0),
            ]),
        };

        let (tx, rx) = bounded(4);
        let output = build_pipeline(&cancellation.token(), rx, &config).unwrap();
        let PipelineOutput::Bands(bands) = output else {
            panic!("expected band output");
        };

        // 100 Hz bins: a tone in bin 6 (600 Hz) lands in "high".
        tx.send(tone(16, 6)).unwrap();
        tx.send(tone(16, 6)).unwrap();
        drop(tx);

        let frame = bands.recv().unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame[0].band.name, "low");
        assert!(frame[0].intensity.abs() < 1e-9);
        assert!((frame[1].intensity - 0.5).abs() < 1e-9);
        assert!(bands.recv().is_err());
    }

    #[test]
    fn spectrum_pipeline_shuts_down_when_capture_ends() {
        let cancellation = Cancellation::new();
        let config = PipelineConfig {
            recording: RecordingOptions::new(800.0, 8).unwrap(),
            reduction: Reduction::Adaptive,
            bands: None,
        };

        let (tx, rx) = bounded(1);
        let PipelineOutput::Spectrum(spectra) = build_pipeline(&cancellation.token(), rx, &config).unwrap() else {
            panic!("expected spectrum output");
        };
        tx.send(vec![1.0; 8]).unwrap();
        drop(tx);

        let frames: Vec<SpectrumFrame> = spectra.iter().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 4);
        assert!((frames[0][0] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn cancellation_closes_the_output() {
        let cancellation = Cancellation::new();
        let config = PipelineConfig {
            recording: RecordingOptions::new(800.0, 8).unwrap(),
            reduction: Reduction::Fixed(4),
            bands: None,
        };
        let (_tx, rx) = bounded::<Frame>(1);
        let PipelineOutput::Spectrum(spectra) = build_pipeline(&cancellation.token(), rx, &config).unwrap() else {
            panic!("expected spectrum output");
        };
        cancellation.cancel();
        assert!(spectra.recv().is_err());
    }

    #[test]
    fn invalid_reduction_fails_construction() {
        let cancellation = Cancellation::new();
        let config = PipelineConfig {
            recording: RecordingOptions::new(800.0, 8).unwrap(),
            reduction: Reduction::Fixed(0),
            bands: None,
        };
        let (_tx, rx) = bounded::<Frame>(1);
        assert!(matches!(
            build_pipeline(&cancellation.token(), rx, &config),
            Err(PipelineError::InvalidReductionRate)
        ));
    }
}
