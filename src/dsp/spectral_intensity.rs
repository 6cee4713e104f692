use crossbeam_channel::{bounded, Receiver};
use serde::Deserialize;

use super::fft::{FftInterpreter, SpectrumFrame};
use super::{recv_or_cancel, send_or_cancel, spawn_stage};
use crate::audio::frame::{RecordingOptions, CHANNEL_BUFFER_SIZE};
use crate::error::PipelineError;
use crate::pipeline::CancellationToken;

/// A named frequency range, `[lower_frequency, upper_frequency)` in Hz.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    #[serde(rename = "lower")]
    pub lower_frequency: f64,
    #[serde(rename = "upper")]
    pub upper_frequency: f64,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, lower_frequency: f64, upper_frequency: f64) -> Self {
        Self {
            name: name.into(),
            lower_frequency,
            upper_frequency,
        }
    }

    /// Whether a bin spanning `[lower_edge, upper_edge)` lies inside the band.
    pub fn contains_bin(&self, lower_edge: f64, upper_edge: f64) -> bool {
        lower_edge >= self.lower_frequency && upper_edge <= self.upper_frequency
    }

    fn validate(&self) -> Result<(), PipelineError> {
        let valid = self.lower_frequency.is_finite()
            && self.upper_frequency.is_finite()
            && self.lower_frequency >= 0.0
            && self.lower_frequency < self.upper_frequency;
        if valid {
            Ok(())
        } else {
            Err(PipelineError::InvalidBand {
                name: self.name.clone(),
                lower: self.lower_frequency,
                upper: self.upper_frequency,
            })
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyBandIntensity {
    pub band: FrequencyBand,
    pub intensity: f64,
}

/// One intensity per configured band, in configuration order.
pub type SpectralIntensityFrame = Vec<FrequencyBandIntensity>;

#[derive(Clone, Debug)]
pub struct SpectralIntensityAnalysisOptions {
    bands: Vec<FrequencyBand>,
    interpreter: FftInterpreter,
}

impl SpectralIntensityAnalysisOptions {
    pub fn new(options: RecordingOptions) -> Self {
        Self {
            bands: Vec::new(),
            interpreter: FftInterpreter::new(options),
        }
    }

    pub fn add_band(mut self, name: impl Into<String>, lower_frequency: f64, upper_frequency: f64) -> Self {
        self.bands
            .push(FrequencyBand::new(name, lower_frequency, upper_frequency));
        self
    }

    pub fn with_bands(mut self, bands: impl IntoIterator<Item = FrequencyBand>) -> Self {
        self.bands.extend(bands);
        self
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    pub fn frame_size(&self) -> usize {
        self.interpreter.options().frame_size()
    }

    pub fn interpreter(&self) -> &FftInterpreter {
        &self.interpreter
    }
}

/// Bin-to-band assignment, computed once before streaming.
#[derive(Clone, Debug)]
pub struct BandLayout {
    bands: Vec<FrequencyBand>,
    band_for_bin: Vec<Option<usize>>,
    bins_in_band: Vec<usize>,
    frame_size: usize,
}

impl BandLayout {
    pub fn new(options: &SpectralIntensityAnalysisOptions) -> Result<Self, PipelineError> {
        if options.bands.is_empty() {
            return Err(PipelineError::NoBands);
        }
        for band in &options.bands {
            band.validate()?;
        }

        let frame_size = options.frame_size();
        let interpreter = options.interpreter();
        let mut bins_in_band = vec![0; options.bands.len()];

        // First matching band wins; bins matching none stay unassigned.
        let band_for_bin: Vec<Option<usize>> = (0..frame_size - 1)
            .map(|bin| {
                let lower_edge = interpreter.bin_frequency(bin);
                let upper_edge = interpreter.bin_frequency(bin + 1);
                let band = options
                    .bands
                    .iter()
                    .position(|band| band.contains_bin(lower_edge, upper_edge));
                if let Some(index) = band {
                    bins_in_band[index] += 1;
                }
                band
            })
            .collect();

        for (band, &count) in options.bands.iter().zip(&bins_in_band) {
            if count == 0 {
                log::warn!(
                    "Band {:?} [{}, {}) Hz covers no bins at {:.1} Hz resolution",
                    band.name,
                    band.lower_frequency,
                    band.upper_frequency,
                    interpreter.bin_width()
                );
            }
        }

        Ok(Self {
            bands: options.bands.clone(),
            band_for_bin,
            bins_in_band,
            frame_size,
        })
    }

    pub fn band_for_bin(&self, bin: usize) -> Option<usize> {
        self.band_for_bin.get(bin).copied().flatten()
    }

    pub fn band_bin_counts(&self) -> &[usize] {
        &self.bins_in_band
    }

    /// Sums magnitudes per band and scales each sum by `1 / frame_size`.
    ///
    /// The divisor is the frame size, not the bin count of the band, so
    /// wide bands read louder than narrow ones at equal per-bin magnitude.
    pub fn intensities(&self, spectrum: &[f64]) -> SpectralIntensityFrame {
        let mut sums = vec![0.0; self.bands.len()];
        for (bin, &magnitude) in spectrum.iter().enumerate() {
            if let Some(band) = self.band_for_bin(bin) {
                sums[band] += magnitude;
            }
        }

        self.bands
            .iter()
            .zip(sums)
            .map(|(band, sum)| FrequencyBandIntensity {
                band: band.clone(),
                intensity: sum / self.frame_size as f64,
            })
            .collect()
    }
}

/// Folds every spectrum into one intensity value per band, 1:1 with input.
pub fn analyse_spectral_intensity(
    cancel: &CancellationToken,
    input: Receiver<SpectrumFrame>,
    options: &SpectralIntensityAnalysisOptions,
) -> Result<Receiver<SpectralIntensityFrame>, PipelineError> {
    let layout = BandLayout::new(options)?;
    log::debug!(
        "spectral_intensity: bins per band {:?}",
        layout.band_bin_counts()
    );

    let (output, receiver) = bounded(CHANNEL_BUFFER_SIZE);
    let cancel = cancel.clone();

    spawn_stage("spectral_intensity", move || {
        while let Some(spectrum) = recv_or_cancel(&input, &cancel) {
            if !send_or_cancel(&output, layout.intensities(&spectrum), &cancel) {
                return;
            }
        }
    })?;

    Ok(receiver)
}
