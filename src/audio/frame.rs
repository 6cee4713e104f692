use crate::error::PipelineError;

/// Capacity of the queues between capture and the transform stages.
pub const CHANNEL_BUFFER_SIZE: usize = 16;

/// One block of mono time-domain samples as delivered by capture.
pub type Frame = Vec<f64>;

/// Sample rate and frame size shared by every stage that maps bins to Hz.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordingOptions {
    sample_rate: f64,
    frame_size: usize,
}

impl RecordingOptions {
    pub fn new(sample_rate: f64, frame_size: usize) -> Result<Self, PipelineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(PipelineError::InvalidSampleRate(sample_rate));
        }
        validate_frame_size(frame_size)?;
        Ok(Self {
            sample_rate,
            frame_size,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Rate at which capture produces frames, in frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate / self.frame_size as f64
    }
}

pub(crate) fn validate_frame_size(frame_size: usize) -> Result<(), PipelineError> {
    if frame_size < 2 || frame_size % 2 != 0 {
        return Err(PipelineError::InvalidFrameSize(frame_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_options() {
        assert_eq!(
            RecordingOptions::new(44100.0, 7),
            Err(PipelineError::InvalidFrameSize(7))
        );
        assert_eq!(
            RecordingOptions::new(44100.0, 0),
            Err(PipelineError::InvalidFrameSize(0))
        );
        assert!(matches!(
            RecordingOptions::new(0.0, 256),
            Err(PipelineError::InvalidSampleRate(_))
        ));
        assert!(RecordingOptions::new(f64::NAN, 256).is_err());
    }

    #[test]
    fn frame_rate() {
        let options = RecordingOptions::new(44000.0, 440).unwrap();
        assert!((options.frame_rate() - 100.0).abs() < 1e-9);
    }
}
