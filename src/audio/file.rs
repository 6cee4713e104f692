use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use indicatif::ProgressBar;
use std::path::Path;
use std::time::{Duration, Instant};

use super::chunker::FrameChunker;
use super::decode::AudioDecoder;
use super::frame::{Frame, RecordingOptions, CHANNEL_BUFFER_SIZE};
use crate::dsp::{send_or_cancel, spawn_stage};
use crate::error::PipelineError;
use crate::pipeline::CancellationToken;

/// Frames decoded from an audio file.
pub struct FileSource {
    pub frames: Receiver<Frame>,
    /// Number of frames the file will yield, when the container says.
    pub total_frames: Option<u64>,
}

/// Decodes `path` on a background thread and streams it as frames.
///
/// With `realtime` set, frames are released at the rate a microphone would
/// produce them; otherwise as fast as the pipeline accepts them. The file
/// must already be sampled at the configured rate.
pub fn stream_file(
    cancel: &CancellationToken,
    path: &Path,
    options: RecordingOptions,
    realtime: bool,
    progress: Option<ProgressBar>,
) -> Result<FileSource> {
    let mut decoder = AudioDecoder::open(path)?;

    let actual = decoder.sample_rate() as f64;
    if (actual - options.sample_rate()).abs() > f64::EPSILON {
        return Err(PipelineError::SampleRateMismatch {
            expected: options.sample_rate(),
            actual,
        }
        .into());
    }

    let frame_size = options.frame_size();
    let total_frames = decoder
        .total_samples()
        .map(|samples| samples.div_ceil(frame_size as u64));
    let period = Duration::from_secs_f64(1.0 / options.frame_rate());

    let (output, frames) = bounded(CHANNEL_BUFFER_SIZE);
    let cancel = cancel.clone();

    spawn_stage("file_source", move || {
        let mut chunker = FrameChunker::new(frame_size);
        let mut deadline = Instant::now();
        let mut delivered: u64 = 0;

        let mut deliver = |frame: Frame| -> bool {
            if realtime {
                deadline += period;
                match cancel.receiver().recv_deadline(deadline) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => return false,
                }
            }
            if !send_or_cancel(&output, frame, &cancel) {
                return false;
            }
            delivered += 1;
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            true
        };

        loop {
            let block = match decoder.next_block() {
                Ok(Some(block)) => block,
                Ok(None) => break,
                Err(err) => {
                    log::error!("Decoding stopped: {:#}", err);
                    return;
                }
            };

            for frame in chunker.push(block.into_iter().map(f64::from)) {
                if !deliver(frame) {
                    return;
                }
            }
        }

        if let Some(last) = chunker.finish() {
            deliver(last);
        }
        log::info!("End of file after {} frames", delivered);
    })?;

    Ok(FileSource {
        frames,
        total_frames,
    })
}
