use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::Receiver;

use super::frame::{Frame, RecordingOptions, CHANNEL_BUFFER_SIZE};
use super::sink::{frame_sink, FrameSink, SinkCloser};
use crate::error::PipelineError;

/// Live capture from the default input device. Dropping it stops the
/// stream and closes `frames`; so does a stream error.
pub struct Microphone {
    _stream: Stream,
    pub frames: Receiver<Frame>,
}

pub fn record_audio(options: RecordingOptions) -> Result<Microphone> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| PipelineError::Capture("no default input device available".into()))?;
    log::info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let sample_rate = cpal::SampleRate(options.sample_rate().round() as u32);
    let supported = device
        .supported_input_configs()
        .context("Failed to query input configs")?
        .find(|range| {
            range.channels() == 1
                && range.min_sample_rate() <= sample_rate
                && range.max_sample_rate() >= sample_rate
        })
        .map(|range| range.with_sample_rate(sample_rate));

    let supported = match supported {
        Some(config) => config,
        None => {
            let fallback = device
                .default_input_config()
                .context("Failed to get default input config")?;
            if fallback.channels() != 1 {
                return Err(PipelineError::UnexpectedChannelCount(fallback.channels() as usize).into());
            }
            if fallback.sample_rate() != sample_rate {
                return Err(PipelineError::SampleRateMismatch {
                    expected: options.sample_rate(),
                    actual: fallback.sample_rate().0 as f64,
                }
                .into());
            }
            fallback
        }
    };

    log::info!(
        "Capture config: {}Hz, {} channel, {:?}",
        supported.sample_rate().0,
        supported.channels(),
        supported.sample_format()
    );

    let config = StreamConfig {
        channels: 1,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let (sink, closer, frames) = frame_sink(options.frame_size(), CHANNEL_BUFFER_SIZE);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_input_stream::<f32>(&device, &config, sink, closer)?,
        SampleFormat::I16 => build_input_stream::<i16>(&device, &config, sink, closer)?,
        SampleFormat::U16 => build_input_stream::<u16>(&device, &config, sink, closer)?,
        sample_format => {
            return Err(PipelineError::Capture(format!(
                "unsupported sample format: {}",
                sample_format
            ))
            .into());
        }
    };
    stream.play().context("Failed to start input stream")?;

    Ok(Microphone {
        _stream: stream,
        frames,
    })
}

fn build_input_stream<S>(
    device: &Device,
    config: &StreamConfig,
    mut sink: FrameSink,
    closer: SinkCloser,
) -> Result<Stream>
where
    S: SizedSample,
    f32: FromSample<S>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[S], _: &cpal::InputCallbackInfo| {
            sink.push(data.iter().map(|&s| f64::from(f32::from_sample(s))));
        },
        move |err| {
            // Closing the queue drains the pipeline and ends the render loop.
            if closer.close() {
                log::error!("Audio stream error, stopping capture: {}", err);
            }
        },
        None,
    )?;
    Ok(stream)
}
