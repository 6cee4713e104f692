use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use audiolight::audio::{file, Frame, RecordingOptions};
use audiolight::cli::Cli;
use audiolight::config;
use audiolight::pipeline::{build_pipeline, Cancellation, CancellationToken, PipelineConfig, Reduction};
use audiolight::render::{run_render_loop, View};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if let Some(ref path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.sample_rate == config::default_sample_rate() { cli.sample_rate = cfg.recording.sample_rate; }
            if cli.frame_size == config::default_frame_size() { cli.frame_size = cfg.recording.frame_size; }
            if cli.tick_ms == config::default_tick_ms() { cli.tick_ms = cfg.pipeline.tick_ms; }
            if cli.view == config::default_view() { cli.view = cfg.pipeline.view; }
            if cli.reduction_rate.is_none() {
                cli.reduction_rate = cfg.pipeline.reduction_rate;
            }
            if cli.bands.is_empty() && !cfg.bands.is_empty() {
                cli.bands = cfg.bands;
            }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    let recording = RecordingOptions::new(cli.sample_rate, cli.frame_size)
        .context("Invalid recording options")?;

    let bands = match cli.view {
        View::Spectrum => None,
        View::Bands | View::Color if cli.bands.is_empty() => Some(config::default_bands()),
        View::Bands | View::Color => Some(cli.bands.clone()),
    };
    let pipeline_config = PipelineConfig {
        recording,
        reduction: cli.reduction_rate.map_or(Reduction::Adaptive, Reduction::Fixed),
        bands,
    };

    let cancellation = Cancellation::new();
    let token = cancellation.token();

    let interrupt = cancellation.clone();
    ctrlc::set_handler(move || {
        log::info!("Interrupted, stopping");
        interrupt.cancel();
    })
    .context("Failed to install interrupt handler")?;

    if let Some(secs) = cli.duration {
        let timer = cancellation.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs_f64(secs.max(0.0)));
            log::info!("Duration of {:.1}s reached, stopping", secs);
            timer.cancel();
        });
    }

    let source = open_source(&cli, recording, &token)?;
    let output = build_pipeline(&token, source.frames, &pipeline_config)
        .context("Failed to start pipeline")?;

    let drawn = run_render_loop(&token, output, cli.view, Duration::from_millis(cli.tick_ms.max(1)))?;

    if let Some(pb) = source.progress {
        pb.finish_and_clear();
    }
    log::info!("Done after {} redraws", drawn);
    Ok(())
}

struct Source {
    frames: Receiver<Frame>,
    progress: Option<ProgressBar>,
    #[cfg(feature = "microphone")]
    _microphone: Option<audiolight::audio::microphone::Microphone>,
}

fn open_source(cli: &Cli, recording: RecordingOptions, token: &CancellationToken) -> Result<Source> {
    if let Some(ref input) = cli.input {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        log::info!("Input: {}", input.display());

        let progress = ProgressBar::new(0);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );

        let source = file::stream_file(token, input, recording, cli.realtime, Some(progress.clone()))?;
        if let Some(total) = source.total_frames {
            progress.set_length(total);
        }
        return Ok(Source {
            frames: source.frames,
            progress: Some(progress),
            #[cfg(feature = "microphone")]
            _microphone: None,
        });
    }

    open_microphone(cli, recording)
}

#[cfg(feature = "microphone")]
fn open_microphone(cli: &Cli, recording: RecordingOptions) -> Result<Source> {
    if !cli.microphone {
        log::info!("No input file given, recording from the microphone");
    }
    let microphone = audiolight::audio::microphone::record_audio(recording)
        .context("Failed to start audio capture")?;
    Ok(Source {
        frames: microphone.frames.clone(),
        progress: None,
        _microphone: Some(microphone),
    })
}

#[cfg(not(feature = "microphone"))]
fn open_microphone(cli: &Cli, _recording: RecordingOptions) -> Result<Source> {
    if cli.microphone {
        anyhow::bail!(
            "Microphone capture requires the 'microphone' feature. \
             Rebuild with: cargo build --features microphone"
        );
    }
    anyhow::bail!("Input audio file is required")
}
