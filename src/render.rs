//! Terminal visualization. Reads the final queue at its own tick and redraws
//! the newest frame in place.

use anyhow::Result;
use crossbeam_channel::{select, tick, Receiver, TryRecvError};
use std::io::Write;
use std::time::Duration;

use crate::dsp::{FrequencyBandIntensity, SpectrumFrame};
use crate::pipeline::{CancellationToken, PipelineOutput};

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPECTRUM_COLUMNS: usize = 64;
const BAR_WIDTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Log-scaled bar per frequency column
    Spectrum,
    /// One bar per configured band
    Bands,
    /// Colour swatch driven by the first and last band
    Color,
}

/// Log compression used by every view: `ln(1 + 10 x)`.
pub fn scale_intensity(intensity: f64) -> f64 {
    (1.0 + intensity.max(0.0) * 10.0).ln()
}

/// Spectrum as one row of block glyphs, bins averaged into `columns`.
pub fn spectrum_line(spectrum: &[f64], columns: usize) -> String {
    if spectrum.is_empty() || columns == 0 {
        return String::new();
    }
    let columns = columns.min(spectrum.len());
    let per_column = spectrum.len() as f64 / columns as f64;
    let heights: Vec<f64> = (0..columns)
        .map(|c| {
            let start = (c as f64 * per_column) as usize;
            let end = (((c + 1) as f64 * per_column) as usize).max(start + 1);
            let slice = &spectrum[start..end.min(spectrum.len())];
            scale_intensity(slice.iter().sum::<f64>() / slice.len() as f64)
        })
        .collect();
    let peak = heights.iter().copied().fold(0.0f64, f64::max);

    heights
        .iter()
        .map(|&h| {
            if peak <= 0.0 {
                BLOCKS[0]
            } else {
                let level = ((h / peak) * (BLOCKS.len() - 1) as f64).round() as usize;
                BLOCKS[level.min(BLOCKS.len() - 1)]
            }
        })
        .collect()
}

/// `name ▇▇▇▇   0.123` per band, separated by two spaces.
pub fn bands_line(frame: &[FrequencyBandIntensity]) -> String {
    frame
        .iter()
        .map(|b| {
            let filled = ((scale_intensity(b.intensity) / 10f64.ln_1p()) * BAR_WIDTH as f64)
                .round()
                .clamp(0.0, BAR_WIDTH as f64) as usize;
            format!(
                "{} {}{} {:.3}",
                b.band.name,
                "█".repeat(filled),
                " ".repeat(BAR_WIDTH - filled),
                b.intensity
            )
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn scale_to_channel(value: f64) -> u8 {
    (20.0 + value * 200.0 * 8.0).clamp(0.0, 255.0) as u8
}

/// Red follows the first band, blue the last one.
pub fn band_color(frame: &[FrequencyBandIntensity]) -> (u8, u8, u8) {
    let first = frame.first().map_or(0.0, |b| b.intensity);
    let last = frame.last().map_or(0.0, |b| b.intensity);
    (scale_to_channel(first * 0.6), 0, scale_to_channel(last * 2.3))
}

fn color_line(frame: &[FrequencyBandIntensity]) -> String {
    let (r, g, b) = band_color(frame);
    format!(
        "\x1b[48;2;{};{};{}m{}\x1b[0m rgb({:>3},{:>3},{:>3})",
        r,
        g,
        b,
        " ".repeat(BAR_WIDTH),
        r,
        g,
        b
    )
}

/// Draws the pipeline output until it closes or cancellation is signalled.
/// Returns the number of redraws.
pub fn run_render_loop(
    cancel: &CancellationToken,
    output: PipelineOutput,
    view: View,
    period: Duration,
) -> Result<u64> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match output {
        PipelineOutput::Spectrum(frames) => draw_loop(cancel, &frames, period, &mut out, |spectrum: &SpectrumFrame| {
            spectrum_line(spectrum, SPECTRUM_COLUMNS)
        }),
        PipelineOutput::Bands(frames) => draw_loop(cancel, &frames, period, &mut out, |frame: &Vec<FrequencyBandIntensity>| {
            match view {
                View::Color => color_line(frame),
                _ => bands_line(frame),
            }
        }),
    }
}

fn draw_loop<T, W, F>(
    cancel: &CancellationToken,
    frames: &Receiver<T>,
    period: Duration,
    out: &mut W,
    draw: F,
) -> Result<u64>
where
    W: Write,
    F: Fn(&T) -> String,
{
    let ticker = tick(period);
    let mut latest: Option<T> = None;
    let mut drawn: u64 = 0;

    loop {
        select! {
            recv(ticker) -> _ => {}
            recv(cancel.receiver()) -> _ => break,
        }

        // Never wait on the pipeline: redraw the previous frame if nothing new.
        match frames.try_recv() {
            Ok(frame) => latest = Some(frame),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        if let Some(ref frame) = latest {
            write!(out, "\r{}\x1b[K", draw(frame))?;
            out.flush()?;
            drawn += 1;
        }
    }

    writeln!(out)?;
    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::FrequencyBand;
    use crate::pipeline::Cancellation;
    use crossbeam_channel::bounded;

    fn intensity(name: &str, value: f64) -> FrequencyBandIntensity {
        FrequencyBandIntensity {
            band: FrequencyBand::new(name, 0.0, 1.0),
            intensity: value,
        }
    }

    #[test]
    fn spectrum_line_scales_to_peak() {
        let line = spectrum_line(&[0.0, 0.0, 5.0, 5.0], 2);
        assert_eq!(line, "▁█");
        assert_eq!(spectrum_line(&[0.0; 8], 4), "▁▁▁▁");
        assert_eq!(spectrum_line(&[1.0, 2.0], 16).chars().count(), 2);
    }

    #[test]
    fn bands_line_lists_every_band() {
        let line = bands_line(&[intensity("bass", 0.0), intensity("treble", 0.75)]);
        assert!(line.starts_with("bass "));
        assert!(line.contains("treble █"));
        assert!(line.ends_with("0.750"));
    }

    #[test]
    fn color_saturates() {
        assert_eq!(band_color(&[]), (20, 0, 20));
        assert_eq!(band_color(&[intensity("bass", 1.0), intensity("treble", 0.0)]), (255, 0, 20));
    }

    #[test]
    fn draw_loop_stops_when_pipeline_closes() {
        let cancellation = Cancellation::new();
        let (tx, rx) = bounded(1);
        tx.send(vec![1.0, 0.0]).unwrap();
        drop(tx);

        let mut out = Vec::new();
        let drawn = draw_loop(&cancellation.token(), &rx, Duration::from_millis(1), &mut out, |s: &Vec<f64>| {
            spectrum_line(s, 2)
        })
        .unwrap();

        assert_eq!(drawn, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("█▁"));
    }
}
