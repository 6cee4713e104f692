use clap::Parser;
use std::path::PathBuf;

use crate::dsp::FrequencyBand;
use crate::render::View;

#[derive(Parser, Debug)]
#[command(name = "audiolight", about = "Real-time spectrum and band intensity visualizer")]
pub struct Cli {
    /// Audio file to stream instead of the microphone (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Capture from the default input device
    #[arg(long, conflicts_with = "input")]
    pub microphone: bool,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 44100.0)]
    pub sample_rate: f64,

    /// Samples per frame (even)
    #[arg(long, default_value_t = 256)]
    pub frame_size: usize,

    /// Average every N spectra. Without it the reduction adapts to the display.
    #[arg(long)]
    pub reduction_rate: Option<usize>,

    /// Frequency band as name:lower:upper in Hz (repeatable)
    #[arg(long = "band", value_parser = parse_band)]
    pub bands: Vec<FrequencyBand>,

    /// What to draw
    #[arg(long, value_enum, default_value_t = View::Bands)]
    pub view: View,

    /// Redraw interval in milliseconds
    #[arg(long, default_value_t = 20)]
    pub tick_ms: u64,

    /// Release file frames at capture speed instead of as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Config file (defaults to audiolight.toml or ~/.config/audiolight/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn parse_band(s: &str) -> Result<FrequencyBand, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(name), Some(lower), Some(upper)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected name:lower:upper, got {:?}", s));
    };
    if name.is_empty() {
        return Err("band name must not be empty".to_string());
    }
    let lower: f64 = lower
        .trim()
        .parse()
        .map_err(|e| format!("bad lower frequency {:?}: {}", lower, e))?;
    let upper: f64 = upper
        .trim()
        .parse()
        .map_err(|e| format!("bad upper frequency {:?}: {}", upper, e))?;
    Ok(FrequencyBand::new(name, lower, upper))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_band_triplets() {
        assert_eq!(
            parse_band("bass:5:1000").unwrap(),
            FrequencyBand::new("bass", 5.0, 1000.0)
        );
        assert!(parse_band("bass:5").is_err());
        assert!(parse_band(":5:10").is_err());
        assert!(parse_band("mid:low:10").is_err());
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "audiolight",
            "song.wav",
            "--reduction-rate",
            "3",
            "--band",
            "bass:10:100",
            "--band",
            "treble:500:5000",
            "--view",
            "color",
        ]);
        assert_eq!(cli.input, Some(PathBuf::from("song.wav")));
        assert_eq!(cli.reduction_rate, Some(3));
        assert_eq!(cli.bands.len(), 2);
        assert_eq!(cli.view, View::Color);
        assert_eq!(cli.frame_size, 256);
    }
}
