use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dsp::FrequencyBand;
use crate::render::View;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub bands: Vec<FrequencyBand>,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct PipelineSection {
    /// Fixed averaging ratio; absent selects the adaptive downsampler.
    #[serde(default)]
    pub reduction_rate: Option<usize>,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_view")]
    pub view: View,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_size: default_frame_size(),
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            reduction_rate: None,
            tick_ms: default_tick_ms(),
            view: default_view(),
        }
    }
}

pub fn default_sample_rate() -> f64 { 44100.0 }
pub fn default_frame_size() -> usize { 256 }
pub fn default_tick_ms() -> u64 { 20 }
pub fn default_view() -> View { View::Bands }

pub fn default_bands() -> Vec<FrequencyBand> {
    vec![
        FrequencyBand::new("bass", 5.0, 1000.0),
        FrequencyBand::new("middle", 1000.0, 10000.0),
        FrequencyBand::new("treble", 10000.0, 20000.0),
    ]
}

/// `--config`, then `audiolight.toml`, then the user config directories.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("audiolight.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("audiolight").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("audiolight").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config: {}", err);
            None
        }
    }
}
