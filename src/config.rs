use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use wavestrip::controller::ControlTuning;
use wavestrip::mapping::MappingStyle;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub audio: AudioConfig,
    pub visualizer: VisualizerConfig,
    pub control: ControlConfig,
    pub discovery: DiscoveryConfig,
    pub ipc: IpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Strip width in terminal columns
    pub strip_width: u16,
    pub fps: u32,
    /// Keep the strip on screen while nothing is playing
    pub always_show: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            strip_width: 24,
            fps: 60,
            always_show: false,
        }
    }
}

impl DisplayConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.clamp(1, 240) as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Sink to monitor (None = default sink)
    pub device: Option<String>,
    pub sample_rate: u32,
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 44100,
            fft_size: 256,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisualizerConfig {
    pub peak_decay: f32,
    pub margin: f32,
    pub bar_spacing: f32,
    pub glow_threshold: f32,
    pub glow_blur: f32,
    pub peak_threshold: f32,
    pub peak_marker_width: f32,
    pub background_opacity: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        let style = MappingStyle::default();
        Self {
            peak_decay: style.peak_decay,
            margin: style.margin,
            bar_spacing: style.bar_spacing,
            glow_threshold: style.glow_threshold,
            glow_blur: style.glow_blur,
            peak_threshold: style.peak_threshold,
            peak_marker_width: style.peak_marker_width,
            background_opacity: style.background_opacity,
        }
    }
}

impl VisualizerConfig {
    pub fn style(&self) -> MappingStyle {
        MappingStyle {
            peak_decay: self.peak_decay.clamp(0.0, 1.0),
            margin: self.margin.max(0.0),
            bar_spacing: self.bar_spacing.max(0.0),
            glow_threshold: self.glow_threshold,
            glow_blur: self.glow_blur.max(0.0),
            peak_threshold: self.peak_threshold,
            peak_marker_width: self.peak_marker_width.max(0.0),
            background_opacity: self.background_opacity.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    pub hue_sensitivity: f32,
    pub bar_step_threshold: f32,
    pub double_click_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        let tuning = ControlTuning::default();
        Self {
            hue_sensitivity: tuning.hue_sensitivity,
            bar_step_threshold: tuning.bar_step_threshold,
            double_click_ms: 400,
        }
    }
}

impl ControlConfig {
    pub fn tuning(&self) -> ControlTuning {
        ControlTuning {
            hue_sensitivity: self.hue_sensitivity,
            bar_step_threshold: self.bar_step_threshold.max(0.0),
        }
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub poll_interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
        }
    }
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpcConfig {
    pub enabled: bool,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Get the default XDG config path (~/.config/wavestrip/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wavestrip").join("config.toml"))
    }

    /// Load config from the default XDG path if it exists.
    /// Returns None if the file doesn't exist, warns on parse errors.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return None;
        }
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: {:#}\nUsing defaults.", e);
                None
            }
        }
    }

    /// Initialize default config file at XDG path, returns the path
    pub fn init_default_config() -> Result<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Self::generate_config_template())?;

        Ok(path)
    }

    /// Generate a commented TOML config template
    pub fn generate_config_template() -> String {
        r#"# wavestrip configuration
# This file is auto-generated. Edit as needed.
# Hue rotation and bar count are not set here: drag inside the strip to
# change them, they are saved to settings.toml next to this file.

[display]
# Strip width in terminal columns
strip_width = 24
# Frames per second
fps = 60
# Keep the strip visible while nothing is playing
always_show = false

[audio]
# Sink to monitor (default sink when omitted)
# device = "alsa_output.pci-0000_00_1f.3.analog-stereo"
# Sample rate in Hz
sample_rate = 44100
# FFT size; the strip receives fft_size / 2 magnitudes
fft_size = 256
# Temporal smoothing (0.0-1.0, higher = smoother)
smoothing = 0.8
# Decibel range mapped onto 0-255
min_decibels = -100.0
max_decibels = -30.0

[visualizer]
# Peak hold decay per frame
peak_decay = 0.97
# Horizontal margin around the bars (logical units, strip is ~120 wide)
margin = 10.0
# Gap between bars
bar_spacing = 2.0
# Bars wider than this get a glow
glow_threshold = 20.0
glow_blur = 10.0
# Peaks below this fraction draw no marker
peak_threshold = 0.1
peak_marker_width = 2.0
# Opacity of the black backdrop
background_opacity = 0.7

[control]
# Degrees of hue per unit of vertical drag
hue_sensitivity = 0.5
# Horizontal drag needed to add or remove one bar
bar_step_threshold = 2.0
# Two presses within this window reset hue and bar count
double_click_ms = 400

[discovery]
# How often media players are polled
poll_interval_ms = 250

[ipc]
# Listen for commands on $XDG_RUNTIME_DIR/wavestrip.sock
enabled = true
"#
        .to_string()
    }

    /// Merge CLI arguments into config (CLI takes priority)
    pub fn merge_args(&mut self, args: &crate::Args) {
        if let Some(fps) = args.fps {
            self.display.fps = fps;
        }
        if let Some(width) = args.strip_width {
            self.display.strip_width = width;
        }
        if args.always_show {
            self.display.always_show = true;
        }
        if let Some(ref device) = args.device {
            self.audio.device = Some(device.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::generate_config_template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed: Config = toml::from_str("[display]\nfps = 30\n[audio]\nsmoothing = 0.5\n").unwrap();
        assert_eq!(parsed.display.fps, 30);
        assert_eq!(parsed.display.strip_width, 24);
        assert!((parsed.audio.smoothing - 0.5).abs() < f32::EPSILON);
        assert_eq!(parsed.audio.fft_size, 256);
        assert!(parsed.ipc.enabled);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[display\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut config = Config::default();
        let args = crate::Args::parse_from([
            "wavestrip",
            "--fps",
            "30",
            "--strip-width",
            "40",
            "--always-show",
            "--device",
            "speakers",
        ]);
        config.merge_args(&args);
        assert_eq!(config.display.fps, 30);
        assert_eq!(config.display.strip_width, 40);
        assert!(config.display.always_show);
        assert_eq!(config.audio.device.as_deref(), Some("speakers"));
    }

    #[test]
    fn absent_cli_flags_leave_config_alone() {
        let mut config: Config = toml::from_str("[display]\nalways_show = true\n").unwrap();
        config.merge_args(&crate::Args::parse_from(["wavestrip"]));
        assert!(config.display.always_show);
        assert_eq!(config.display.fps, 60);
    }

    #[test]
    fn style_and_tuning_are_clamped() {
        let mut config = Config::default();
        config.visualizer.background_opacity = 3.0;
        config.visualizer.peak_decay = -1.0;
        config.control.bar_step_threshold = -5.0;
        let style = config.visualizer.style();
        assert_eq!(style.background_opacity, 1.0);
        assert_eq!(style.peak_decay, 0.0);
        assert_eq!(config.control.tuning().bar_step_threshold, 0.0);
        assert_eq!(config.control.double_click_window(), Duration::from_millis(400));
    }

    #[test]
    fn frame_interval_follows_fps() {
        let mut display = DisplayConfig::default();
        assert_eq!(display.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));
        display.fps = 0;
        assert_eq!(display.frame_interval(), Duration::from_secs(1));
    }
}
