//! Producer configuration
//!
//! Stored as TOML at `~/.config/ambilight/config.toml`. Every field has a
//! serde default so a partial file (or none at all) works; command line
//! flags override what the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ambilight_shm::{ChannelSpec, Rgb, DEFAULT_SEM_NAME, DEFAULT_SHM_NAME};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::color::parse_hex_rgb;
use crate::error::ConfigError;
use crate::perimeter::{LedLayout, RingOrdering};
use crate::pipeline::PipelineOptions;

/// Which frame source variant to sample from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// Copy the whole screen every tick
    #[default]
    Full,
    /// Copy only the border strips the LEDs sample
    Edge,
}

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// XDG ScreenCast portal + PipeWire
    #[default]
    Pipewire,
    /// Solid color or image file
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbilightConfig {
    /// LEDs on each horizontal edge
    #[serde(default = "default_leds_x")]
    pub leds_x: usize,
    /// LEDs on each vertical edge
    #[serde(default = "default_leds_y")]
    pub leds_y: usize,
    /// Tick period
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    #[serde(default = "default_true")]
    pub smoothing: bool,
    /// Smoothing time constant in seconds
    #[serde(default = "default_decay_secs")]
    pub decay_secs: f32,
    #[serde(default)]
    pub ordering: RingOrdering,
    /// Quantized channels below this are published as 0
    #[serde(default)]
    pub noise_floor: u8,
    #[serde(default)]
    pub capture: CaptureMode,
    #[serde(default)]
    pub source: SourceKind,
    /// Synthetic scene color, `RRGGBB`
    #[serde(default = "default_synthetic_color")]
    pub synthetic_color: String,
    /// Synthetic scene image; overrides `synthetic_color`
    #[serde(default)]
    pub synthetic_image: Option<PathBuf>,
    #[serde(default = "default_synthetic_size")]
    pub synthetic_size: [u32; 2],
    #[serde(default = "default_shm_name")]
    pub shm_name: String,
    #[serde(default = "default_sem_name")]
    pub sem_name: String,
    /// Append the u16 intensity scalar after the LED triples
    #[serde(default = "default_true")]
    pub intensity_field: bool,
    /// Longest a publish waits for the channel lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Frame rate requested from PipeWire
    #[serde(default = "default_capture_fps")]
    pub capture_fps: u32,
}

fn default_leds_x() -> usize {
    32
}

fn default_leds_y() -> usize {
    20
}

fn default_period_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

fn default_decay_secs() -> f32 {
    0.05
}

fn default_synthetic_color() -> String {
    "ff0000".to_string()
}

fn default_synthetic_size() -> [u32; 2] {
    [64, 40]
}

fn default_shm_name() -> String {
    DEFAULT_SHM_NAME.to_string()
}

fn default_sem_name() -> String {
    DEFAULT_SEM_NAME.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    20
}

fn default_capture_fps() -> u32 {
    20
}

impl Default for AmbilightConfig {
    fn default() -> Self {
        Self {
            leds_x: default_leds_x(),
            leds_y: default_leds_y(),
            period_ms: default_period_ms(),
            smoothing: true,
            decay_secs: default_decay_secs(),
            ordering: RingOrdering::default(),
            noise_floor: 0,
            capture: CaptureMode::default(),
            source: SourceKind::default(),
            synthetic_color: default_synthetic_color(),
            synthetic_image: None,
            synthetic_size: default_synthetic_size(),
            shm_name: default_shm_name(),
            sem_name: default_sem_name(),
            intensity_field: true,
            lock_timeout_ms: default_lock_timeout_ms(),
            capture_fps: default_capture_fps(),
        }
    }
}

impl AmbilightConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ambilight")
            .join("config.toml")
    }

    /// Load config from a file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.leds_x == 0 || self.leds_y == 0 {
            return invalid(format!(
                "LED counts must be non-zero (leds_x = {}, leds_y = {})",
                self.leds_x, self.leds_y
            ));
        }
        if self.period_ms == 0 {
            return invalid("period_ms must be non-zero".to_string());
        }
        if self.smoothing && !(self.decay_secs.is_finite() && self.decay_secs > 0.0) {
            return invalid(format!(
                "decay_secs must be a positive number, got {}",
                self.decay_secs
            ));
        }
        if self.capture_fps == 0 {
            return invalid("capture_fps must be non-zero".to_string());
        }
        if self.synthetic_image.is_none() && parse_hex_rgb(&self.synthetic_color).is_none() {
            return invalid(format!(
                "synthetic_color {:?} is not RRGGBB hex",
                self.synthetic_color
            ));
        }
        Ok(())
    }

    pub fn led_layout(&self) -> LedLayout {
        LedLayout::new(self.leds_x, self.leds_y)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn synthetic_rgb(&self) -> Rgb {
        parse_hex_rgb(&self.synthetic_color).unwrap_or(Rgb::BLACK)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            decay_secs: self.smoothing.then_some(self.decay_secs),
            noise_floor: self.noise_floor,
        }
    }

    pub fn channel_spec(&self) -> ChannelSpec {
        let lock_timeout = match self.lock_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        ChannelSpec::new(self.led_layout().ring_len())
            .with_names(&self.shm_name, &self.sem_name)
            .with_intensity(self.intensity_field)
            .with_lock_timeout(lock_timeout)
    }
}
