// CLI definitions using clap

use ambilight::config::{AmbilightConfig, CaptureMode, SourceKind};
use ambilight::perimeter::RingOrdering;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ambilight")]
#[command(author, version, about = "Screen-perimeter ambient light producer")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/ambilight/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture the screen and publish the LED ring (default)
    #[command(visible_aliases = ["r"])]
    Run(RunArgs),

    /// Adjust the shared intensity (arrow keys, or --delta / --set)
    #[command(visible_aliases = ["brightness", "i"])]
    Intensity {
        #[command(flatten)]
        channel: ChannelArgs,

        /// Change intensity by this amount and exit
        #[arg(long, allow_hyphen_values = true, conflicts_with = "set")]
        delta: Option<i32>,

        /// Set intensity (0-100) and exit
        #[arg(long)]
        set: Option<u16>,
    },

    /// Print the published LED ring, one line per edge
    #[command(visible_aliases = ["d"])]
    Dump {
        #[command(flatten)]
        channel: ChannelArgs,

        /// Keep printing every MS milliseconds until Ctrl+C
        #[arg(long, value_name = "MS")]
        watch: Option<u64>,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        write: bool,
    },
}

/// Channel geometry and names, shared by every subcommand that opens it
#[derive(Args, Default)]
pub struct ChannelArgs {
    /// LEDs on each horizontal edge
    #[arg(long)]
    pub leds_x: Option<usize>,

    /// LEDs on each vertical edge
    #[arg(long)]
    pub leds_y: Option<usize>,

    /// Ring ordering (index 0 position and walk direction)
    #[arg(long, value_enum)]
    pub ordering: Option<RingOrdering>,

    /// Shared memory object name
    #[arg(long, value_name = "NAME")]
    pub shm_name: Option<String>,

    /// Semaphore name
    #[arg(long, value_name = "NAME")]
    pub sem_name: Option<String>,

    /// Payload carries no intensity field
    #[arg(long)]
    pub no_intensity: bool,
}

impl ChannelArgs {
    pub fn apply(&self, config: &mut AmbilightConfig) {
        if let Some(n) = self.leds_x {
            config.leds_x = n;
        }
        if let Some(n) = self.leds_y {
            config.leds_y = n;
        }
        if let Some(ordering) = self.ordering {
            config.ordering = ordering;
        }
        if let Some(name) = &self.shm_name {
            config.shm_name = name.clone();
        }
        if let Some(name) = &self.sem_name {
            config.sem_name = name.clone();
        }
        if self.no_intensity {
            config.intensity_field = false;
        }
    }
}

#[derive(Args, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub channel: ChannelArgs,

    /// Tick period in milliseconds
    #[arg(long, value_name = "MS")]
    pub period_ms: Option<u64>,

    /// Publish raw samples without temporal smoothing
    #[arg(long)]
    pub no_smoothing: bool,

    /// Smoothing time constant in seconds
    #[arg(long, value_name = "SECS")]
    pub decay: Option<f32>,

    /// Zero any channel below this value
    #[arg(long)]
    pub noise_floor: Option<u8>,

    /// Copy the whole screen or only the edge strips
    #[arg(long, value_enum)]
    pub capture: Option<CaptureMode>,

    /// Frame source
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Synthetic scene color (RRGGBB)
    #[arg(long, value_name = "HEX")]
    pub color: Option<String>,

    /// Synthetic scene image (PNG/JPEG)
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,

    /// Frame rate requested from PipeWire
    #[arg(long)]
    pub fps: Option<u32>,

    /// Publish lock wait in milliseconds (0 waits forever)
    #[arg(long, value_name = "MS")]
    pub lock_timeout_ms: Option<u64>,

    /// Stop after this many ticks
    #[arg(long)]
    pub ticks: Option<u64>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut AmbilightConfig) {
        self.channel.apply(config);
        if let Some(ms) = self.period_ms {
            config.period_ms = ms;
        }
        if self.no_smoothing {
            config.smoothing = false;
        }
        if let Some(tau) = self.decay {
            config.decay_secs = tau;
        }
        if let Some(floor) = self.noise_floor {
            config.noise_floor = floor;
        }
        if let Some(capture) = self.capture {
            config.capture = capture;
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(color) = &self.color {
            config.synthetic_color = color.clone();
        }
        if let Some(image) = &self.image {
            config.synthetic_image = Some(image.clone());
        }
        if let Some(fps) = self.fps {
            config.capture_fps = fps;
        }
        if let Some(ms) = self.lock_timeout_ms {
            config.lock_timeout_ms = ms;
        }
    }
}
