//! Command handlers for the CLI application.
//!
//! - `run`: the producer (capture → publish loop)
//! - `intensity`: interactive / one-shot intensity control
//! - `dump`: print the published ring
//! - `config`: show or write the effective configuration

pub mod config;
pub mod dump;
pub mod intensity;
pub mod run;

use ambilight::config::AmbilightConfig;
use ambilight_shm::SharedChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::ChannelArgs;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Set up Ctrl-C handler and return the running flag
pub fn setup_interrupt_handler() -> anyhow::Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Attach to the producer's channel as a reader
pub fn open_channel(
    config: &mut AmbilightConfig,
    args: &ChannelArgs,
) -> anyhow::Result<SharedChannel> {
    args.apply(config);
    config.validate()?;
    let spec = config.channel_spec();
    SharedChannel::open(&spec).map_err(|e| {
        anyhow::anyhow!(
            "{e} (is the producer running with {} LEDs?)",
            spec.layout.led_count()
        )
    })
}
