//! Print the published LED ring as hex triples, one line per edge

use std::sync::atomic::Ordering;
use std::time::Duration;

use ambilight::config::AmbilightConfig;
use ambilight::perimeter::format_ring;
use ambilight_shm::SharedChannel;

use super::{open_channel, setup_interrupt_handler, CommandResult};
use crate::cli::ChannelArgs;

pub async fn run(
    mut config: AmbilightConfig,
    args: &ChannelArgs,
    watch: Option<u64>,
) -> CommandResult {
    let channel = open_channel(&mut config, args)?;

    let result = match watch {
        None => print_ring(&channel, &config),
        Some(ms) => {
            let running = setup_interrupt_handler()?;
            let mut interval = tokio::time::interval(Duration::from_millis(ms.max(1)));
            let mut result = Ok(());
            while running.load(Ordering::SeqCst) {
                interval.tick().await;
                result = print_ring(&channel, &config);
                if result.is_err() {
                    break;
                }
            }
            result
        }
    };

    channel.close()?;
    result
}

fn print_ring(channel: &SharedChannel, config: &AmbilightConfig) -> CommandResult {
    let leds = channel.read_leds()?;
    if channel.layout().has_intensity() {
        println!("intensity {}", channel.read_intensity()?);
    }
    print!("{}", format_ring(config.led_layout(), config.ordering, &leds));
    println!();
    Ok(())
}
