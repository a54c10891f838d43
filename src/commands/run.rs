//! The producer: capture the screen and publish the LED ring every tick

use ambilight::config::{AmbilightConfig, CaptureMode, SourceKind};
use ambilight::frame::{EdgeFrame, FrameSource, FullFrame, ScreenGrabber, SyntheticGrabber};
use ambilight::perimeter::PerimeterMapper;
use ambilight::pipeline::Pipeline;
use ambilight::scheduler::Scheduler;
use ambilight_shm::SharedChannel;
use tracing::{error, info};

use super::{setup_interrupt_handler, CommandResult};
use crate::cli::RunArgs;

pub async fn run(mut config: AmbilightConfig, args: &RunArgs) -> CommandResult {
    args.apply(&mut config);
    config.validate()?;

    let running = setup_interrupt_handler()?;

    let grabber = open_grabber(&config).await?;
    let (width, height) = grabber.size();
    let mapper = PerimeterMapper::new(config.led_layout(), config.ordering, width, height)?;
    let (fx, fy) = mapper.footprint();
    info!(
        "Screen {}x{}, {} LEDs ({}x{}), footprint {}x{}, ordering {}",
        width,
        height,
        mapper.ring_len(),
        config.leds_x,
        config.leds_y,
        fx,
        fy,
        config.ordering
    );

    let frame: Box<dyn FrameSource> = match config.capture {
        CaptureMode::Full => Box::new(FullFrame::new(grabber)),
        CaptureMode::Edge => Box::new(EdgeFrame::new(grabber, fx, fy)?),
    };

    let channel = SharedChannel::create(&config.channel_spec())?;
    let mut pipeline = Pipeline::new(frame, mapper, config.pipeline_options(), channel);

    let mut scheduler = Scheduler::new(config.period(), running).with_max_ticks(args.ticks);
    scheduler.run(&mut pipeline).await;

    info!("Releasing shared channel...");
    let result = pipeline.into_publisher().teardown();
    scheduler.finish();
    match result {
        Ok(()) => {
            info!("Done.");
            Ok(())
        }
        Err(e) => {
            error!("Teardown failed: {}", e);
            Err(e.into())
        }
    }
}

async fn open_grabber(config: &AmbilightConfig) -> anyhow::Result<Box<dyn ScreenGrabber>> {
    match config.source {
        SourceKind::Synthetic => {
            let grabber = match &config.synthetic_image {
                Some(path) => SyntheticGrabber::from_image(path)?,
                None => {
                    let [w, h] = config.synthetic_size;
                    SyntheticGrabber::solid(w, h, config.synthetic_rgb())
                }
            };
            Ok(Box::new(grabber))
        }
        SourceKind::Pipewire => open_pipewire(config).await,
    }
}

#[cfg(feature = "screen-capture")]
async fn open_pipewire(config: &AmbilightConfig) -> anyhow::Result<Box<dyn ScreenGrabber>> {
    use ambilight::screen_capture::PipewireGrabber;

    info!("Requesting screen capture permission...");
    let grabber = PipewireGrabber::start(config.capture_fps, config.period()).await?;
    Ok(Box::new(grabber))
}

#[cfg(not(feature = "screen-capture"))]
async fn open_pipewire(_config: &AmbilightConfig) -> anyhow::Result<Box<dyn ScreenGrabber>> {
    anyhow::bail!(
        "built without the screen-capture feature; rebuild with --features screen-capture \
         or use --source synthetic"
    )
}
