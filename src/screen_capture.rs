// Screen capture via the XDG ScreenCast portal and PipeWire
// Frames arrive on a dedicated PipeWire thread; the newest one is latched
// for the tick loop through a mutex + condvar.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use ashpd::desktop::screencast::{CursorMode, Screencast, SourceType};
use ashpd::desktop::PersistMode;
use tracing::{debug, error, info};

use crate::frame::{copy_rect, CaptureError, PixelBuffer, Rect, ScreenGrabber};

/// Longest wait for the first frame after the portal hands out a stream
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Newest frame written by the PipeWire thread
#[derive(Default)]
struct Latch {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    seq: u64,
    error: Option<String>,
}

/// State shared between the capture thread and the grabber
struct Shared {
    latch: Mutex<Latch>,
    ready: Condvar,
    running: AtomicBool,
}

impl Shared {
    fn fail(&self, msg: String) {
        if let Ok(mut latch) = self.latch.lock() {
            latch.error = Some(msg);
        }
        self.running.store(false, Ordering::SeqCst);
        self.ready.notify_all();
    }
}

/// Screen grabber backed by a PipeWire ScreenCast stream
pub struct PipewireGrabber {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
    frame_wait: Duration,
    seen: u64,
    width: u32,
    height: u32,
    front: Vec<u32>,
}

impl PipewireGrabber {
    /// Ask the portal for a monitor, connect to its PipeWire node and wait
    /// for the first frame. Any failure here is fatal for the producer.
    ///
    /// Later frames are awaited for at most `frame_wait`.
    pub async fn start(fps: u32, frame_wait: Duration) -> Result<Self, CaptureError> {
        let unavailable = |what: &str, e: &dyn std::fmt::Display| {
            CaptureError::Unavailable(format!("{}: {}", what, e))
        };

        // 1. Request screen cast via XDG portal
        let screencast = Screencast::new()
            .await
            .map_err(|e| unavailable("Failed to create screencast portal", &e))?;

        let session = screencast
            .create_session()
            .await
            .map_err(|e| unavailable("Failed to create session", &e))?;

        screencast
            .select_sources(
                &session,
                CursorMode::Hidden,
                SourceType::Monitor.into(),
                false, // single source
                None,  // restore token
                PersistMode::DoNot,
            )
            .await
            .map_err(|e| unavailable("Failed to select sources", &e))?;

        let response = screencast
            .start(&session, None)
            .await
            .map_err(|e| unavailable("Failed to start screencast", &e))?
            .response()
            .map_err(|e| unavailable("Screencast request refused", &e))?;

        let node_id = response
            .streams()
            .first()
            .map(|s| s.pipe_wire_node_id())
            .ok_or_else(|| {
                CaptureError::Unavailable("No streams returned from screencast".to_string())
            })?;
        info!("Got PipeWire node ID: {}", node_id);

        // 2. Receive frames on a blocking thread; pipewire-rs runs its own loop
        let shared = Arc::new(Shared {
            latch: Mutex::new(Latch::default()),
            ready: Condvar::new(),
            running: AtomicBool::new(true),
        });
        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("pipewire-capture".to_string())
            .spawn(move || {
                if let Err(e) = run_pipewire_capture(node_id, &thread_shared, fps) {
                    error!("PipeWire capture error: {}", e);
                    thread_shared.fail(e);
                }
            })
            .map_err(|e| unavailable("Failed to spawn capture thread", &e))?;

        let mut grabber = Self {
            shared,
            thread: Some(thread),
            frame_wait,
            seen: 0,
            width: 0,
            height: 0,
            front: Vec::new(),
        };
        grabber.next_frame()?;
        info!("Capturing {}x{} screen", grabber.width, grabber.height);
        Ok(grabber)
    }
}

impl ScreenGrabber for PipewireGrabber {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<(), CaptureError> {
        let poisoned = || CaptureError::Unavailable("capture state poisoned".to_string());
        let limit = if self.seen == 0 {
            STARTUP_TIMEOUT
        } else {
            self.frame_wait
        };

        let latch = self.shared.latch.lock().map_err(|_| poisoned())?;
        let seen = self.seen;
        let (mut latch, wait) = self
            .shared
            .ready
            .wait_timeout_while(latch, limit, |l| l.seq <= seen && l.error.is_none())
            .map_err(|_| poisoned())?;

        if let Some(msg) = &latch.error {
            return Err(CaptureError::Unavailable(msg.clone()));
        }
        if wait.timed_out() {
            if self.seen == 0 {
                return Err(CaptureError::Timeout(limit.as_millis() as u64));
            }
            // Compositors only send damaged frames; a static screen keeps
            // the latched one
            return Ok(());
        }

        std::mem::swap(&mut self.front, &mut latch.pixels);
        self.width = latch.width;
        self.height = latch.height;
        self.seen = latch.seq;
        Ok(())
    }

    fn copy_region(&self, rect: Rect, dest: &mut PixelBuffer) -> Result<(), CaptureError> {
        copy_rect(&self.front, self.width, self.height, rect, dest)
    }
}

impl Drop for PipewireGrabber {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("PipeWire capture stopped");
    }
}

/// Copy a BGRx/BGRA frame into `latch`. Read as little-endian `u32`, BGRx
/// bytes are already `0xAARRGGBB`.
fn latch_frame(latch: &mut Latch, data: &[u8], width: u32, height: u32, stride: usize) {
    if width == 0 || height == 0 {
        return;
    }
    let row_bytes = width as usize * 4;
    let stride = stride.max(row_bytes);
    if data.len() < stride * (height as usize - 1) + row_bytes {
        return;
    }

    latch.pixels.clear();
    latch.pixels.reserve(width as usize * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        latch.pixels.extend(
            row[..row_bytes]
                .chunks_exact(4)
                .map(|px| u32::from_le_bytes([px[0], px[1], px[2], px[3]])),
        );
    }
    latch.width = width;
    latch.height = height;
    latch.seq += 1;
}

/// Run PipeWire capture loop (blocking)
fn run_pipewire_capture(node_id: u32, shared: &Arc<Shared>, fps: u32) -> Result<(), String> {
    use pipewire as pw;
    use pipewire::context::Context;
    use pipewire::main_loop::MainLoop;
    use pipewire::spa::utils::Direction;
    use pipewire::stream::{Stream, StreamFlags};
    use std::cell::Cell;
    use std::rc::Rc;

    pipewire::init();

    let main_loop =
        MainLoop::new(None).map_err(|e| format!("Failed to create main loop: {:?}", e))?;
    let context =
        Context::new(&main_loop).map_err(|e| format!("Failed to create context: {:?}", e))?;
    let core = context
        .connect(None)
        .map_err(|e| format!("Failed to connect to PipeWire: {:?}", e))?;

    let props = pipewire::properties::properties! {
        *pipewire::keys::MEDIA_TYPE => "Video",
        *pipewire::keys::MEDIA_CATEGORY => "Capture",
        *pipewire::keys::MEDIA_ROLE => "Screen",
    };

    let stream = Stream::new(&core, "ambilight-capture", props)
        .map_err(|e| format!("Failed to create stream: {:?}", e))?;

    // Negotiated video size
    let size: Rc<Cell<(u32, u32)>> = Rc::new(Cell::new((0, 0)));
    let size_param = Rc::clone(&size);
    let frame_shared = Arc::clone(shared);

    let _listener = stream
        .add_local_listener_with_user_data(())
        .param_changed(move |_, _, id, pod| {
            use pipewire::spa::param::ParamType;
            if id != ParamType::Format.as_raw() {
                return;
            }
            if let Some((w, h)) = pod.and_then(parse_video_format_size) {
                debug!("PipeWire format: {}x{}", w, h);
                size_param.set((w, h));
            }
        })
        .process(move |stream, _| {
            let Some(mut buffer) = stream.dequeue_buffer() else {
                return;
            };
            let (width, height) = size.get();
            if width == 0 || height == 0 {
                return;
            }
            let datas = buffer.datas_mut();
            if datas.is_empty() {
                return;
            }
            let stride = datas[0].chunk().stride().max(0) as usize;
            if let Some(data) = datas[0].data() {
                if let Ok(mut latch) = frame_shared.latch.lock() {
                    latch_frame(&mut latch, data, width, height, stride);
                }
                frame_shared.ready.notify_all();
            }
        })
        .register()
        .map_err(|e| format!("Failed to register listener: {:?}", e))?;

    // Only byte orders that read as 0xAARRGGBB
    let mut params_buffer = vec![0u8; 1024];
    let obj = pw::spa::pod::object!(
        pw::spa::utils::SpaTypes::ObjectParamFormat,
        pw::spa::param::ParamType::EnumFormat,
        pw::spa::pod::property!(
            pw::spa::param::format::FormatProperties::MediaType,
            Id,
            pw::spa::param::format::MediaType::Video
        ),
        pw::spa::pod::property!(
            pw::spa::param::format::FormatProperties::MediaSubtype,
            Id,
            pw::spa::param::format::MediaSubtype::Raw
        ),
        pw::spa::pod::property!(
            pw::spa::param::format::FormatProperties::VideoFormat,
            Choice,
            Enum,
            Id,
            pw::spa::param::video::VideoFormat::BGRx,
            pw::spa::param::video::VideoFormat::BGRx,
            pw::spa::param::video::VideoFormat::BGRA
        ),
        pw::spa::pod::property!(
            pw::spa::param::format::FormatProperties::VideoSize,
            Choice,
            Range,
            Rectangle,
            pw::spa::utils::Rectangle {
                width: 1920,
                height: 1080
            },
            pw::spa::utils::Rectangle {
                width: 1,
                height: 1
            },
            pw::spa::utils::Rectangle {
                width: 8192,
                height: 8192
            }
        ),
        pw::spa::pod::property!(
            pw::spa::param::format::FormatProperties::VideoFramerate,
            Choice,
            Range,
            Fraction,
            pw::spa::utils::Fraction { num: fps, denom: 1 },
            pw::spa::utils::Fraction { num: 0, denom: 1 },
            pw::spa::utils::Fraction { num: 60, denom: 1 }
        )
    );

    let pod = pw::spa::pod::serialize::PodSerializer::serialize(
        std::io::Cursor::new(&mut params_buffer),
        &pw::spa::pod::Value::Object(obj),
    )
    .map_err(|e| format!("Failed to serialize params: {:?}", e))?
    .0
    .into_inner();

    let pod = pw::spa::pod::Pod::from_bytes(&pod).ok_or("Failed to create pod from bytes")?;

    stream
        .connect(
            Direction::Input,
            Some(node_id),
            StreamFlags::AUTOCONNECT | StreamFlags::MAP_BUFFERS,
            &mut [pod],
        )
        .map_err(|e| format!("Failed to connect stream: {:?}", e))?;

    let loop_ = main_loop.loop_();
    while shared.running.load(Ordering::SeqCst) {
        // Drives the stream callbacks
        let n_events = loop_.iterate(Duration::from_millis(50));
        if n_events < 0 {
            return Err(format!("PipeWire iterate() returned error: {}", n_events));
        }
    }
    Ok(())
}

/// Parse video size from SPA format pod
fn parse_video_format_size(pod: &pipewire::spa::pod::Pod) -> Option<(u32, u32)> {
    use pipewire::spa::param::video::VideoInfoRaw;

    let mut info = VideoInfoRaw::new();
    if info.parse(pod).is_ok() {
        let size = info.size();
        if size.width > 0 && size.height > 0 {
            return Some((size.width, size.height));
        }
    }
    None
}
