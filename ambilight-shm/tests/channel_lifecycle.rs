//! Integration tests for the shared channel against real POSIX objects.
//!
//! Each test uses its own object names (tagged with the pid) so tests can
//! run in parallel and alongside a live producer.

use std::time::Duration;

use ambilight_shm::{ChannelError, ChannelSpec, Rgb, SharedChannel, DEFAULT_INTENSITY};

fn spec(tag: &str, leds: usize) -> ChannelSpec {
    let pid = std::process::id();
    ChannelSpec::new(leds).with_names(
        format!("/ambilight_test_{tag}_{pid}_shm"),
        format!("/ambilight_test_{tag}_{pid}_sem"),
    )
}

fn ring(n: usize) -> Vec<Rgb> {
    (0..n)
        .map(|i| Rgb::new(i as u8, (i * 2) as u8, 255 - i as u8))
        .collect()
}

// ── Create / open / publish ─────────────────────────────────────────────────

#[test]
fn test_publish_is_visible_to_reader() {
    let spec = spec("roundtrip", 8);
    let mut producer = SharedChannel::create(&spec).unwrap();
    let reader = SharedChannel::open(&spec).unwrap();

    let leds = ring(8);
    producer.publish(&leds).unwrap();
    assert_eq!(reader.read_leds().unwrap(), leds);

    reader.close().unwrap();
    producer.teardown().unwrap();
}

#[test]
fn test_create_writes_default_intensity() {
    let spec = spec("default_intensity", 4);
    let producer = SharedChannel::create(&spec).unwrap();
    assert_eq!(producer.read_intensity().unwrap(), DEFAULT_INTENSITY);
    producer.teardown().unwrap();
}

#[test]
fn test_publish_leaves_intensity_alone() {
    let spec = spec("publish_intensity", 4);
    let mut producer = SharedChannel::create(&spec).unwrap();
    let mut control = SharedChannel::open(&spec).unwrap();

    control.set_intensity(37).unwrap();
    producer.publish(&ring(4)).unwrap();
    assert_eq!(producer.read_intensity().unwrap(), 37);

    control.close().unwrap();
    producer.teardown().unwrap();
}

#[test]
fn test_publish_rejects_wrong_length() {
    let spec = spec("wrong_len", 4);
    let mut producer = SharedChannel::create(&spec).unwrap();
    let err = producer.publish(&ring(3)).unwrap_err();
    assert!(matches!(
        err,
        ChannelError::LengthMismatch {
            expected: 4,
            actual: 3
        }
    ));
    producer.teardown().unwrap();
}

// ── Intensity control ───────────────────────────────────────────────────────

#[test]
fn test_intensity_adjust_clamps() {
    let spec = spec("clamp", 2);
    let producer = SharedChannel::create(&spec).unwrap();
    let mut control = SharedChannel::open(&spec).unwrap();

    assert_eq!(control.adjust_intensity(1).unwrap(), 100);
    assert_eq!(control.adjust_intensity(-1).unwrap(), 99);
    assert_eq!(control.set_intensity(0).unwrap(), 0);
    assert_eq!(control.adjust_intensity(-1).unwrap(), 0);
    assert_eq!(control.set_intensity(500).unwrap(), 100);
    assert_eq!(producer.read_intensity().unwrap(), 100);

    control.close().unwrap();
    producer.teardown().unwrap();
}

#[test]
fn test_no_intensity_field() {
    let spec = spec("no_intensity", 2).with_intensity(false);
    let mut producer = SharedChannel::create(&spec).unwrap();
    assert_eq!(producer.layout().size(), 6);
    assert!(matches!(
        producer.adjust_intensity(1),
        Err(ChannelError::NoIntensityField)
    ));
    producer.teardown().unwrap();
}

// ── Attach failures ─────────────────────────────────────────────────────────

#[test]
fn test_open_missing_channel_fails() {
    let spec = spec("missing", 4);
    assert!(matches!(
        SharedChannel::open(&spec),
        Err(ChannelError::Open { .. })
    ));
}

#[test]
fn test_open_with_wrong_size_fails() {
    let spec = spec("size_mismatch", 4);
    let producer = SharedChannel::create(&spec).unwrap();

    let mut other = spec.clone();
    other.layout = ambilight_shm::PayloadLayout::new(5, true);
    let err = SharedChannel::open(&other).err().unwrap();
    assert!(matches!(
        err,
        ChannelError::SizeMismatch {
            expected: 17,
            actual: 14
        }
    ));

    producer.teardown().unwrap();
}

#[test]
fn test_invalid_name_rejected() {
    let spec = ChannelSpec::new(4).with_names("no_slash", "/sem");
    assert!(matches!(
        SharedChannel::create(&spec),
        Err(ChannelError::InvalidName(_))
    ));
}

// ── Lifetime ────────────────────────────────────────────────────────────────

#[test]
fn test_teardown_unlinks_both_objects() {
    let spec = spec("teardown", 4);
    let producer = SharedChannel::create(&spec).unwrap();
    producer.teardown().unwrap();
    assert!(SharedChannel::open(&spec).is_err());
}

#[test]
fn test_reader_close_does_not_unlink() {
    let spec = spec("reader_close", 4);
    let producer = SharedChannel::create(&spec).unwrap();

    SharedChannel::open(&spec).unwrap().close().unwrap();
    let again = SharedChannel::open(&spec).unwrap();
    again.close().unwrap();

    producer.teardown().unwrap();
}

#[test]
fn test_create_replaces_stale_objects() {
    let spec = spec("stale", 4);
    let mut first = SharedChannel::create(&spec).unwrap();
    first.publish(&vec![Rgb::new(9, 9, 9); 4]).unwrap();
    // Simulate a crash: the objects stay behind
    std::mem::forget(first);

    let second = SharedChannel::create(&spec).unwrap();
    assert_eq!(second.read_leds().unwrap(), vec![Rgb::BLACK; 4]);
    assert_eq!(second.read_intensity().unwrap(), DEFAULT_INTENSITY);
    second.teardown().unwrap();
}

#[test]
fn test_drop_without_teardown_releases_objects() {
    let spec = spec("drop", 4);
    drop(SharedChannel::create(&spec).unwrap());
    assert!(SharedChannel::open(&spec).is_err());
}

#[test]
fn test_lock_timeout_while_held() {
    let spec = spec("timeout", 4).with_lock_timeout(Some(Duration::from_millis(10)));
    let mut producer = SharedChannel::create(&spec).unwrap();
    let reader = SharedChannel::open(&spec).unwrap();

    // A reader that never releases: read through a thread that holds the lock
    std::thread::scope(|s| {
        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        s.spawn(move || {
            reader
                .with_lock(|_| {
                    held_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .unwrap();
            reader.close().unwrap();
        });
        held_rx.recv().unwrap();
        assert!(matches!(
            producer.publish(&ring(4)),
            Err(ChannelError::LockTimeout(10))
        ));
        release_tx.send(()).unwrap();
    });

    producer.publish(&ring(4)).unwrap();
    producer.teardown().unwrap();
}
