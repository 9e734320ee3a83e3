//! Render engine integration tests
//!
//! Producers run on their own threads against a real render thread hosting a
//! mock renderer.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use approx::assert_relative_eq;
use cadenza::core::compat::Arc;
use cadenza::prelude::*;
use cadenza::render::RENDER_CHUNK;
use cadenza::{RenderState, SyncFlags};
use std::thread;

/// N producers queue while the render thread is not running; starting it
/// drains all of them.
#[test]
fn test_mono_handoff_count() {
    const N: usize = 4;
    let (sync, _) = gain_sync(2.0, 1, SyncFlags::empty());

    let signals: Vec<_> = (0..N)
        .map(|i| AudioSignal::from_samples(&generate_dc(i as f32, TEST_BUFFER_SIZE)))
        .collect();
    let producers: Vec<_> = signals
        .iter()
        .map(|signal| {
            let sync = Arc::clone(&sync);
            let signal = Arc::clone(signal);
            thread::spawn(move || sync.render_thread_iteration(&signal, 0, 0, SoundScope::Playback))
        })
        .collect();

    assert!(wait_until(2000, || sync.pending_len() == N));
    assert_eq!(sync.active_iterations(), N);
    assert_eq!(sync.render_passes(), 0);

    sync.start_render_thread().unwrap();
    for producer in producers {
        producer.join().unwrap().unwrap();
    }

    assert_eq!(sync.pending_len(), 0);
    assert_eq!(sync.active_iterations(), 0);
    assert_eq!(sync.render_passes(), N as u64);
    for (i, signal) in signals.iter().enumerate() {
        let expected = generate_dc(i as f32 * 2.0, TEST_BUFFER_SIZE);
        assert!(signals_approx_equal(&read_signal(signal), &expected, FLOAT_EPSILON));
    }

    sync.stop_render_thread();
}

#[test]
fn test_mono_renders_in_chunks() {
    let (sync, events) = gain_sync(0.5, 2, SyncFlags::empty());
    sync.start_render_thread().unwrap();

    let signal = AudioSignal::from_samples(&generate_integer_staircase(TEST_BUFFER_SIZE));
    sync.render_thread_iteration(&signal, 0, 1, SoundScope::Playback)
        .unwrap();

    let out = read_signal(&signal);
    assert_relative_eq!(out[0], 0.0);
    assert_relative_eq!(out[300], 150.0);
    assert_relative_eq!(out[TEST_BUFFER_SIZE - 1], 255.5);
    assert_eq!(events.lock().renders, TEST_BUFFER_SIZE.div_ceil(RENDER_CHUNK));

    sync.stop_render_thread();
    let events = events.lock();
    assert_eq!(events.started, 1);
    assert_eq!(events.stopped, 1);
    assert_eq!(events.formats[0].channels, 1);
}

/// Fewer than C channels never render; the Cth renders the whole group once.
#[test]
fn test_stereo_grouping_barrier() {
    let (sync, _) = gain_sync(2.0, 2, SyncFlags::STEREO);
    sync.start_render_thread().unwrap();

    let left = AudioSignal::from_samples(&generate_dc(0.25, TEST_BUFFER_SIZE));
    let right = AudioSignal::from_samples(&generate_dc(-0.5, TEST_BUFFER_SIZE));

    // returns without waiting
    sync.render_thread_iteration(&left, 0, 0, SoundScope::Playback)
        .unwrap();
    thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(sync.render_passes(), 0);
    assert_eq!(sync.pending_len(), 1);

    sync.render_thread_iteration(&right, 0, 1, SoundScope::Playback)
        .unwrap();
    assert_eq!(sync.render_passes(), 1);
    assert_eq!(sync.pending_len(), 0);

    assert!(signals_approx_equal(
        &read_signal(&left),
        &generate_dc(0.5, TEST_BUFFER_SIZE),
        FLOAT_EPSILON
    ));
    assert!(signals_approx_equal(
        &read_signal(&right),
        &generate_dc(-1.0, TEST_BUFFER_SIZE),
        FLOAT_EPSILON
    ));

    sync.stop_render_thread();
}

/// A second item on a channel waits for the next group and renders its own
/// samples there.
#[test]
fn test_stereo_second_item_keeps_its_input() {
    let (sync, _) = gain_sync(1.0, 2, SyncFlags::STEREO);
    sync.start_render_thread().unwrap();

    let a = AudioSignal::from_samples(&generate_dc(0.1, TEST_BUFFER_SIZE));
    let b = AudioSignal::from_samples(&generate_dc(0.2, TEST_BUFFER_SIZE));
    let c = AudioSignal::from_samples(&generate_dc(0.3, TEST_BUFFER_SIZE));
    let d = AudioSignal::from_samples(&generate_dc(0.4, TEST_BUFFER_SIZE));

    sync.render_thread_iteration(&a, 0, 0, SoundScope::Playback)
        .unwrap();
    sync.render_thread_iteration(&b, 0, 0, SoundScope::Playback)
        .unwrap();
    sync.render_thread_iteration(&c, 0, 1, SoundScope::Playback)
        .unwrap();

    assert_eq!(sync.render_passes(), 1);
    assert_eq!(sync.pending_len(), 1);
    assert_relative_eq!(read_signal(&a)[0], 0.1);
    assert_relative_eq!(read_signal(&c)[0], 0.3);

    sync.render_thread_iteration(&d, 0, 1, SoundScope::Playback)
        .unwrap();
    assert_eq!(sync.render_passes(), 2);
    assert_eq!(sync.pending_len(), 0);
    assert!(signals_approx_equal(
        &read_signal(&b),
        &generate_dc(0.2, TEST_BUFFER_SIZE),
        FLOAT_EPSILON
    ));
    assert_relative_eq!(read_signal(&d)[0], 0.4);

    sync.stop_render_thread();
}

#[test]
fn test_stereo_groups_per_scope() {
    let (sync, _) = gain_sync(1.0, 2, SyncFlags::STEREO);
    sync.start_render_thread().unwrap();

    let signal = || AudioSignal::from_samples(&generate_dc(1.0, TEST_BUFFER_SIZE));
    sync.render_thread_iteration(&signal(), 0, 0, SoundScope::Playback)
        .unwrap();
    sync.render_thread_iteration(&signal(), 0, 1, SoundScope::Sequencer)
        .unwrap();
    thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(sync.render_passes(), 0);

    sync.render_thread_iteration(&signal(), 0, 1, SoundScope::Playback)
        .unwrap();
    assert_eq!(sync.render_passes(), 1);
    assert_eq!(sync.pending_len(), 1);

    sync.stop_render_thread();
    assert_eq!(sync.pending_len(), 0);
}

/// Instrument renders wait for every keyed pad.
#[test]
fn test_instrument_waits_for_keyed_pads() {
    let (sync, events) = gain_sync(1.0, 1, SyncFlags::STEREO | SyncFlags::INSTRUMENT);
    sync.start_render_thread().unwrap();
    sync.key_on(SoundScope::Playback, 0);
    sync.key_on(SoundScope::Playback, 2);

    let low = AudioSignal::from_samples(&generate_dc(0.25, TEST_BUFFER_SIZE));
    let high = AudioSignal::from_samples(&generate_dc(0.5, TEST_BUFFER_SIZE));

    sync.render_thread_iteration(&low, 0, 0, SoundScope::Playback)
        .unwrap();
    thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(sync.render_passes(), 0);

    sync.render_thread_iteration(&high, 2, 0, SoundScope::Playback)
        .unwrap();
    assert_eq!(sync.render_passes(), 1);

    // both voices rendered into the first signal
    assert!(signals_approx_equal(
        &read_signal(&low),
        &generate_dc(0.75, TEST_BUFFER_SIZE),
        FLOAT_EPSILON
    ));
    assert!(read_signal(&high).iter().all(|s| s.abs() < SILENCE_THRESHOLD));

    sync.key_off(SoundScope::Playback, 0);
    sync.key_off(SoundScope::Playback, 2);
    sync.stop_render_thread();

    let events = events.lock();
    assert_eq!(events.notes_on, vec![0, 2]);
    assert_eq!(events.notes_off, vec![0, 2]);
}

/// Failed renders are counted and never stall the producer.
#[test]
fn test_failed_renders_do_not_stall() {
    for status in [
        RenderStatus::InsufficientInput,
        RenderStatus::CannotRenderNow,
        RenderStatus::Error(-50),
    ] {
        let sync = RenderSync::new(StatusRenderer(status), &test_config(1), SyncFlags::empty())
            .unwrap();
        sync.start_render_thread().unwrap();

        let signal = AudioSignal::from_samples(&generate_dc(1.0, TEST_BUFFER_SIZE));
        sync.render_thread_iteration(&signal, 0, 0, SoundScope::Playback)
            .unwrap();
        sync.render_thread_iteration(&signal, 0, 0, SoundScope::Playback)
            .unwrap();

        let chunks = TEST_BUFFER_SIZE.div_ceil(RENDER_CHUNK) as u64;
        assert_eq!(sync.render_passes(), 2);
        assert_eq!(sync.failed_renders(), 2 * chunks);
        // the output buffer was never written: silence comes back
        assert!(read_signal(&signal).iter().all(|s| s.abs() < SILENCE_THRESHOLD));

        sync.stop_render_thread();
    }
}

#[test]
fn test_resize_reformats_renderer() {
    let (sync, events) = gain_sync(1.0, 2, SyncFlags::STEREO);
    sync.start_render_thread().unwrap();

    sync.set_buffer_size(256).unwrap();
    sync.set_audio_channels(4).unwrap();
    sync.set_sample_rate(96000.0).unwrap();
    assert!(sync.set_buffer_size(0).is_err());
    assert!(sync.set_audio_channels(0).is_err());

    let last = *events.lock().formats.last().unwrap();
    assert_eq!(last.frames, 256);
    assert_eq!(last.channels, 4);
    assert_relative_eq!(last.sample_rate, 96000.0);
    assert_eq!(sync.buffer_size(), 256);
    assert_eq!(sync.audio_channels(), 4);

    // renders at the new size
    let signals: Vec<_> = (0..4)
        .map(|_| AudioSignal::from_samples(&generate_dc(1.0, 256)))
        .collect();
    for (ac, signal) in signals.iter().enumerate() {
        sync.render_thread_iteration(signal, 0, ac, SoundScope::Playback)
            .unwrap();
    }
    assert_eq!(sync.render_passes(), 1);

    let err = sync
        .render_thread_iteration(&signals[0], 0, 4, SoundScope::Playback)
        .unwrap_err();
    assert!(err.to_string().contains("out of range"));

    sync.stop_render_thread();
}

/// Stopping releases queued producers and stops the renderer once.
#[test]
fn test_stop_drains_queue() {
    let (sync, events) = gain_sync(1.0, 2, SyncFlags::STEREO);
    sync.start_render_thread().unwrap();
    sync.start_render_thread().unwrap();
    assert_eq!(sync.state(), RenderState::Running);

    let signal = AudioSignal::from_samples(&generate_dc(1.0, TEST_BUFFER_SIZE));
    sync.render_thread_iteration(&signal, 0, 0, SoundScope::Playback)
        .unwrap();
    assert_eq!(sync.pending_len(), 1);

    sync.stop_render_thread();
    assert!(sync.is_running());
    assert_eq!(sync.pending_len(), 1);

    sync.stop_render_thread();
    assert!(!sync.is_running());
    assert_eq!(sync.state(), RenderState::Stopped);
    assert_eq!(sync.pending_len(), 0);
    assert_eq!(sync.active_iterations(), 0);
    assert_eq!(events.lock().stopped, 1);

    // restartable
    sync.start_render_thread().unwrap();
    sync.render_thread_iteration(&signal, 0, 0, SoundScope::Playback)
        .unwrap();
    sync.render_thread_iteration(&signal, 0, 1, SoundScope::Playback)
        .unwrap();
    assert_eq!(sync.render_passes(), 1);
}

#[test]
fn test_concurrent_mono_producers() {
    let (sync, _) = gain_sync(3.0, 2, SyncFlags::empty());
    sync.start_render_thread().unwrap();

    let producers: Vec<_> = (0..8)
        .map(|i| {
            let sync = Arc::clone(&sync);
            thread::spawn(move || {
                let signal = AudioSignal::from_samples(&generate_dc(i as f32, TEST_BUFFER_SIZE));
                for _ in 0..10 {
                    sync.render_thread_iteration(&signal, 0, i % 2, SoundScope::Playback)
                        .unwrap();
                }
                read_signal(&signal)[0]
            })
        })
        .collect();

    for (i, producer) in producers.into_iter().enumerate() {
        let first = producer.join().unwrap();
        assert_relative_eq!(first, i as f32 * 3f32.powi(10), max_relative = 1e-5);
    }
    assert_eq!(sync.render_passes(), 80);
    assert_eq!(sync.active_iterations(), 0);
}
