//! Engine integration tests
//!
//! Source registration, recompilation on invalidation, configuration changes
//! reaching the render engine, and a graph routed through a renderer.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use cadenza::core::compat::Arc;
use cadenza::prelude::*;
use cadenza::{RenderState, SyncFlags};

#[test]
fn test_engine_config_from_builder() {
    let engine = test_engine();
    let config = engine.config();
    assert_eq!(config.sample_rate, TEST_SAMPLE_RATE);
    assert_eq!(config.buffer_size, TEST_BUFFER_SIZE);
    assert_eq!(config.audio_channels, 1);
    assert_eq!(engine.staging_program().len(), 3);
}

/// Every stage reaches every node of every source, stage-major per dispatcher.
#[test]
fn test_tick_runs_registered_sources() {
    let engine = test_engine();
    let audios = chain(3);
    let log = play_log();
    for audio in &audios {
        RecordingRecall::attach_to(audio, &log);
    }

    let source = DispatchSource::Audio(Arc::clone(&audios[2]));
    arm(&source, SoundScope::Playback);
    engine.add_source(source, SoundScope::Playback);
    engine.tick();

    let played = log.lock().clone();
    let names: Vec<&str> = played.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        ["panel", "mixer-1", "generator"].repeat(3),
        "aggregates play once per stage, in tree order"
    );
    let stages: Vec<StageFlags> = played.iter().map(|(_, stage)| *stage).collect();
    assert!(stages[..3].iter().all(|s| *s == StageFlags::RUN_PRE));
    assert!(stages[3..6].iter().all(|s| *s == StageFlags::RUN_INTER));
    assert!(stages[6..].iter().all(|s| *s == StageFlags::RUN_POST));
}

/// A node linked in after a tick is picked up once the engine is invalidated.
#[test]
fn test_invalidate_picks_up_graph_edits() {
    let engine = test_engine();
    let audios = chain(2);
    let source = DispatchSource::Audio(Arc::clone(&audios[1]));
    arm(&source, SoundScope::Playback);
    let dispatcher = engine.add_source(source.clone(), SoundScope::Playback);

    engine.tick();
    let before = dispatcher.tree_list().len();

    // Splice a mixer between the generator and the panel, then re-arm.
    let mixer = Audio::builder("late-mixer").build();
    unlink_channel(&audios[0].output()[0]);
    link_channels(&audios[0].output()[0], &mixer.input()[0]).unwrap();
    link_channels(&mixer.output()[0], &audios[1].input()[0]).unwrap();
    disarm(&source, SoundScope::Playback);
    arm(&source, SoundScope::Playback);

    engine.tick();
    assert_eq!(dispatcher.tree_list().len(), before);

    engine.invalidate();
    engine.tick();
    assert_eq!(dispatcher.tree_list().len(), before + 3);
    assert!(dispatcher
        .tree_list()
        .iter()
        .any(|e| e.tree_element().id() == mixer.id()));
}

#[test]
fn test_remove_source_stops_dispatch() {
    let engine = test_engine();
    let audios = chain(2);
    let log = play_log();
    RecordingRecall::attach_to(&audios[1], &log);

    let source = DispatchSource::Audio(Arc::clone(&audios[1]));
    arm(&source, SoundScope::Playback);
    engine.add_source(source.clone(), SoundScope::Playback);
    engine.tick();
    let played = log.lock().len();
    assert!(played > 0);

    assert!(engine.remove_source(&source, SoundScope::Playback).is_some());
    engine.tick();
    assert_eq!(log.lock().len(), played);
    assert_eq!(engine.source_count(), 0);
}

#[test]
fn test_set_config_reaches_render_sync() {
    let engine = test_engine();
    let (renderer, events) = GainRenderer::new(1.0);
    let sync = engine.render_sync(renderer, SyncFlags::STEREO).unwrap();
    assert_eq!(sync.audio_channels(), 1);

    let config = EngineConfig {
        sample_rate: 96000.0,
        buffer_size: 256,
        audio_channels: 2,
    };
    engine.set_config(config).unwrap();
    assert_eq!(engine.config(), config);
    assert_eq!(sync.sample_rate(), 96000.0);
    assert_eq!(sync.buffer_size(), 256);
    assert_eq!(sync.audio_channels(), 2);

    let last = *events.lock().formats.last().unwrap();
    assert_eq!(last.channels, 2);
    assert_eq!(last.frames, 256);

    let invalid = EngineConfig {
        audio_channels: 0,
        ..config
    };
    assert!(engine.set_config(invalid).is_err());
    assert_eq!(sync.audio_channels(), 2);
}

/// generator -> effect, where the effect renders its inputs externally.
#[test]
fn test_render_recall_through_engine() {
    let engine = CadenzaEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .buffer_size(TEST_BUFFER_SIZE)
        .audio_channels(1)
        .staging_program(&[StageFlags::RUN_INTER])
        .build()
        .unwrap();

    let generator = Audio::builder("generator").input_has_recycling().build();
    let effect = Audio::builder("effect")
        .is_async()
        .output_has_recycling()
        .build();
    link_channels(&generator.output()[0], &effect.input()[0]).unwrap();

    let signal = AudioSignal::from_samples(&generate_dc(0.25, TEST_BUFFER_SIZE));
    generator.input()[0]
        .recycling()
        .unwrap()
        .add_audio_signal(Arc::clone(&signal));

    let (renderer, events) = GainRenderer::new(4.0);
    let sync = engine.render_sync(renderer, SyncFlags::empty()).unwrap();
    sync.start_render_thread().unwrap();
    let recall = RenderRecall::new(Arc::clone(&sync));
    assert_eq!(recall.stage(), StageFlags::RUN_INTER);
    effect.input()[0].add_recall(Arc::new(recall));

    let source = DispatchSource::Audio(Arc::clone(&effect));
    arm(&source, SoundScope::Playback);
    engine.add_source(source, SoundScope::Playback);

    engine.tick();
    assert_eq!(sync.render_passes(), 1);
    assert!(signals_approx_equal(
        &read_signal(&signal),
        &generate_dc(1.0, TEST_BUFFER_SIZE),
        FLOAT_EPSILON
    ));

    engine.tick();
    assert_eq!(sync.render_passes(), 2);
    assert!(signals_approx_equal(
        &read_signal(&signal),
        &generate_dc(4.0, TEST_BUFFER_SIZE),
        FLOAT_EPSILON
    ));

    sync.stop_render_thread();
    assert_eq!(sync.state(), RenderState::Stopped);
    assert_eq!(events.lock().stopped, 1);
}

/// A recall staged for another step never reaches the renderer.
#[test]
fn test_render_recall_ignores_other_stages() {
    let engine = test_engine();
    let generator = Audio::builder("generator").input_has_recycling().build();
    let effect = Audio::builder("effect").output_has_recycling().build();
    link_channels(&generator.output()[0], &effect.input()[0]).unwrap();
    generator.input()[0]
        .recycling()
        .unwrap()
        .add_audio_signal(AudioSignal::from_samples(&generate_dc(1.0, TEST_BUFFER_SIZE)));

    let (renderer, _) = GainRenderer::new(1.0);
    let sync = engine.render_sync(renderer, SyncFlags::empty()).unwrap();
    sync.start_render_thread().unwrap();
    effect.input()[0].add_recall(Arc::new(
        RenderRecall::new(Arc::clone(&sync)).with_stage(StageFlags::DO_FEEDBACK),
    ));
    // Attached to an output: never rendered.
    effect.output()[0].add_recall(Arc::new(RenderRecall::new(Arc::clone(&sync))));

    let source = DispatchSource::Audio(Arc::clone(&effect));
    arm(&source, SoundScope::Playback);
    engine.add_source(source, SoundScope::Playback);
    engine.tick();

    assert_eq!(sync.render_passes(), 0);
    assert_eq!(sync.pending_len(), 0);
}
