//! Test helpers and fixtures for cadenza integration tests
//!
//! - graph fixtures: linear chains from a generator to a recycling panel
//! - [`RecordingRecall`]: logs every (node, stage) it is played for
//! - mock renderers: gain, fixed status
//!
//! Use the appropriate tolerance from [`tolerances`] when comparing samples.

#![allow(dead_code)]

pub mod tolerances;

use cadenza::core::compat::{Arc, Mutex};
use cadenza::prelude::*;
use cadenza::{StreamFormat, SyncFlags};
use std::time::{Duration, Instant};

/// Default test sample rate
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 512;

/// Create a test engine with a single-stage playback program.
pub fn test_engine() -> CadenzaEngine {
    CadenzaEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .buffer_size(TEST_BUFFER_SIZE)
        .audio_channels(1)
        .staging_program(&[StageFlags::RUN_PRE, StageFlags::RUN_INTER, StageFlags::RUN_POST])
        .build()
        .expect("Failed to create test engine")
}

pub fn test_config(audio_channels: usize) -> EngineConfig {
    EngineConfig {
        sample_rate: TEST_SAMPLE_RATE,
        buffer_size: TEST_BUFFER_SIZE,
        audio_channels,
    }
}

// =============================================================================
// Graph fixtures
// =============================================================================

/// `len` aggregates linked output 0 -> input 0, upstream first.
///
/// The first owns its input recyclings (a generator), the last owns its output
/// recyclings (a panel); the ones between are plain mixers.
pub fn chain(len: usize) -> Vec<Arc<Audio>> {
    assert!(len >= 2, "a chain needs a generator and a panel");
    let mut audios = Vec::with_capacity(len);
    audios.push(Audio::builder("generator").input_has_recycling().build());
    for i in 1..len - 1 {
        audios.push(Audio::builder(format!("mixer-{i}")).build());
    }
    audios.push(Audio::builder("panel").output_has_recycling().build());

    for pair in audios.windows(2) {
        link_channels(&pair[0].output()[0], &pair[1].input()[0]).expect("link chain");
    }
    audios
}

// =============================================================================
// Recording recall
// =============================================================================

pub type PlayLog = Arc<Mutex<Vec<(String, StageFlags)>>>;

pub fn play_log() -> PlayLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Logs `(name, stage)` for every play.
pub struct RecordingRecall {
    name: String,
    log: PlayLog,
}

impl RecordingRecall {
    pub fn attach_to(audio: &Audio, log: &PlayLog) {
        audio.add_recall(Arc::new(Self {
            name: audio.name().to_string(),
            log: Arc::clone(log),
        }));
    }
}

impl Recall for RecordingRecall {
    fn play(&self, _target: RecallTarget<'_>, _recall_id: &RecallId, stage: StageFlags) {
        self.log.lock().push((self.name.clone(), stage));
    }
}

// =============================================================================
// Mock renderers
// =============================================================================

#[derive(Debug, Default)]
pub struct RendererEvents {
    pub formats: Vec<StreamFormat>,
    pub started: usize,
    pub stopped: usize,
    pub renders: usize,
    pub notes_on: Vec<usize>,
    pub notes_off: Vec<usize>,
}

pub type SharedEvents = Arc<Mutex<RendererEvents>>;

/// Multiplies the input by a constant gain.
pub struct GainRenderer {
    gain: f32,
    events: SharedEvents,
}

impl GainRenderer {
    pub fn new(gain: f32) -> (Self, SharedEvents) {
        let events = SharedEvents::default();
        (
            Self {
                gain,
                events: Arc::clone(&events),
            },
            events,
        )
    }
}

impl Renderer for GainRenderer {
    fn set_format(&mut self, format: StreamFormat) {
        self.events.lock().formats.push(format);
    }

    fn start(&mut self) {
        self.events.lock().started += 1;
    }

    fn stop(&mut self) {
        self.events.lock().stopped += 1;
    }

    fn render(&mut self, input: &[f32], output: &mut [f32], _frames: usize) -> RenderStatus {
        for (o, i) in output.iter_mut().zip(input) {
            *o = i * self.gain;
        }
        self.events.lock().renders += 1;
        RenderStatus::Success
    }

    fn note_on(&mut self, pad: usize) {
        self.events.lock().notes_on.push(pad);
    }

    fn note_off(&mut self, pad: usize) {
        self.events.lock().notes_off.push(pad);
    }
}

/// Returns the same status from every render call.
pub struct StatusRenderer(pub RenderStatus);

impl Renderer for StatusRenderer {
    fn set_format(&mut self, _format: StreamFormat) {}

    fn render(&mut self, _input: &[f32], _output: &mut [f32], _frames: usize) -> RenderStatus {
        self.0
    }
}

pub fn gain_sync(gain: f32, audio_channels: usize, flags: SyncFlags) -> (Arc<RenderSync>, SharedEvents) {
    let (renderer, events) = GainRenderer::new(gain);
    let sync = RenderSync::new(renderer, &test_config(audio_channels), flags)
        .expect("Failed to create render sync");
    (Arc::new(sync), events)
}

// =============================================================================
// Signals and waiting
// =============================================================================

/// Generate an integer staircase signal [0, 1, 2, ..., n-1] as f32.
pub fn generate_integer_staircase(num_samples: usize) -> Vec<f32> {
    (0..num_samples).map(|i| i as f32).collect()
}

/// Generate a DC offset signal (constant value).
pub fn generate_dc(value: f32, num_samples: usize) -> Vec<f32> {
    vec![value; num_samples]
}

pub fn read_signal(signal: &AudioSignal) -> Vec<f32> {
    let mut out = vec![0.0; signal.buffer_size()];
    signal.read_f32(&mut out);
    out
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Poll `predicate` until it holds or `max_wait_ms` elapses.
pub fn wait_until(max_wait_ms: u64, mut predicate: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    let timeout = Duration::from_millis(max_wait_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    predicate()
}
