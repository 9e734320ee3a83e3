//! Render-thread synchronization.
//!
//! Producers (graph recalls running on audio-processing threads) hand audio
//! signals to one dedicated render thread that owns the [`Renderer`]. Three
//! independent lock + condvar pairs separate the phases of a handoff:
//!
//! 1. pre-sync: the pending queue and its counters; the render thread waits
//!    here for work,
//! 2. prepare-iteration: the id of the last item made active; mono producers
//!    wait here until their item is picked up,
//! 3. completed-iteration: the done and waiting sets; producers wait here for
//!    their render to finish.
//!
//! When more than one is held they are taken in that order. The renderer and
//! the render buffers have their own locks, always taken after the three.
//!
//! How items are popped and where their samples are staged is decided by a
//! strategy chosen once at construction: mono pops one item at a time through
//! per-channel buffers, stereo pops a whole channel group through interleaved
//! per-scope buffers.

mod mono;
mod stereo;

use crate::buffers::ScopeData;
use crate::error::{RenderError, Result};
use crate::renderer::{RenderStatus, Renderer, StreamFormat};
use cadenza_core::compat::{
    Arc, AtomicU64, AtomicU8, AtomicUsize, Condvar, HashSet, Mutex, Ordering, VecDeque,
};
use cadenza_core::{AtomicDouble, AtomicFlag, AudioSignal, EngineConfig, SoundScope};
use core::ops::{BitOr, BitOrAssign};
use smallvec::SmallVec;
use std::thread;

use mono::MonoSync;
use stereo::StereoSync;

/// Frames handed to the renderer per call.
pub const RENDER_CHUNK: usize = 128;

/// Construction-time engine flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncFlags(u8);

impl SyncFlags {
    /// Group all audio channels of a scope into one interleaved render.
    pub const STEREO: Self = Self(1);
    /// The renderer is an instrument; stereo renders wait for keyed pads.
    pub const INSTRUMENT: Self = Self(1 << 1);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SyncFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SyncFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RenderState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl RenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderState::Starting,
            2 => RenderState::Running,
            3 => RenderState::Stopping,
            _ => RenderState::Stopped,
        }
    }
}

/// One producer request, owned by the queue until the render thread pops it.
pub(crate) struct IterateData {
    pub(crate) id: u64,
    pub(crate) signal: Arc<AudioSignal>,
    pub(crate) pad: usize,
    pub(crate) audio_channel: usize,
    pub(crate) scope: SoundScope,
}

/// Items popped for one render pass.
pub(crate) struct Batch {
    pub(crate) scope: SoundScope,
    pub(crate) items: SmallVec<[IterateData; 8]>,
}

pub(crate) struct PreSync {
    pub(crate) pending: VecDeque<IterateData>,
    active_iterations: usize,
    next_id: u64,
    /// Stereo staging, indexed by scope.
    pub(crate) scopes: Vec<ScopeData>,
    /// Producer read scratch, one buffer of frames.
    pub(crate) scratch: Vec<f32>,
}

impl PreSync {
    pub(crate) fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            active_iterations: 0,
            next_id: 1,
            scopes: Vec::new(),
            scratch: Vec::new(),
        }
    }
}

struct Prepare {
    activated: u64,
}

#[derive(Default)]
struct Completed {
    done: HashSet<u64>,
    waiting: HashSet<u64>,
}

/// Pop-and-render policy of the render loop.
pub(crate) trait SyncStrategy: Send + Sync {
    /// Stage a producer's samples and update the counters. Returns true if the
    /// producer must wait for its item to complete.
    fn stage(&self, pre: &mut PreSync, item: &IterateData) -> Result<bool>;

    /// Producers also wait for their item to become active.
    fn waits_for_activation(&self) -> bool;

    /// Render-thread wait predicate.
    fn ready(&self, pre: &PreSync) -> bool;

    fn pop(&self, pre: &mut PreSync) -> Option<Batch>;

    /// Render a batch and write the output back into its signals. Returns the
    /// number of failed renderer calls.
    fn render(&self, batch: &Batch, renderer: &mut dyn Renderer) -> usize;

    fn resize(&self, pre: &mut PreSync, channels: usize, frames: usize) -> Result<()>;

    fn format(&self, sample_rate: f64, channels: usize, frames: usize) -> StreamFormat;
}

struct Shared {
    strategy: Box<dyn SyncStrategy>,
    renderer: Mutex<Box<dyn Renderer>>,

    sample_rate: AtomicDouble,
    buffer_size: AtomicUsize,
    audio_channels: AtomicUsize,

    running: AtomicFlag,
    state: AtomicU8,

    pre_sync: Mutex<PreSync>,
    pre_sync_cond: Condvar,
    prepare: Mutex<Prepare>,
    prepare_cond: Condvar,
    completed: Mutex<Completed>,
    completed_cond: Condvar,

    render_passes: AtomicU64,
    failed_renders: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: RenderState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn format(&self) -> StreamFormat {
        self.strategy.format(
            self.sample_rate.get(),
            self.audio_channels.load(Ordering::Acquire),
            self.buffer_size.load(Ordering::Acquire),
        )
    }
}

struct Lifecycle {
    refcount: usize,
    thread: Option<thread::JoinHandle<()>>,
}

/// Synchronizes producer threads with one render thread hosting a [`Renderer`].
///
/// `render_thread_iteration` blocks the calling producer until its signal has
/// been rendered (mono), or until the channel group it completes has been
/// rendered (stereo). There is no timeout: a renderer that never returns
/// blocks its producers.
pub struct RenderSync {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    flags: SyncFlags,
}

impl RenderSync {
    pub fn new<R: Renderer + 'static>(
        renderer: R,
        config: &EngineConfig,
        flags: SyncFlags,
    ) -> Result<Self> {
        config.validate()?;

        let strategy: Box<dyn SyncStrategy> = if flags.contains(SyncFlags::STEREO) {
            Box::new(StereoSync::new(
                config.audio_channels,
                config.buffer_size,
                flags.contains(SyncFlags::INSTRUMENT),
            )?)
        } else {
            Box::new(MonoSync::new(config.audio_channels, config.buffer_size)?)
        };

        let mut pre_sync = PreSync::new();
        strategy.resize(&mut pre_sync, config.audio_channels, config.buffer_size)?;

        tracing::debug!(
            stereo = flags.contains(SyncFlags::STEREO),
            instrument = flags.contains(SyncFlags::INSTRUMENT),
            channels = config.audio_channels,
            buffer_size = config.buffer_size,
            "created render sync"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                strategy,
                renderer: Mutex::new(Box::new(renderer) as Box<dyn Renderer>),
                sample_rate: AtomicDouble::new(config.sample_rate),
                buffer_size: AtomicUsize::new(config.buffer_size),
                audio_channels: AtomicUsize::new(config.audio_channels),
                running: AtomicFlag::new(false),
                state: AtomicU8::new(RenderState::Stopped as u8),
                pre_sync: Mutex::new(pre_sync),
                pre_sync_cond: Condvar::new(),
                prepare: Mutex::new(Prepare { activated: 0 }),
                prepare_cond: Condvar::new(),
                completed: Mutex::new(Completed::default()),
                completed_cond: Condvar::new(),
                render_passes: AtomicU64::new(0),
                failed_renders: AtomicU64::new(0),
            }),
            lifecycle: Mutex::new(Lifecycle {
                refcount: 0,
                thread: None,
            }),
            flags,
        })
    }

    pub fn flags(&self) -> SyncFlags {
        self.flags
    }

    pub fn state(&self) -> RenderState {
        RenderState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    /// Start the render thread, or take another reference on a running one.
    pub fn start_render_thread(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.refcount > 0 {
            lifecycle.refcount += 1;
            return Ok(());
        }

        self.shared.set_state(RenderState::Starting);
        {
            let mut renderer = self.shared.renderer.lock();
            renderer.set_format(self.shared.format());
            renderer.start();
        }
        self.shared.running.set(true);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("cadenza-render".to_string())
            .spawn(move || render_loop(&shared));

        match spawned {
            Ok(handle) => {
                lifecycle.thread = Some(handle);
                lifecycle.refcount = 1;
                tracing::debug!("render thread started");
                Ok(())
            }
            Err(err) => {
                self.shared.running.set(false);
                self.shared.renderer.lock().stop();
                self.shared.set_state(RenderState::Stopped);
                Err(RenderError::ThreadSpawn(err))
            }
        }
    }

    /// Drop one reference; the last one stops and joins the render thread.
    pub fn stop_render_thread(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.refcount == 0 {
            return;
        }
        lifecycle.refcount -= 1;
        if lifecycle.refcount > 0 {
            return;
        }

        self.shared.set_state(RenderState::Stopping);
        self.shared.running.set(false);
        {
            let _pre = self.shared.pre_sync.lock();
            self.shared.pre_sync_cond.notify_all();
        }

        if let Some(handle) = lifecycle.thread.take() {
            if handle.join().is_err() {
                tracing::warn!("render thread panicked");
            }
        }
        self.shared.set_state(RenderState::Stopped);
        tracing::debug!("render thread stopped");
    }

    /// Hand `signal` to the render thread and wait for the result.
    ///
    /// The rendered output is written back into `signal`. A failed render
    /// leaves stale data in the signal; it is logged, never returned.
    pub fn render_thread_iteration(
        &self,
        signal: &Arc<AudioSignal>,
        pad: usize,
        audio_channel: usize,
        scope: SoundScope,
    ) -> Result<()> {
        let shared = &*self.shared;
        let channels = shared.audio_channels.load(Ordering::Acquire);
        if audio_channel >= channels {
            return Err(RenderError::ChannelOutOfRange {
                audio_channel,
                channels,
            });
        }

        let (id, wait) = {
            let mut pre = shared.pre_sync.lock();
            let id = pre.next_id;
            pre.next_id += 1;

            let item = IterateData {
                id,
                signal: Arc::clone(signal),
                pad,
                audio_channel,
                scope,
            };
            let wait = shared.strategy.stage(&mut pre, &item)?;
            pre.pending.push_back(item);
            pre.active_iterations += 1;

            if wait {
                shared.completed.lock().waiting.insert(id);
            }
            shared.pre_sync_cond.notify_all();
            (id, wait)
        };

        tracing::trace!(id, pad, audio_channel, %scope, wait, "queued iteration");

        if shared.strategy.waits_for_activation() {
            let mut prepare = shared.prepare.lock();
            while prepare.activated < id {
                shared.prepare_cond.wait(&mut prepare);
            }
        }

        if wait {
            let mut completed = shared.completed.lock();
            while !completed.done.contains(&id) {
                shared.completed_cond.wait(&mut completed);
            }
            // Cleared by the waiter so the next iteration can't be mistaken
            // for this one.
            completed.done.remove(&id);
            completed.waiting.remove(&id);
        }

        Ok(())
    }

    /// Track a key press for instrument renders and forward it to the renderer.
    pub fn key_on(&self, scope: SoundScope, pad: usize) {
        {
            let mut pre = self.shared.pre_sync.lock();
            if let Some(data) = pre.scopes.get_mut(scope.index()) {
                *data.key_on.entry(pad).or_insert(0) += 1;
            }
            self.shared.pre_sync_cond.notify_all();
        }
        self.shared.renderer.lock().note_on(pad);
    }

    pub fn key_off(&self, scope: SoundScope, pad: usize) {
        {
            let mut pre = self.shared.pre_sync.lock();
            if let Some(data) = pre.scopes.get_mut(scope.index()) {
                if let Some(count) = data.key_on.get_mut(&pad) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        data.key_on.remove(&pad);
                    }
                }
            }
            self.shared.pre_sync_cond.notify_all();
        }
        self.shared.renderer.lock().note_off(pad);
    }

    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate.get()
    }

    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size.load(Ordering::Acquire)
    }

    pub fn audio_channels(&self) -> usize {
        self.shared.audio_channels.load(Ordering::Acquire)
    }

    pub fn set_sample_rate(&self, sample_rate: f64) -> Result<()> {
        EngineConfig {
            sample_rate,
            buffer_size: self.buffer_size(),
            audio_channels: self.audio_channels(),
        }
        .validate()?;

        self.shared.sample_rate.set(sample_rate);
        self.shared.renderer.lock().set_format(self.shared.format());
        tracing::debug!(sample_rate, "render sample rate changed");
        Ok(())
    }

    pub fn set_buffer_size(&self, buffer_size: usize) -> Result<()> {
        self.resize(self.audio_channels(), buffer_size)
    }

    pub fn set_audio_channels(&self, audio_channels: usize) -> Result<()> {
        self.resize(audio_channels, self.buffer_size())
    }

    fn resize(&self, channels: usize, frames: usize) -> Result<()> {
        EngineConfig {
            sample_rate: self.sample_rate(),
            buffer_size: frames,
            audio_channels: channels,
        }
        .validate()?;

        {
            let mut pre = self.shared.pre_sync.lock();
            self.shared.strategy.resize(&mut pre, channels, frames)?;
            self.shared.buffer_size.store(frames, Ordering::Release);
            self.shared.audio_channels.store(channels, Ordering::Release);
            self.shared.pre_sync_cond.notify_all();
        }
        self.shared.renderer.lock().set_format(self.shared.format());

        tracing::debug!(channels, frames, "resized render buffers");
        Ok(())
    }

    /// Items queued and not yet picked up by the render thread.
    pub fn pending_len(&self) -> usize {
        self.shared.pre_sync.lock().pending.len()
    }

    pub fn active_iterations(&self) -> usize {
        self.shared.pre_sync.lock().active_iterations
    }

    pub fn render_passes(&self) -> u64 {
        self.shared.render_passes.load(Ordering::Relaxed)
    }

    pub fn failed_renders(&self) -> u64 {
        self.shared.failed_renders.load(Ordering::Relaxed)
    }
}

impl Drop for RenderSync {
    fn drop(&mut self) {
        let refcount = self.lifecycle.lock().refcount;
        if refcount > 0 {
            self.lifecycle.lock().refcount = 1;
            self.stop_render_thread();
        }
    }
}

impl core::fmt::Debug for RenderSync {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderSync")
            .field("flags", &self.flags)
            .field("state", &self.state())
            .field("buffer_size", &self.buffer_size())
            .field("audio_channels", &self.audio_channels())
            .finish()
    }
}

fn render_loop(shared: &Shared) {
    shared.set_state(RenderState::Running);

    loop {
        let batch = {
            let mut pre = shared.pre_sync.lock();
            loop {
                if !shared.running.get() {
                    break None;
                }
                if shared.strategy.ready(&pre) {
                    let batch = shared.strategy.pop(&mut pre);
                    if let Some(batch) = &batch {
                        pre.active_iterations -= batch.items.len();
                    }
                    break Some(batch);
                }
                shared.pre_sync_cond.wait(&mut pre);
            }
        };

        let batch = match batch {
            None => break,
            Some(None) => {
                thread::yield_now();
                continue;
            }
            Some(Some(batch)) => batch,
        };

        {
            let mut prepare = shared.prepare.lock();
            if let Some(last) = batch.items.iter().map(|item| item.id).max() {
                prepare.activated = prepare.activated.max(last);
            }
            shared.prepare_cond.notify_all();
        }

        let failed = {
            let mut renderer = shared.renderer.lock();
            shared.strategy.render(&batch, &mut **renderer)
        };
        shared.render_passes.fetch_add(1, Ordering::Relaxed);
        if failed > 0 {
            shared.failed_renders.fetch_add(failed as u64, Ordering::Relaxed);
        }

        tracing::trace!(scope = %batch.scope, items = batch.items.len(), failed, "rendered batch");
        complete(shared, batch.items.iter().map(|item| item.id));
    }

    teardown(shared);
}

fn complete(shared: &Shared, ids: impl Iterator<Item = u64>) {
    let mut completed = shared.completed.lock();
    for id in ids {
        if completed.waiting.contains(&id) {
            completed.done.insert(id);
        }
    }
    shared.completed_cond.notify_all();
}

/// Release every queued producer with stale output and stop the renderer.
fn teardown(shared: &Shared) {
    let drained: Vec<u64> = {
        let mut pre = shared.pre_sync.lock();
        let drained = pre.pending.drain(..).map(|item| item.id).collect();
        pre.active_iterations = 0;
        for scope in &mut pre.scopes {
            scope.clear();
        }
        drained
    };

    {
        let mut prepare = shared.prepare.lock();
        if let Some(last) = drained.iter().copied().max() {
            prepare.activated = prepare.activated.max(last);
        }
        shared.prepare_cond.notify_all();
    }
    complete(shared, drained.iter().copied());

    shared.renderer.lock().stop();
    shared.set_state(RenderState::Stopped);
    tracing::debug!(drained = drained.len(), "render thread exiting");
}

/// Run the renderer over `frames` frames in chunks of at most [`RENDER_CHUNK`].
///
/// Failed chunks are logged and leave their output region untouched.
pub(crate) fn render_blocks(
    renderer: &mut dyn Renderer,
    input: &[f32],
    output: &mut [f32],
    channels: usize,
    frames: usize,
) -> usize {
    let chunk = RENDER_CHUNK.min(frames).max(1);
    let mut failed = 0;
    let mut offset = 0;

    while offset < frames {
        let count = chunk.min(frames - offset);
        let range = offset * channels..(offset + count) * channels;
        let (Some(src), Some(dst)) = (input.get(range.clone()), output.get_mut(range)) else {
            break;
        };

        let status = renderer.render(src, dst, count);
        if !status.is_success() {
            failed += 1;
            match status {
                RenderStatus::InsufficientInput | RenderStatus::CannotRenderNow => {
                    tracing::warn!(%status, offset, count, "render call failed");
                }
                _ => tracing::warn!(%status, offset, count, "renderer error"),
            }
        }
        offset += count;
    }
    failed
}
