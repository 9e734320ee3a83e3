//! One channel group per render pass, through interleaved per-scope buffers.
//!
//! A scope is ready once every audio channel has a queued item. In instrument
//! mode it is ready once every keyed pad has an item on every audio channel,
//! and the pass takes every item queued for the scope, since the instrument
//! renders all of its voices at once.

use super::{render_blocks, Batch, IterateData, PreSync, SyncStrategy};
use crate::buffers::{InterleavedBuffers, ScopeData};
use crate::error::{zeroed, Result};
use crate::renderer::{Renderer, StreamFormat};
use cadenza_core::compat::Mutex;
use cadenza_core::SoundScope;
use smallvec::SmallVec;

pub(crate) struct StereoSync {
    instrument: bool,
    buffers: Mutex<InterleavedBuffers>,
}

impl StereoSync {
    pub(crate) fn new(channels: usize, frames: usize, instrument: bool) -> Result<Self> {
        Ok(Self {
            instrument,
            buffers: Mutex::new(InterleavedBuffers::new(channels, frames)?),
        })
    }

    fn scope_ready(&self, data: &ScopeData) -> bool {
        if self.instrument {
            let channels = data.num_channels();
            !data.key_on.is_empty()
                && data.key_on.keys().all(|pad| {
                    (0..channels).all(|ac| data.pad_queued.get(&(*pad, ac)).is_some_and(|n| *n > 0))
                })
        } else {
            !data.queued.is_empty() && data.queued.iter().all(|n| *n > 0)
        }
    }
}

fn count_queued(data: &mut ScopeData, item: &IterateData) {
    if let Some(queued) = data.queued.get_mut(item.audio_channel) {
        *queued += 1;
        *data.pad_queued.entry((item.pad, item.audio_channel)).or_insert(0) += 1;
    }
}

fn uncount_queued(data: &mut ScopeData, item: &IterateData) {
    if let Some(queued) = data.queued.get_mut(item.audio_channel) {
        *queued = queued.saturating_sub(1);
    }
    let key = (item.pad, item.audio_channel);
    if let Some(count) = data.pad_queued.get_mut(&key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            data.pad_queued.remove(&key);
        }
    }
}

impl SyncStrategy for StereoSync {
    fn stage(&self, pre: &mut PreSync, item: &IterateData) -> Result<bool> {
        let PreSync {
            scopes, scratch, ..
        } = pre;
        let Some(data) = scopes.get_mut(item.scope.index()) else {
            return Ok(false);
        };

        let read = item.signal.read_f32(scratch);
        data.stage(item.id, &scratch[..read])?;

        let was_ready = self.scope_ready(data);
        count_queued(data, item);

        // Only the producer completing the group waits for it.
        Ok(!was_ready && self.scope_ready(data))
    }

    fn waits_for_activation(&self) -> bool {
        false
    }

    fn ready(&self, pre: &PreSync) -> bool {
        pre.scopes.iter().any(|data| self.scope_ready(data))
    }

    fn pop(&self, pre: &mut PreSync) -> Option<Batch> {
        let index = pre.scopes.iter().position(|data| self.scope_ready(data))?;
        let scope = SoundScope::ALL[index];
        let channels = pre.scopes[index].num_channels();

        let mut taken: SmallVec<[bool; 8]> = SmallVec::new();
        let mut channel_taken: SmallVec<[bool; 8]> = SmallVec::from_elem(false, channels);
        for item in &pre.pending {
            let take = if item.scope != scope {
                false
            } else if self.instrument {
                true
            } else {
                match channel_taken.get_mut(item.audio_channel) {
                    Some(seen) if !*seen => {
                        *seen = true;
                        true
                    }
                    _ => false,
                }
            };
            taken.push(take);
        }

        let mut items = SmallVec::new();
        let pending = std::mem::take(&mut pre.pending);
        for (item, take) in pending.into_iter().zip(taken) {
            if take {
                items.push(item);
            } else {
                pre.pending.push_back(item);
            }
        }

        let data = &mut pre.scopes[index];
        let mut buffers = self.buffers.lock();
        buffers.input.fill(0.0);
        for item in &items {
            uncount_queued(data, item);
            data.take_into(item.id, item.audio_channel, &mut buffers.input);
        }

        Some(Batch { scope, items })
    }

    fn render(&self, batch: &Batch, renderer: &mut dyn Renderer) -> usize {
        let mut guard = self.buffers.lock();
        let buffers = &mut *guard;
        let channels = buffers.channels();
        let frames = buffers.frames();

        buffers.output.fill(0.0);
        let failed = render_blocks(renderer, &buffers.input, &mut buffers.output, channels, frames);

        let mut delivered: SmallVec<[bool; 8]> = SmallVec::from_elem(false, channels);
        for item in &batch.items {
            match delivered.get_mut(item.audio_channel) {
                Some(seen) if !*seen => {
                    *seen = true;
                    item.signal.write_f32(buffers.deinterleave(item.audio_channel));
                }
                // Later voices of the same channel were rendered into the
                // first one.
                _ => item.signal.clear(),
            }
        }
        failed
    }

    fn resize(&self, pre: &mut PreSync, channels: usize, frames: usize) -> Result<()> {
        let mut scopes = Vec::with_capacity(SoundScope::ALL.len());
        for scope in SoundScope::ALL {
            let mut data = ScopeData::new(channels, frames)?;
            if let Some(old) = pre.scopes.get_mut(scope.index()) {
                data.key_on = std::mem::take(&mut old.key_on);
            }
            scopes.push(data);
        }

        // Staged samples of queued items are dropped; the counters follow the
        // queue.
        for item in &pre.pending {
            if let Some(data) = scopes.get_mut(item.scope.index()) {
                count_queued(data, item);
            }
        }

        let buffers = InterleavedBuffers::new(channels, frames)?;
        pre.scratch = zeroed(frames, "producer scratch")?;
        pre.scopes = scopes;
        *self.buffers.lock() = buffers;
        Ok(())
    }

    fn format(&self, sample_rate: f64, channels: usize, frames: usize) -> StreamFormat {
        StreamFormat {
            sample_rate,
            channels,
            frames,
        }
    }
}
