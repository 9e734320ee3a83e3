//! Render buffers.
//!
//! Mono engines keep one input/output pair per audio channel. Stereo engines
//! stage producer input per queued item and sound scope, and render every
//! scope through one shared pair of interleaved buffers.

use crate::error::{zeroed, RenderError, Result};
use cadenza_core::compat::HashMap;
use smallvec::SmallVec;

pub(crate) struct ChannelData {
    pub(crate) input: Vec<f32>,
    pub(crate) output: Vec<f32>,
}

/// Per-audio-channel buffers of a mono engine.
pub(crate) struct ChannelBuffers {
    channels: Vec<ChannelData>,
    frames: usize,
}

impl ChannelBuffers {
    pub(crate) fn new(num_channels: usize, frames: usize) -> Result<Self> {
        let mut channels = Vec::new();
        channels
            .try_reserve_exact(num_channels)
            .map_err(|_| RenderError::Allocation {
                what: "channel data",
                requested: num_channels,
            })?;
        for _ in 0..num_channels {
            channels.push(ChannelData {
                input: zeroed(frames, "channel input")?,
                output: zeroed(frames, "channel output")?,
            });
        }
        Ok(Self { channels, frames })
    }

    pub(crate) fn frames(&self) -> usize {
        self.frames
    }

    pub(crate) fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub(crate) fn channel_mut(&mut self, audio_channel: usize) -> Result<&mut ChannelData> {
        let channels = self.channels.len();
        self.channels
            .get_mut(audio_channel)
            .ok_or(RenderError::ChannelOutOfRange {
                audio_channel,
                channels,
            })
    }
}

/// Producer-side staging for one sound scope of a stereo engine.
///
/// Each queued item keeps its own copy of the samples until the render thread
/// takes it, so items left in the queue by a pass keep their input.
pub(crate) struct ScopeData {
    /// Staged samples by iteration id.
    pub(crate) staged: HashMap<u64, Vec<f32>>,
    /// Spent staging buffers, reused by later items.
    pool: Vec<Vec<f32>>,
    frames: usize,
    /// Items queued per audio channel.
    pub(crate) queued: SmallVec<[usize; 8]>,
    /// Items queued per (pad, audio channel), instrument mode.
    pub(crate) pad_queued: HashMap<(usize, usize), usize>,
    /// Key-on count per pad, instrument mode.
    pub(crate) key_on: HashMap<usize, usize>,
}

impl ScopeData {
    pub(crate) fn new(num_channels: usize, frames: usize) -> Result<Self> {
        Ok(Self {
            staged: HashMap::new(),
            pool: Vec::new(),
            frames,
            queued: SmallVec::from_elem(0, num_channels),
            pad_queued: HashMap::new(),
            key_on: HashMap::new(),
        })
    }

    pub(crate) fn num_channels(&self) -> usize {
        self.queued.len()
    }

    /// Keep a copy of `samples` for iteration `id`, zero-padded to one buffer.
    pub(crate) fn stage(&mut self, id: u64, samples: &[f32]) -> Result<()> {
        let mut buffer = match self.pool.pop() {
            Some(buffer) => buffer,
            None => zeroed(self.frames, "staged input")?,
        };
        let len = samples.len().min(buffer.len());
        buffer[..len].copy_from_slice(&samples[..len]);
        buffer[len..].fill(0.0);
        self.staged.insert(id, buffer);
        Ok(())
    }

    /// Mix the samples staged for `id` into one channel of the interleaved
    /// `dst`. Items with nothing staged contribute silence.
    pub(crate) fn take_into(&mut self, id: u64, audio_channel: usize, dst: &mut [f32]) {
        let Some(buffer) = self.staged.remove(&id) else {
            return;
        };
        let channels = self.num_channels();
        if audio_channel < channels {
            for (frame, sample) in dst.chunks_exact_mut(channels).zip(buffer.iter()) {
                frame[audio_channel] += *sample;
            }
        }
        self.pool.push(buffer);
    }

    pub(crate) fn clear(&mut self) {
        self.pool.extend(self.staged.drain().map(|(_, buffer)| buffer));
        self.queued.iter_mut().for_each(|count| *count = 0);
        self.pad_queued.clear();
    }
}

/// Render-side buffers of a stereo engine, shared by every scope.
pub(crate) struct InterleavedBuffers {
    pub(crate) input: Vec<f32>,
    pub(crate) output: Vec<f32>,
    pub(crate) scratch: Vec<f32>,
    channels: usize,
    frames: usize,
}

impl InterleavedBuffers {
    pub(crate) fn new(num_channels: usize, frames: usize) -> Result<Self> {
        Ok(Self {
            input: zeroed(num_channels * frames, "interleaved input")?,
            output: zeroed(num_channels * frames, "interleaved output")?,
            scratch: zeroed(frames, "deinterleave scratch")?,
            channels: num_channels,
            frames,
        })
    }

    pub(crate) fn channels(&self) -> usize {
        self.channels
    }

    pub(crate) fn frames(&self) -> usize {
        self.frames
    }

    /// Copy one channel of the rendered output into `scratch`.
    pub(crate) fn deinterleave(&mut self, audio_channel: usize) -> &[f32] {
        let channels = self.channels;
        for (dst, frame) in self
            .scratch
            .iter_mut()
            .zip(self.output.chunks_exact(channels))
        {
            *dst = frame.get(audio_channel).copied().unwrap_or(0.0);
        }
        &self.scratch
    }
}
