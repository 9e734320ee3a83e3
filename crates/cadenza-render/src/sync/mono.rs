//! One item per render pass, through per-channel buffers.

use super::{render_blocks, Batch, IterateData, PreSync, SyncStrategy};
use crate::buffers::{ChannelBuffers, ChannelData};
use crate::error::Result;
use crate::renderer::{Renderer, StreamFormat};
use cadenza_core::compat::Mutex;
use smallvec::smallvec;

pub(crate) struct MonoSync {
    buffers: Mutex<ChannelBuffers>,
}

impl MonoSync {
    pub(crate) fn new(channels: usize, frames: usize) -> Result<Self> {
        Ok(Self {
            buffers: Mutex::new(ChannelBuffers::new(channels, frames)?),
        })
    }
}

impl SyncStrategy for MonoSync {
    fn stage(&self, _pre: &mut PreSync, _item: &IterateData) -> Result<bool> {
        // The producer stays blocked until its render is done, so its signal
        // is read on the render thread.
        Ok(true)
    }

    fn waits_for_activation(&self) -> bool {
        true
    }

    fn ready(&self, pre: &PreSync) -> bool {
        !pre.pending.is_empty()
    }

    fn pop(&self, pre: &mut PreSync) -> Option<Batch> {
        let item = pre.pending.pop_front()?;
        Some(Batch {
            scope: item.scope,
            items: smallvec![item],
        })
    }

    fn render(&self, batch: &Batch, renderer: &mut dyn Renderer) -> usize {
        let Some(item) = batch.items.first() else {
            return 0;
        };

        let mut buffers = self.buffers.lock();
        let frames = buffers.frames();
        let ChannelData { input, output } = match buffers.channel_mut(item.audio_channel) {
            Ok(channel) => channel,
            Err(err) => {
                // Channel count shrank after the item was queued.
                tracing::warn!(%err, id = item.id, "dropping render iteration");
                return 0;
            }
        };

        let read = item.signal.read_f32(input);
        input[read..].fill(0.0);
        output.fill(0.0);

        let failed = render_blocks(renderer, input, output, 1, frames);
        item.signal.write_f32(&output[..frames]);
        failed
    }

    fn resize(&self, _pre: &mut PreSync, channels: usize, frames: usize) -> Result<()> {
        let resized = ChannelBuffers::new(channels, frames)?;
        let mut buffers = self.buffers.lock();
        tracing::trace!(
            from = buffers.num_channels(),
            to = resized.num_channels(),
            frames,
            "resizing channel buffers"
        );
        *buffers = resized;
        Ok(())
    }

    fn format(&self, sample_rate: f64, _channels: usize, frames: usize) -> StreamFormat {
        StreamFormat {
            sample_rate,
            channels: 1,
            frames,
        }
    }
}
