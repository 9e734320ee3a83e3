use crate::sync::RenderSync;
use cadenza_core::compat::Arc;
use cadenza_core::{Recall, RecallId, RecallTarget, StageFlags};

/// Routes the signals of an input channel through a [`RenderSync`].
///
/// Attach to the input channels of an async aggregate. On its stage every
/// audio signal of the channel's first recycling is rendered in place.
pub struct RenderRecall {
    sync: Arc<RenderSync>,
    stage: StageFlags,
}

impl RenderRecall {
    pub fn new(sync: Arc<RenderSync>) -> Self {
        Self {
            sync,
            stage: StageFlags::RUN_INTER,
        }
    }

    pub fn with_stage(mut self, stage: StageFlags) -> Self {
        self.stage = stage;
        self
    }

    pub fn stage(&self) -> StageFlags {
        self.stage
    }

    pub fn sync(&self) -> &Arc<RenderSync> {
        &self.sync
    }
}

impl Recall for RenderRecall {
    fn play(&self, target: RecallTarget<'_>, recall_id: &RecallId, stage: StageFlags) {
        if !stage.intersects(self.stage) {
            return;
        }
        let RecallTarget::Channel(channel) = target else {
            return;
        };
        if !channel.is_input() {
            return;
        }
        let Some(recycling) = channel.first_recycling() else {
            return;
        };

        for signal in recycling.audio_signals() {
            if let Err(err) = self.sync.render_thread_iteration(
                &signal,
                channel.pad(),
                channel.audio_channel(),
                recall_id.sound_scope(),
            ) {
                tracing::warn!(%err, channel = %channel.id(), "render iteration rejected");
            }
        }
    }
}

impl core::fmt::Debug for RenderRecall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderRecall")
            .field("stage", &self.stage)
            .field("sync", &self.sync)
            .finish()
    }
}
