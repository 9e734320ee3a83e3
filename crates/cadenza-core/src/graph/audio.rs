//! Audio aggregates.

use super::{Channel, ChannelDirection, NodeId, Recall, RecallId, RecallSlots, RecallTarget, Recycling};
use crate::compat::{Arc, HashSet};
use crate::{SoundScope, StageFlags};
use core::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioFlags {
    /// Input pads feed every output pad of the same audio channel
    /// (instead of input pad N feeding output pad N).
    pub is_async: bool,
    /// Output channels own their recyclings; the inputs form a child context.
    pub output_has_recycling: bool,
    /// Input channels own their recyclings (signal generators).
    pub input_has_recycling: bool,
}

/// Aggregate of output and input channels, laid out pad-major.
pub struct Audio {
    id: NodeId,
    name: String,
    flags: AudioFlags,
    audio_channels: usize,
    output_pads: usize,
    input_pads: usize,
    output: Vec<Arc<Channel>>,
    input: Vec<Arc<Channel>>,
    slots: RecallSlots,
}

pub struct AudioBuilder {
    name: String,
    flags: AudioFlags,
    audio_channels: usize,
    output_pads: usize,
    input_pads: usize,
}

impl AudioBuilder {
    /// Default: 1
    pub fn audio_channels(mut self, count: usize) -> Self {
        self.audio_channels = count;
        self
    }

    /// Default: 1
    pub fn output_pads(mut self, count: usize) -> Self {
        self.output_pads = count;
        self
    }

    /// Default: 1
    pub fn input_pads(mut self, count: usize) -> Self {
        self.input_pads = count;
        self
    }

    pub fn is_async(mut self) -> Self {
        self.flags.is_async = true;
        self
    }

    pub fn output_has_recycling(mut self) -> Self {
        self.flags.output_has_recycling = true;
        self
    }

    pub fn input_has_recycling(mut self) -> Self {
        self.flags.input_has_recycling = true;
        self
    }

    pub fn flags(mut self, flags: AudioFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(self) -> Arc<Audio> {
        let AudioBuilder {
            name,
            flags,
            audio_channels,
            output_pads,
            input_pads,
        } = self;

        Arc::new_cyclic(|weak| {
            let make_channels = |direction: ChannelDirection, pads: usize, owns_recycling: bool| {
                (0..pads)
                    .flat_map(|pad| (0..audio_channels).map(move |ac| (pad, ac)))
                    .map(|(pad, audio_channel)| {
                        Channel::new(
                            weak.clone(),
                            direction,
                            pad,
                            audio_channel,
                            audio_channels,
                            owns_recycling.then(Recycling::new),
                        )
                    })
                    .collect::<Vec<_>>()
            };

            Audio {
                id: NodeId::next(),
                name,
                flags,
                audio_channels,
                output_pads,
                input_pads,
                output: make_channels(
                    ChannelDirection::Output,
                    output_pads,
                    flags.output_has_recycling,
                ),
                input: make_channels(
                    ChannelDirection::Input,
                    input_pads,
                    flags.input_has_recycling,
                ),
                slots: RecallSlots::default(),
            }
        })
    }
}

impl Audio {
    pub fn builder(name: impl Into<String>) -> AudioBuilder {
        AudioBuilder {
            name: name.into(),
            flags: AudioFlags::default(),
            audio_channels: 1,
            output_pads: 1,
            input_pads: 1,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> AudioFlags {
        self.flags
    }

    pub fn is_async(&self) -> bool {
        self.flags.is_async
    }

    pub fn output_has_recycling(&self) -> bool {
        self.flags.output_has_recycling
    }

    pub fn audio_channels(&self) -> usize {
        self.audio_channels
    }

    pub fn output_pads(&self) -> usize {
        self.output_pads
    }

    pub fn input_pads(&self) -> usize {
        self.input_pads
    }

    pub fn output(&self) -> &[Arc<Channel>] {
        &self.output
    }

    pub fn input(&self) -> &[Arc<Channel>] {
        &self.input
    }

    pub fn output_at(&self, pad: usize, audio_channel: usize) -> Option<Arc<Channel>> {
        if pad >= self.output_pads || audio_channel >= self.audio_channels {
            return None;
        }
        self.output.get(pad * self.audio_channels + audio_channel).cloned()
    }

    pub fn input_at(&self, pad: usize, audio_channel: usize) -> Option<Arc<Channel>> {
        if pad >= self.input_pads || audio_channel >= self.audio_channels {
            return None;
        }
        self.input.get(pad * self.audio_channels + audio_channel).cloned()
    }

    /// Every input pad's channel for `audio_channel`, in pad order.
    pub fn inputs_for_audio_channel(&self, audio_channel: usize) -> Vec<Arc<Channel>> {
        self.input
            .iter()
            .filter(|ch| ch.audio_channel() == audio_channel)
            .cloned()
            .collect()
    }

    /// Inputs feeding `output`: every pad for async aggregates, the same pad otherwise.
    pub fn inputs_feeding(&self, output: &Channel) -> Vec<Arc<Channel>> {
        if self.is_async() {
            self.inputs_for_audio_channel(output.audio_channel())
        } else {
            self.input_at(output.pad(), output.audio_channel())
                .into_iter()
                .collect()
        }
    }

    /// Output fed by `input`: pad 0 for async aggregates, the same pad otherwise.
    pub fn output_fed_by(&self, input: &Channel) -> Option<Arc<Channel>> {
        if self.is_async() {
            self.output_at(0, input.audio_channel())
        } else {
            self.output_at(input.pad(), input.audio_channel())
        }
    }

    /// Recall-ids pending for `scope`, in attachment order.
    pub fn check_scope(&self, scope: SoundScope) -> Vec<Arc<RecallId>> {
        self.slots.check_scope(scope)
    }

    pub fn recall_ids(&self) -> Vec<Arc<RecallId>> {
        self.slots.recall_ids()
    }

    pub fn add_recall_id(&self, recall_id: Arc<RecallId>) -> bool {
        self.slots.add_recall_id(recall_id)
    }

    pub fn remove_recall_id(&self, recall_id: &RecallId) -> bool {
        self.slots.remove_recall_id(recall_id)
    }

    pub fn add_recall(&self, recall: Arc<dyn Recall>) {
        self.slots.add_recall(recall);
    }

    pub fn play_recall(&self, recall_id: &RecallId, stage: StageFlags) {
        self.slots.play(RecallTarget::Audio(self), recall_id, stage);
    }

    /// True if signal flows from `self` into `target` through output links.
    pub fn feeds(&self, target: &Audio) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<Arc<Audio>> = self.downstream();

        while let Some(audio) = stack.pop() {
            if audio.id == target.id {
                return true;
            }
            if visited.insert(audio.id) {
                stack.extend(audio.downstream());
            }
        }
        false
    }

    fn downstream(&self) -> Vec<Arc<Audio>> {
        self.output
            .iter()
            .filter_map(|out| out.link())
            .filter_map(|input| input.audio())
            .collect()
    }
}

impl fmt::Debug for Audio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Audio")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("audio_channels", &self.audio_channels)
            .field("output_pads", &self.output_pads)
            .field("input_pads", &self.input_pads)
            .finish()
    }
}
