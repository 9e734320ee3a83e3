//! Channels and links.

use super::{Audio, NodeId, Recall, RecallId, RecallSlots, RecallTarget, Recycling};
use crate::compat::{Arc, RwLock, Weak};
use crate::{Error, Result, SoundScope, StageFlags};
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelDirection {
    Output,
    Input,
}

/// One line of an aggregate.
///
/// Holds a weak reference to its aggregate and to the channel it is linked
/// with, so links never keep aggregates alive.
pub struct Channel {
    id: NodeId,
    audio: Weak<Audio>,
    direction: ChannelDirection,
    pad: usize,
    audio_channel: usize,
    line: usize,
    link: RwLock<Weak<Channel>>,
    recycling: Option<Arc<Recycling>>,
    slots: RecallSlots,
}

impl Channel {
    pub(crate) fn new(
        audio: Weak<Audio>,
        direction: ChannelDirection,
        pad: usize,
        audio_channel: usize,
        audio_channels: usize,
        recycling: Option<Arc<Recycling>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            audio,
            direction,
            pad,
            audio_channel,
            line: pad * audio_channels + audio_channel,
            link: RwLock::new(Weak::new()),
            recycling,
            slots: RecallSlots::default(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn direction(&self) -> ChannelDirection {
        self.direction
    }

    pub fn is_output(&self) -> bool {
        self.direction == ChannelDirection::Output
    }

    pub fn is_input(&self) -> bool {
        self.direction == ChannelDirection::Input
    }

    pub fn pad(&self) -> usize {
        self.pad
    }

    pub fn audio_channel(&self) -> usize {
        self.audio_channel
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn audio(&self) -> Option<Arc<Audio>> {
        self.audio.upgrade()
    }

    pub fn link(&self) -> Option<Arc<Channel>> {
        self.link.read().upgrade()
    }

    /// The recycling this channel owns, if its aggregate gives it one.
    pub fn recycling(&self) -> Option<&Arc<Recycling>> {
        self.recycling.as_ref()
    }

    /// First recycling whose signals this channel sees.
    ///
    /// Outputs without their own recycling share the one of the input feeding
    /// them; inputs without their own recycling share their link's.
    pub fn first_recycling(&self) -> Option<Arc<Recycling>> {
        if let Some(recycling) = &self.recycling {
            return Some(Arc::clone(recycling));
        }

        match self.direction {
            ChannelDirection::Output => {
                let audio = self.audio()?;
                audio
                    .inputs_feeding(self)
                    .iter()
                    .find_map(|input| input.first_recycling())
            }
            ChannelDirection::Input => self.link()?.first_recycling(),
        }
    }

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
        self.slots.play(RecallTarget::Channel(self), recall_id, stage);
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("pad", &self.pad)
            .field("audio_channel", &self.audio_channel)
            .field("link", &self.link().map(|l| l.id))
            .finish()
    }
}

/// Link an output channel to an input channel of another aggregate.
pub fn link_channels(output: &Arc<Channel>, input: &Arc<Channel>) -> Result<()> {
    if !output.is_output() {
        return Err(Error::InvalidChannel {
            expected: ChannelDirection::Output,
            got: output.direction,
        });
    }
    if !input.is_input() {
        return Err(Error::InvalidChannel {
            expected: ChannelDirection::Input,
            got: input.direction,
        });
    }

    if let (Some(out_audio), Some(in_audio)) = (output.audio(), input.audio()) {
        if out_audio.id() == in_audio.id() {
            return Err(Error::SelfLink);
        }
        if in_audio.feeds(&out_audio) {
            return Err(Error::LinkCycle {
                from: out_audio.name().to_string(),
                to: in_audio.name().to_string(),
            });
        }
    }

    // Both ends under lock so a concurrent link can't interleave.
    let mut out_link = output.link.write();
    let mut in_link = input.link.write();
    if out_link.upgrade().is_some() || in_link.upgrade().is_some() {
        return Err(Error::AlreadyLinked);
    }
    *out_link = Arc::downgrade(input);
    *in_link = Arc::downgrade(output);

    tracing::debug!(output = %output.id, input = %input.id, "linked channels");
    Ok(())
}

/// Clear the link of `channel` and of the channel it pointed at.
pub fn unlink_channel(channel: &Arc<Channel>) {
    let previous = core::mem::take(&mut *channel.link.write());
    if let Some(other) = previous.upgrade() {
        let mut other_link = other.link.write();
        if other_link
            .upgrade()
            .is_some_and(|back| Arc::ptr_eq(&back, channel))
        {
            *other_link = Weak::new();
        }
    }
}
