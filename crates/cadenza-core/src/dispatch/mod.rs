//! Tree-list compilation and dispatch.
//!
//! A dispatch source (an aggregate or a single channel) is compiled into an
//! ordered [`TreeList`] of [`DispatchAudio`] entries, one per graph node that
//! holds a recall-id for the requested scope in the recycling context being
//! walked. A [`TreeDispatcher`] owns one such list plus a staging program and
//! replays the program against the list.
//!
//! # Example
//!
//! ```ignore
//! use cadenza_core::dispatch::{arm, compile_tree_list, DispatchSource, TreeDispatcher};
//!
//! let source = DispatchSource::Audio(mixer.clone());
//! arm(&source, SoundScope::Playback);
//!
//! let dispatcher = TreeDispatcher::new();
//! dispatcher.set_tree_list(compile_tree_list(Some(&source), SoundScope::Playback));
//! dispatcher.run();
//! ```

mod arm;
mod compiler;
mod dispatcher;
mod walk;

pub use arm::{arm, disarm};
pub use compiler::{
    compile_tree_list, compile_tree_list_audio, compile_tree_list_channel,
    compile_tree_list_channel_down, compile_tree_list_channel_down_input,
    compile_tree_list_channel_up, compile_tree_list_indexed,
};
pub use dispatcher::TreeDispatcher;

use crate::compat::Arc;
use crate::graph::{Audio, Channel, ChannelDirection, NodeId, RecallId, RecyclingContext};
use crate::{SoundScope, StageFlags};
use core::fmt;

/// Ordered dispatch entries, front to back in execution order.
pub type TreeList = Vec<Arc<DispatchAudio>>;

/// The graph node a tree list is compiled for.
#[derive(Clone)]
pub enum DispatchSource {
    Audio(Arc<Audio>),
    Channel(Arc<Channel>),
}

impl DispatchSource {
    pub fn id(&self) -> NodeId {
        match self {
            DispatchSource::Audio(audio) => audio.id(),
            DispatchSource::Channel(channel) => channel.id(),
        }
    }

    /// Identity comparison.
    pub fn same_as(&self, other: &DispatchSource) -> bool {
        match (self, other) {
            (DispatchSource::Audio(a), DispatchSource::Audio(b)) => Arc::ptr_eq(a, b),
            (DispatchSource::Channel(a), DispatchSource::Channel(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Arc<Audio>> for DispatchSource {
    fn from(audio: Arc<Audio>) -> Self {
        DispatchSource::Audio(audio)
    }
}

impl From<Arc<Channel>> for DispatchSource {
    fn from(channel: Arc<Channel>) -> Self {
        DispatchSource::Channel(channel)
    }
}

impl fmt::Debug for DispatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchSource::Audio(audio) => write!(f, "Audio({} {:?})", audio.id(), audio.name()),
            DispatchSource::Channel(channel) => write!(
                f,
                "Channel({} {:?} pad {} ac {})",
                channel.id(),
                channel.direction(),
                channel.pad(),
                channel.audio_channel()
            ),
        }
    }
}

/// Node targeted by a dispatch entry.
#[derive(Clone)]
pub enum TreeElement {
    Audio(Arc<Audio>),
    Output(Arc<Channel>),
    Input(Arc<Channel>),
}

impl TreeElement {
    pub fn from_channel(channel: Arc<Channel>) -> Self {
        match channel.direction() {
            ChannelDirection::Output => TreeElement::Output(channel),
            ChannelDirection::Input => TreeElement::Input(channel),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            TreeElement::Audio(audio) => audio.id(),
            TreeElement::Output(channel) | TreeElement::Input(channel) => channel.id(),
        }
    }

    pub fn same_as(&self, other: &TreeElement) -> bool {
        match (self, other) {
            (TreeElement::Audio(a), TreeElement::Audio(b)) => Arc::ptr_eq(a, b),
            (TreeElement::Output(a), TreeElement::Output(b))
            | (TreeElement::Input(a), TreeElement::Input(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn check_scope(&self, scope: SoundScope) -> Vec<Arc<RecallId>> {
        match self {
            TreeElement::Audio(audio) => audio.check_scope(scope),
            TreeElement::Output(channel) | TreeElement::Input(channel) => {
                channel.check_scope(scope)
            }
        }
    }

    pub(crate) fn add_recall_id(&self, recall_id: Arc<RecallId>) -> bool {
        match self {
            TreeElement::Audio(audio) => audio.add_recall_id(recall_id),
            TreeElement::Output(channel) | TreeElement::Input(channel) => {
                channel.add_recall_id(recall_id)
            }
        }
    }

    pub(crate) fn remove_recall_id(&self, recall_id: &RecallId) -> bool {
        match self {
            TreeElement::Audio(audio) => audio.remove_recall_id(recall_id),
            TreeElement::Output(channel) | TreeElement::Input(channel) => {
                channel.remove_recall_id(recall_id)
            }
        }
    }

    /// Play the node's recalls for one stage.
    ///
    /// A channel held under the wrong direction is logged and skipped.
    pub fn play_recall(&self, recall_id: &RecallId, stage: StageFlags) {
        match self {
            TreeElement::Audio(audio) => audio.play_recall(recall_id, stage),
            TreeElement::Output(channel) if channel.is_output() => {
                channel.play_recall(recall_id, stage)
            }
            TreeElement::Input(channel) if channel.is_input() => {
                channel.play_recall(recall_id, stage)
            }
            TreeElement::Output(channel) | TreeElement::Input(channel) => {
                tracing::warn!(
                    channel = %channel.id(),
                    direction = ?channel.direction(),
                    "tree element tag does not match channel direction, skipping"
                );
            }
        }
    }
}

impl fmt::Debug for TreeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeElement::Audio(audio) => write!(f, "Audio({} {:?})", audio.id(), audio.name()),
            TreeElement::Output(channel) => write!(f, "Output({})", channel.id()),
            TreeElement::Input(channel) => write!(f, "Input({})", channel.id()),
        }
    }
}

/// One entry of a compiled tree list.
///
/// Holds strong references to the node it targets, the recall-id selected for
/// it and the recycling context it was reached in, so the entry stays valid
/// while the graph is edited.
pub struct DispatchAudio {
    dispatch_source: DispatchSource,
    sound_scope: SoundScope,
    tree_element: TreeElement,
    recall_id: Arc<RecallId>,
    recycling_context: Arc<RecyclingContext>,
}

impl DispatchAudio {
    pub fn new(
        dispatch_source: DispatchSource,
        sound_scope: SoundScope,
        tree_element: TreeElement,
        recall_id: Arc<RecallId>,
        recycling_context: Arc<RecyclingContext>,
    ) -> Arc<Self> {
        Arc::new(Self {
            dispatch_source,
            sound_scope,
            tree_element,
            recall_id,
            recycling_context,
        })
    }

    pub fn dispatch_source(&self) -> &DispatchSource {
        &self.dispatch_source
    }

    pub fn sound_scope(&self) -> SoundScope {
        self.sound_scope
    }

    pub fn tree_element(&self) -> &TreeElement {
        &self.tree_element
    }

    pub fn recall_id(&self) -> &Arc<RecallId> {
        &self.recall_id
    }

    pub fn recycling_context(&self) -> &Arc<RecyclingContext> {
        &self.recycling_context
    }

    /// True if this entry was compiled for `source` at `scope`.
    pub fn matches(&self, source: &DispatchSource, scope: SoundScope) -> bool {
        self.sound_scope == scope && self.dispatch_source.same_as(source)
    }

    #[inline]
    pub(crate) fn play(&self, stage: StageFlags) {
        self.tree_element.play_recall(&self.recall_id, stage);
    }
}

impl fmt::Debug for DispatchAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchAudio")
            .field("dispatch_source", &self.dispatch_source)
            .field("sound_scope", &self.sound_scope)
            .field("tree_element", &self.tree_element)
            .field("recall_id", &self.recall_id.id())
            .field("recycling_context", &self.recycling_context.id())
            .finish()
    }
}
