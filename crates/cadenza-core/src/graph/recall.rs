//! Recall-ids and recalls.

use super::{Audio, Channel, NodeId, RecyclingContext};
use crate::compat::{Arc, RwLock};
use crate::{SoundScope, StageFlags};
use core::fmt;

/// Execution context for one armed sound scope within one recycling context.
pub struct RecallId {
    id: NodeId,
    sound_scope: SoundScope,
    recycling_context: Arc<RecyclingContext>,
}

impl RecallId {
    pub fn new(sound_scope: SoundScope, recycling_context: Arc<RecyclingContext>) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            sound_scope,
            recycling_context,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn sound_scope(&self) -> SoundScope {
        self.sound_scope
    }

    pub fn recycling_context(&self) -> &Arc<RecyclingContext> {
        &self.recycling_context
    }
}

impl fmt::Debug for RecallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecallId")
            .field("id", &self.id)
            .field("sound_scope", &self.sound_scope)
            .field("recycling_context", &self.recycling_context.id())
            .finish()
    }
}

/// The node a recall is played on.
#[derive(Clone, Copy)]
pub enum RecallTarget<'a> {
    Audio(&'a Audio),
    Channel(&'a Channel),
}

impl RecallTarget<'_> {
    pub fn id(&self) -> NodeId {
        match self {
            RecallTarget::Audio(audio) => audio.id(),
            RecallTarget::Channel(channel) => channel.id(),
        }
    }
}

/// Processing attached to an aggregate or channel.
///
/// Invoked by [`Audio::play_recall`] / [`Channel::play_recall`] once per staging
/// step. Implementations decide which stages they react to.
pub trait Recall: Send + Sync {
    fn play(&self, target: RecallTarget<'_>, recall_id: &RecallId, stage: StageFlags);
}

/// Recall-ids and recalls attached to one node.
#[derive(Default)]
pub(crate) struct RecallSlots {
    recall_ids: RwLock<Vec<Arc<RecallId>>>,
    recalls: RwLock<Vec<Arc<dyn Recall>>>,
}

impl RecallSlots {
    pub(crate) fn check_scope(&self, scope: SoundScope) -> Vec<Arc<RecallId>> {
        self.recall_ids
            .read()
            .iter()
            .filter(|rid| rid.sound_scope() == scope)
            .cloned()
            .collect()
    }

    pub(crate) fn recall_ids(&self) -> Vec<Arc<RecallId>> {
        self.recall_ids.read().clone()
    }

    /// Returns false if the recall-id was already attached.
    pub(crate) fn add_recall_id(&self, recall_id: Arc<RecallId>) -> bool {
        let mut ids = self.recall_ids.write();
        if ids.iter().any(|rid| Arc::ptr_eq(rid, &recall_id)) {
            return false;
        }
        ids.push(recall_id);
        true
    }

    pub(crate) fn remove_recall_id(&self, recall_id: &RecallId) -> bool {
        let mut ids = self.recall_ids.write();
        let before = ids.len();
        ids.retain(|rid| !core::ptr::eq(Arc::as_ptr(rid), recall_id));
        ids.len() != before
    }

    pub(crate) fn add_recall(&self, recall: Arc<dyn Recall>) {
        self.recalls.write().push(recall);
    }

    pub(crate) fn play(&self, target: RecallTarget<'_>, recall_id: &RecallId, stage: StageFlags) {
        // Snapshot so a recall may edit the node it runs on.
        let recalls = self.recalls.read().clone();
        for recall in &recalls {
            recall.play(target, recall_id, stage);
        }
    }
}
