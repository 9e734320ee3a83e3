//! Arming and disarming dispatch sources.
//!
//! Arming attaches one recall-id per (recycling context, scope) to every node
//! the compiler would visit from a source, creating the root context and the
//! child contexts below recycling boundaries on the way. It is the step a
//! sequencer or player performs before the source's tree list is compiled.

use super::walk::{walk_channel, TreeVisitor};
use super::{DispatchSource, TreeElement};
use crate::compat::{Arc, HashMap};
use crate::graph::{Channel, NodeId, RecallId, Recycling, RecyclingContext};
use crate::SoundScope;

/// Arm `source` for `scope`, returning the recall-ids created.
///
/// The root context holds the first recycling of every output the source
/// covers. Arming twice creates a second, independent root context.
pub fn arm(source: &DispatchSource, scope: SoundScope) -> Vec<Arc<RecallId>> {
    let channels: Vec<Arc<Channel>> = match source {
        DispatchSource::Audio(audio) => audio.output().to_vec(),
        DispatchSource::Channel(channel) => vec![Arc::clone(channel)],
    };

    let mut recyclings: Vec<Arc<Recycling>> = Vec::new();
    for recycling in channels.iter().filter_map(|ch| ch.first_recycling()) {
        push_unique(&mut recyclings, recycling);
    }
    let root = RecyclingContext::new_root(scope, recyclings);

    let mut armer = Armer {
        scope,
        recall_ids: HashMap::new(),
        order: Vec::new(),
    };
    for channel in &channels {
        walk_channel(&mut armer, channel, &root);
    }

    tracing::debug!(?source, %scope, recall_ids = armer.order.len(), "armed dispatch source");
    armer.order
}

/// Remove every recall-id of `scope` from the nodes reachable from `source`.
///
/// Returns the number of recall-ids removed.
pub fn disarm(source: &DispatchSource, scope: SoundScope) -> usize {
    let channels: Vec<Arc<Channel>> = match source {
        DispatchSource::Audio(audio) => audio.output().to_vec(),
        DispatchSource::Channel(channel) => vec![Arc::clone(channel)],
    };

    let mut disarmer = Disarmer {
        scope,
        removed: 0,
    };

    // Walk once per context the source is armed in.
    for channel in &channels {
        let mut contexts: Vec<Arc<RecyclingContext>> = Vec::new();
        for recall_id in channel.check_scope(scope) {
            let context = recall_id.recycling_context();
            if !contexts.iter().any(|c| Arc::ptr_eq(c, context)) {
                contexts.push(Arc::clone(context));
            }
        }
        for context in &contexts {
            walk_channel(&mut disarmer, channel, context);
        }
    }

    tracing::debug!(?source, %scope, removed = disarmer.removed, "disarmed dispatch source");
    disarmer.removed
}

fn push_unique(recyclings: &mut Vec<Arc<Recycling>>, recycling: Arc<Recycling>) {
    if !recyclings.iter().any(|r| Arc::ptr_eq(r, &recycling)) {
        recyclings.push(recycling);
    }
}

struct Armer {
    scope: SoundScope,
    /// Recall-id per recycling context id.
    recall_ids: HashMap<NodeId, Arc<RecallId>>,
    order: Vec<Arc<RecallId>>,
}

impl TreeVisitor for Armer {
    fn visit(&mut self, element: TreeElement, context: &Arc<RecyclingContext>) {
        let recall_id = self
            .recall_ids
            .entry(context.id())
            .or_insert_with(|| {
                let recall_id = RecallId::new(self.scope, Arc::clone(context));
                self.order.push(Arc::clone(&recall_id));
                recall_id
            })
            .clone();
        element.add_recall_id(recall_id);
    }

    fn child_context(
        &mut self,
        context: &Arc<RecyclingContext>,
        first: &Arc<Recycling>,
        inputs: &[Arc<Channel>],
    ) -> Option<Arc<RecyclingContext>> {
        if let Some(child) = context.find_child(first) {
            return Some(child);
        }

        let mut recyclings = Vec::new();
        for recycling in inputs.iter().filter_map(|input| input.first_recycling()) {
            push_unique(&mut recyclings, recycling);
        }
        Some(RecyclingContext::new_child(context, recyclings))
    }
}

struct Disarmer {
    scope: SoundScope,
    removed: usize,
}

impl TreeVisitor for Disarmer {
    fn visit(&mut self, element: TreeElement, context: &Arc<RecyclingContext>) {
        for recall_id in element.check_scope(self.scope) {
            if Arc::ptr_eq(recall_id.recycling_context(), context)
                && element.remove_recall_id(&recall_id)
            {
                self.removed += 1;
            }
        }
    }

    fn child_context(
        &mut self,
        context: &Arc<RecyclingContext>,
        first: &Arc<Recycling>,
        _inputs: &[Arc<Channel>],
    ) -> Option<Arc<RecyclingContext>> {
        context.find_child(first)
    }
}
