//! Tree-list compiler.
//!
//! Every function takes the list being accumulated by value and returns it
//! with the newly discovered entries appended. A missing source or recycling
//! context returns the list unchanged. Compiling never mutates the graph.

use super::walk::{walk_channel, walk_down, walk_down_input, walk_up, TreeVisitor};
use super::{DispatchAudio, DispatchSource, TreeElement, TreeList};
use crate::compat::{Arc, HashSet};
use crate::graph::{Audio, Channel, NodeId, Recycling, RecyclingContext};
use crate::SoundScope;

/// Compile the tree list for `source` at `scope`.
///
/// Empty when nothing reachable from the source is armed for the scope.
pub fn compile_tree_list(source: Option<&DispatchSource>, scope: SoundScope) -> TreeList {
    let Some(source) = source else {
        return TreeList::new();
    };

    let list = match source {
        DispatchSource::Audio(audio) => {
            compile_tree_list_audio(TreeList::new(), audio, Some(source), scope)
        }
        DispatchSource::Channel(channel) => {
            compile_tree_list_channel(TreeList::new(), channel, Some(source), scope)
        }
    };

    tracing::trace!(?source, %scope, entries = list.len(), "compiled tree list");
    list
}

/// Like [`compile_tree_list`], for callers holding a raw scope index.
///
/// An index outside `0..SoundScope::LAST` is logged and yields an empty list.
pub fn compile_tree_list_indexed(source: Option<&DispatchSource>, scope_index: i32) -> TreeList {
    match SoundScope::try_from(scope_index) {
        Ok(scope) => compile_tree_list(source, scope),
        Err(err) => {
            tracing::warn!(%err, "not compiling tree list");
            TreeList::new()
        }
    }
}

/// Append the entries reachable from every output channel of `audio`.
pub fn compile_tree_list_audio(
    mut list: TreeList,
    audio: &Arc<Audio>,
    source: Option<&DispatchSource>,
    scope: SoundScope,
) -> TreeList {
    if source.is_none() {
        return list;
    }

    for output in audio.output() {
        list = compile_tree_list_channel(list, output, source, scope);
    }
    list
}

/// Append the entries reachable from `channel`, once per recycling context it
/// is armed in.
pub fn compile_tree_list_channel(
    list: TreeList,
    channel: &Arc<Channel>,
    source: Option<&DispatchSource>,
    scope: SoundScope,
) -> TreeList {
    let Some(source) = source else {
        return list;
    };

    let mut contexts: Vec<Arc<RecyclingContext>> = Vec::new();
    for recall_id in channel.check_scope(scope) {
        let context = recall_id.recycling_context();
        if !contexts.iter().any(|c| Arc::ptr_eq(c, context)) {
            contexts.push(Arc::clone(context));
        }
    }

    let mut compiler = Compiler::new(list, source, scope);
    for context in &contexts {
        walk_channel(&mut compiler, channel, context);
    }
    compiler.into_list()
}

/// Append the entries found walking up from `channel` in `context`.
pub fn compile_tree_list_channel_up(
    list: TreeList,
    channel: &Arc<Channel>,
    source: Option<&DispatchSource>,
    scope: SoundScope,
    context: Option<&Arc<RecyclingContext>>,
) -> TreeList {
    let (Some(source), Some(context)) = (source, context) else {
        return list;
    };

    let mut compiler = Compiler::new(list, source, scope);
    walk_up(&mut compiler, channel, context);
    compiler.into_list()
}

/// Append the entries found walking down from the output `channel` in `context`.
pub fn compile_tree_list_channel_down(
    list: TreeList,
    channel: &Arc<Channel>,
    source: Option<&DispatchSource>,
    scope: SoundScope,
    context: Option<&Arc<RecyclingContext>>,
) -> TreeList {
    let (Some(source), Some(context)) = (source, context) else {
        return list;
    };

    let mut compiler = Compiler::new(list, source, scope);
    walk_down(&mut compiler, channel, context);
    compiler.into_list()
}

/// Append the entries found walking down from the input `input` in `context`.
pub fn compile_tree_list_channel_down_input(
    list: TreeList,
    input: &Arc<Channel>,
    source: Option<&DispatchSource>,
    scope: SoundScope,
    context: Option<&Arc<RecyclingContext>>,
) -> TreeList {
    let (Some(source), Some(context)) = (source, context) else {
        return list;
    };

    let mut compiler = Compiler::new(list, source, scope);
    walk_down_input(&mut compiler, input, context);
    compiler.into_list()
}

struct Compiler<'a> {
    source: &'a DispatchSource,
    scope: SoundScope,
    list: TreeList,
    /// (node, recall-id) pairs already in `list`.
    seen: HashSet<(NodeId, NodeId)>,
}

impl<'a> Compiler<'a> {
    fn new(list: TreeList, source: &'a DispatchSource, scope: SoundScope) -> Self {
        let seen = list
            .iter()
            .map(|entry| (entry.tree_element().id(), entry.recall_id().id()))
            .collect();
        Self {
            source,
            scope,
            list,
            seen,
        }
    }

    fn into_list(self) -> TreeList {
        self.list
    }
}

impl TreeVisitor for Compiler<'_> {
    fn visit(&mut self, element: TreeElement, context: &Arc<RecyclingContext>) {
        let Some(recall_id) = element
            .check_scope(self.scope)
            .into_iter()
            .find(|rid| Arc::ptr_eq(rid.recycling_context(), context))
        else {
            return;
        };

        if !self.seen.insert((element.id(), recall_id.id())) {
            return;
        }

        self.list.push(DispatchAudio::new(
            self.source.clone(),
            self.scope,
            element,
            recall_id,
            Arc::clone(context),
        ));
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
