//! Recyclings and recycling contexts.

use super::NodeId;
use crate::compat::{Arc, RwLock, Weak};
use crate::signal::AudioSignal;
use crate::SoundScope;
use core::fmt;

/// One buffer slot of the recycling graph.
///
/// Holds the audio signals produced for the channel that owns it.
pub struct Recycling {
    id: NodeId,
    signals: RwLock<Vec<Arc<AudioSignal>>>,
}

impl Recycling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            signals: RwLock::new(Vec::new()),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn add_audio_signal(&self, signal: Arc<AudioSignal>) {
        self.signals.write().push(signal);
    }

    pub fn remove_audio_signal(&self, signal: &AudioSignal) -> bool {
        let mut signals = self.signals.write();
        let before = signals.len();
        signals.retain(|s| s.id() != signal.id());
        signals.len() != before
    }

    pub fn audio_signals(&self) -> Vec<Arc<AudioSignal>> {
        self.signals.read().clone()
    }
}

impl fmt::Debug for Recycling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recycling")
            .field("id", &self.id)
            .field("signals", &self.signals.read().len())
            .finish()
    }
}

/// Partition of the recycling graph.
///
/// A root context is created when a dispatch source is armed; a child context
/// covers the input recyclings below an aggregate whose outputs own their own
/// recyclings.
pub struct RecyclingContext {
    id: NodeId,
    sound_scope: SoundScope,
    recyclings: Vec<Arc<Recycling>>,
    parent: Weak<RecyclingContext>,
    children: RwLock<Vec<Arc<RecyclingContext>>>,
}

impl RecyclingContext {
    pub fn new_root(sound_scope: SoundScope, recyclings: Vec<Arc<Recycling>>) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            sound_scope,
            recyclings,
            parent: Weak::new(),
            children: RwLock::new(Vec::new()),
        })
    }

    /// Create a child and register it with `parent`.
    pub fn new_child(parent: &Arc<Self>, recyclings: Vec<Arc<Recycling>>) -> Arc<Self> {
        let child = Arc::new(Self {
            id: NodeId::next(),
            sound_scope: parent.sound_scope,
            recyclings,
            parent: Arc::downgrade(parent),
            children: RwLock::new(Vec::new()),
        });
        parent.children.write().push(Arc::clone(&child));
        child
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn sound_scope(&self) -> SoundScope {
        self.sound_scope
    }

    pub fn recyclings(&self) -> &[Arc<Recycling>] {
        &self.recyclings
    }

    pub fn parent(&self) -> Option<Arc<RecyclingContext>> {
        self.parent.upgrade()
    }

    pub fn children(&self) -> Vec<Arc<RecyclingContext>> {
        self.children.read().clone()
    }

    pub fn root(self: &Arc<Self>) -> Arc<RecyclingContext> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Position of `recycling` in this context.
    pub fn find(&self, recycling: &Recycling) -> Option<usize> {
        self.recyclings
            .iter()
            .position(|r| core::ptr::eq(Arc::as_ptr(r), recycling))
    }

    pub fn contains(&self, recycling: &Recycling) -> bool {
        self.find(recycling).is_some()
    }

    /// The child context holding `recycling`.
    pub fn find_child(&self, recycling: &Recycling) -> Option<Arc<RecyclingContext>> {
        self.children
            .read()
            .iter()
            .find(|child| child.contains(recycling))
            .cloned()
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, other: &RecyclingContext) -> bool {
        if core::ptr::eq(self, other) {
            return true;
        }
        let mut current = other.parent();
        while let Some(ctx) = current {
            if core::ptr::eq(self, Arc::as_ptr(&ctx)) {
                return true;
            }
            current = ctx.parent();
        }
        false
    }
}

impl fmt::Debug for RecyclingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclingContext")
            .field("id", &self.id)
            .field("sound_scope", &self.sound_scope)
            .field("recyclings", &self.recyclings.len())
            .field("parent", &self.parent.upgrade().map(|p| p.id))
            .field("children", &self.children.read().len())
            .finish()
    }
}
