//! Tree dispatcher.

use super::{DispatchSource, TreeList};
use crate::compat::ReentrantMutex;
use crate::lockfree::AtomicStamp;
use crate::{SoundScope, StageFlags};
use core::cell::RefCell;

struct DispatcherState {
    tree_list: TreeList,
    staging_program: Vec<StageFlags>,
}

/// Owns one compiled tree list and a staging program, and replays the program
/// against the list.
///
/// The list and the program share one reentrant lock, so a recall played from
/// [`run`](Self::run) may call back into the dispatcher. `run` holds the lock
/// only while taking a snapshot of the list for each stage; a list swapped in
/// mid-run takes effect at the next stage.
pub struct TreeDispatcher {
    state: ReentrantMutex<RefCell<DispatcherState>>,
    tree_list_stamp: AtomicStamp,
}

impl TreeDispatcher {
    pub fn new() -> Self {
        Self::with_staging_program(&[])
    }

    pub fn with_staging_program(staging_program: &[StageFlags]) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(DispatcherState {
                tree_list: TreeList::new(),
                staging_program: staging_program.to_vec(),
            })),
            tree_list_stamp: AtomicStamp::default(),
        }
    }

    /// Copy of the current list. Entries are shared with the dispatcher.
    pub fn tree_list(&self) -> TreeList {
        let state = self.state.lock();
        let list = state.borrow().tree_list.clone();
        list
    }

    /// Replace the list, handing the previous one back to the caller.
    pub fn set_tree_list(&self, tree_list: TreeList) -> TreeList {
        let state = self.state.lock();
        let previous = core::mem::replace(&mut state.borrow_mut().tree_list, tree_list);
        previous
    }

    pub fn tree_list_stamp(&self) -> u64 {
        self.tree_list_stamp.get()
    }

    pub fn set_tree_list_stamp(&self, stamp: u64) {
        self.tree_list_stamp.set(stamp);
    }

    /// Drop every entry compiled for `source` at `scope`. No-op without matches.
    pub fn remove_dispatch_source(&self, source: &DispatchSource, scope: SoundScope) {
        let state = self.state.lock();
        let mut state = state.borrow_mut();
        let before = state.tree_list.len();
        state
            .tree_list
            .retain(|entry| !entry.matches(source, scope));

        let removed = before - state.tree_list.len();
        if removed > 0 {
            tracing::debug!(?source, %scope, removed, "removed dispatch source");
        }
    }

    pub fn staging_program(&self) -> Vec<StageFlags> {
        let state = self.state.lock();
        let program = state.borrow().staging_program.clone();
        program
    }

    pub fn set_staging_program(&self, staging_program: &[StageFlags]) {
        let state = self.state.lock();
        state.borrow_mut().staging_program = staging_program.to_vec();
    }

    /// Play every entry for each stage of the program, stage-major.
    ///
    /// All entries see stage N before any entry sees stage N + 1.
    pub fn run(&self) {
        let staging_program = self.staging_program();

        for stage in staging_program {
            let tree_list = self.tree_list();
            for entry in &tree_list {
                entry.play(stage);
            }
        }
    }
}

impl Default for TreeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for TreeDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        let state = state.borrow();
        f.debug_struct("TreeDispatcher")
            .field("tree_list", &state.tree_list.len())
            .field("staging_program", &state.staging_program)
            .field("tree_list_stamp", &self.tree_list_stamp.get())
            .finish()
    }
}
