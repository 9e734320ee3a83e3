//! Shared synchronization and collection types.
//!
//! Every crate in the workspace locks through these so the whole engine agrees
//! on one mutex implementation.

pub use parking_lot::{
    Condvar, Mutex, MutexGuard, ReentrantMutex, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

pub use std::collections::VecDeque;
pub use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering},
    Arc, Weak,
};

pub use hashbrown::{HashMap, HashSet};
