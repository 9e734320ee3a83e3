//! Channel / recycling graph.
//!
//! Aggregates ([`Audio`]) own output and input [`Channel`]s. Output channels link
//! to input channels of other aggregates. Each channel resolves to a first
//! [`Recycling`] (buffer slot), and [`RecyclingContext`]s partition those slots;
//! a child context starts at every aggregate whose outputs own their recyclings.
//!
//! Nodes carry the [`RecallId`]s armed for them and the [`Recall`]s that run when
//! a dispatcher plays them.

mod audio;
mod channel;
mod recall;
mod recycling;

pub use audio::{Audio, AudioBuilder, AudioFlags};
pub use channel::{link_channels, unlink_channel, Channel, ChannelDirection};
pub use recall::{Recall, RecallId, RecallTarget};
pub use recycling::{Recycling, RecyclingContext};

pub(crate) use recall::RecallSlots;

use core::fmt;
use crate::compat::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity for graph objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
