//! Error types for cadenza-core.

use crate::graph::ChannelDirection;
use thiserror::Error;

/// Error type for cadenza-core operations.
///
/// Graph traversal and dispatch never produce these; a missing recall-id or an
/// unreachable node is a normal "nothing to do" outcome. Errors are reserved for
/// configuration and graph editing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid sound scope: {0}. Must be between 0 and {max}", max = crate::SoundScope::LAST - 1)]
    InvalidSoundScope(i32),

    #[error("Invalid channel: expected {expected:?}, got {got:?}")]
    InvalidChannel {
        expected: ChannelDirection,
        got: ChannelDirection,
    },

    #[error("Channel already linked")]
    AlreadyLinked,

    #[error("Cannot link channels of the same audio")]
    SelfLink,

    #[error("Link would create a cycle between {from} and {to}")]
    LinkCycle { from: String, to: String },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
