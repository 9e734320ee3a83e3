//! Audio-graph kernel: channel/recycling graph, tree compiler and staged dispatch.
//!
//! # Primary API
//!
//! - [`Audio`] / [`Channel`]: graph nodes, linked with [`link_channels`]
//! - [`arm`] / [`disarm`]: attach recall-ids for a sound scope
//! - [`compile_tree_list`]: compile a dispatch source into a [`TreeList`]
//! - [`TreeDispatcher`]: replay a staging program against a tree list
//! - [`AudioSignal`]: sample buffers shared with the render engine
//!
//! # Example
//!
//! ```ignore
//! use cadenza_core::prelude::*;
//!
//! let synth = Audio::builder("synth").input_has_recycling().build();
//! let panel = Audio::builder("panel").output_has_recycling().build();
//! link_channels(&synth.output()[0], &panel.input()[0])?;
//!
//! let source = DispatchSource::Audio(panel);
//! arm(&source, SoundScope::Playback);
//!
//! let dispatcher = TreeDispatcher::with_staging_program(&default_staging_program());
//! dispatcher.set_tree_list(compile_tree_list(Some(&source), SoundScope::Playback));
//! dispatcher.run();
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{EngineConfig, MAX_AUDIO_CHANNELS, MAX_BUFFER_SIZE};

pub mod scope;
pub use scope::{default_staging_program, SoundScope, StageFlags};

pub mod signal;
pub use signal::{AudioSignal, Complex, SampleBuffer, SampleFormat};

pub mod graph;
pub use graph::{
    link_channels, unlink_channel, Audio, AudioBuilder, AudioFlags, Channel, ChannelDirection,
    NodeId, Recall, RecallId, RecallTarget, Recycling, RecyclingContext,
};

pub mod dispatch;
pub use dispatch::{
    arm, compile_tree_list, compile_tree_list_audio, compile_tree_list_channel,
    compile_tree_list_channel_down, compile_tree_list_channel_down_input,
    compile_tree_list_channel_up, compile_tree_list_indexed, disarm, DispatchAudio,
    DispatchSource, TreeDispatcher, TreeElement, TreeList,
};

/// Shared locks, atomics and collections.
pub mod compat;

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicStamp};

pub mod prelude {
    pub use crate::{
        arm, compile_tree_list, default_staging_program, disarm, link_channels, Audio,
        AudioSignal, Channel, DispatchSource, EngineConfig, Recall, RecallId, RecallTarget,
        SoundScope, StageFlags, TreeDispatcher, TreeList,
    };
}
