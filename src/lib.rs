//! # Cadenza - Audio-graph dispatch engine
//!
//! Compiles the channel/recycling graph of a sequencer into flat, ordered tree
//! lists and replays staged processing over them, optionally routing async
//! aggregates through an external renderer on a dedicated render thread.
//!
//! ## Architecture
//!
//! Cadenza is an umbrella crate that coordinates:
//! - **cadenza-core** - Graph model, arming, tree compiler, tree dispatcher
//! - **cadenza-render** - Render thread with mono and stereo synchronization
//!
//! ## Quick Start
//!
//! ```ignore
//! use cadenza::prelude::*;
//!
//! let engine = CadenzaEngine::builder()
//!     .sample_rate(48000.0)
//!     .buffer_size(256)
//!     .build()?;
//!
//! // Build the graph
//! let synth = Audio::builder("synth").input_has_recycling().build();
//! let panel = Audio::builder("panel").output_has_recycling().build();
//! link_channels(&synth.output()[0], &panel.input()[0])?;
//!
//! // Arm and register the source, then tick once per cycle
//! let source = DispatchSource::Audio(panel.clone());
//! arm(&source, SoundScope::Playback);
//! engine.add_source(source, SoundScope::Playback);
//! engine.tick();
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Core plus render
//! - `render` - External renderer hosting

/// Re-export of cadenza-core for direct access
pub use cadenza_core as core;

pub use cadenza_core::{
    // Graph
    arm,
    compile_tree_list,
    compile_tree_list_audio,
    compile_tree_list_channel,
    compile_tree_list_channel_down,
    compile_tree_list_channel_down_input,
    compile_tree_list_channel_up,
    compile_tree_list_indexed,
    default_staging_program,
    disarm,
    link_channels,
    unlink_channel,
    Audio,
    AudioBuilder,
    AudioFlags,
    AudioSignal,
    Channel,
    ChannelDirection,

    // Dispatch
    DispatchAudio,
    DispatchSource,
    EngineConfig,
    NodeId,
    Recall,
    RecallId,
    RecallTarget,
    Recycling,
    RecyclingContext,
    SampleFormat,
    SoundScope,
    StageFlags,
    TreeDispatcher,
    TreeElement,
    TreeList,
};

// Render engine
#[cfg(feature = "render")]
pub use cadenza_render as render;

#[cfg(feature = "render")]
pub use cadenza_render::{
    RenderRecall, RenderState, RenderStatus, RenderSync, Renderer, StreamFormat, SyncFlags,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::CadenzaEngineBuilder;
pub use engine::CadenzaEngine;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{CadenzaEngine, CadenzaEngineBuilder};

    // Graph and dispatch
    pub use crate::core::prelude::*;
    pub use crate::{unlink_channel, DispatchAudio};

    // Render
    #[cfg(feature = "render")]
    pub use crate::render::{RenderRecall, RenderSync, Renderer, RenderStatus, SyncFlags};
}
