//! External renderer hosting for cadenza.
//!
//! A [`Renderer`] (an out-of-graph instrument or effect processor) runs on one
//! dedicated render thread. Graph recalls on audio-processing threads hand it
//! their signals through [`RenderSync::render_thread_iteration`] and block until
//! the rendered samples have been written back.
//!
//! Two synchronization strategies are selected with [`SyncFlags`]:
//!
//! - mono (default): one signal per render pass, one buffer pair per audio channel
//! - [`SyncFlags::STEREO`]: one pass per complete channel group of a sound scope,
//!   through interleaved buffers; add [`SyncFlags::INSTRUMENT`] to wait for every
//!   keyed pad
//!
//! ## Usage
//!
//! ```ignore
//! use cadenza_render::{RenderRecall, RenderSync, SyncFlags};
//!
//! let sync = Arc::new(RenderSync::new(my_renderer, &EngineConfig::default(), SyncFlags::empty())?);
//! sync.start_render_thread()?;
//!
//! // Route an async aggregate's inputs through the renderer
//! let recall: Arc<dyn Recall> = Arc::new(RenderRecall::new(sync.clone()));
//! for input in effect.input() {
//!     input.add_recall(recall.clone());
//! }
//! ```

pub mod error;
pub use error::{RenderError, Result};

mod renderer;
pub use renderer::{RenderStatus, Renderer, StreamFormat};

mod buffers;

mod sync;
pub use sync::{RenderState, RenderSync, SyncFlags, RENDER_CHUNK};

mod recall;
pub use recall::RenderRecall;
