//! Error types for the render engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Core(#[from] cadenza_core::Error),

    #[error("Failed to spawn render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("Audio channel {audio_channel} out of range (engine has {channels})")]
    ChannelOutOfRange {
        audio_channel: usize,
        channels: usize,
    },

    #[error("Failed to allocate {requested} samples for {what}")]
    Allocation { what: &'static str, requested: usize },
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Zero-filled buffer, failing instead of aborting when memory runs out.
pub(crate) fn zeroed(len: usize, what: &'static str) -> Result<Vec<f32>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| RenderError::Allocation {
            what,
            requested: len,
        })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}
