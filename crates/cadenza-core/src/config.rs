//! Engine configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Largest buffer the render buffers are sized for.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Largest supported number of audio channels per aggregate.
pub const MAX_AUDIO_CHANNELS: usize = 64;

/// Configuration injected by the owning audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Frames per processing tick.
    pub buffer_size: usize,
    pub audio_channels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            buffer_size: 512,
            audio_channels: 2,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(Error::InvalidConfig(format!(
                "buffer_size {} out of range (1-{})",
                self.buffer_size, MAX_BUFFER_SIZE
            )));
        }
        if self.audio_channels == 0 || self.audio_channels > MAX_AUDIO_CHANNELS {
            return Err(Error::InvalidConfig(format!(
                "audio_channels {} out of range (1-{})",
                self.audio_channels, MAX_AUDIO_CHANNELS
            )));
        }
        Ok(())
    }
}
