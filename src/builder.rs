//! Builder for configuring and constructing a `CadenzaEngine`.

use crate::{CadenzaEngine, Result};
use cadenza_core::{default_staging_program, EngineConfig, StageFlags};

/// Settings not given explicitly keep their [`EngineConfig::default`] value.
/// The staging program defaults to [`default_staging_program`].
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let engine = CadenzaEngine::builder()
///     .sample_rate(48000.0)
///     .buffer_size(256)
///     .build()?;
/// ```
pub struct CadenzaEngineBuilder {
    config: EngineConfig,
    staging_program: Vec<StageFlags>,
}

impl Default for CadenzaEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            staging_program: default_staging_program(),
        }
    }
}

impl CadenzaEngineBuilder {
    /// Default: 44100
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 512
    pub fn buffer_size(mut self, frames: usize) -> Self {
        self.config.buffer_size = frames;
        self
    }

    /// Default: 2
    pub fn audio_channels(mut self, count: usize) -> Self {
        self.config.audio_channels = count;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Stages every dispatcher replays per tick, in order.
    pub fn staging_program(mut self, program: &[StageFlags]) -> Self {
        self.staging_program = program.to_vec();
        self
    }

    pub fn build(self) -> Result<CadenzaEngine> {
        self.config.validate()?;
        Ok(CadenzaEngine::from_parts(self.config, self.staging_program))
    }
}
