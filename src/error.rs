//! Centralized error type for the cadenza umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] cadenza_core::Error),

    #[cfg(feature = "render")]
    #[error("Render: {0}")]
    Render(#[from] cadenza_render::RenderError),
}

pub type Result<T> = std::result::Result<T, Error>;
