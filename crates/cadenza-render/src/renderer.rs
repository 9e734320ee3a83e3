//! External renderer interface.
//!
//! A renderer is an asynchronous instrument or effect processor hosted on the
//! render thread. It consumes and produces interleaved linear float PCM in the
//! format it was last given.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    pub channels: usize,
    /// Largest frame count one `render` call may ask for.
    pub frames: usize,
}

/// Outcome of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Success,
    InsufficientInput,
    CannotRenderNow,
    Error(i32),
}

impl RenderStatus {
    pub fn is_success(self) -> bool {
        self == RenderStatus::Success
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStatus::Success => write!(f, "success"),
            RenderStatus::InsufficientInput => write!(f, "insufficient input data"),
            RenderStatus::CannotRenderNow => write!(f, "cannot render in current context"),
            RenderStatus::Error(code) => write!(f, "error {code}"),
        }
    }
}

/// Platform renderer driven by the render thread.
pub trait Renderer: Send {
    /// Called before the render thread starts and after every resize.
    fn set_format(&mut self, format: StreamFormat);

    fn start(&mut self) {}

    /// Called on the render thread as it exits.
    fn stop(&mut self) {}

    /// Render `frames` frames. `input` and `output` hold `frames * channels`
    /// interleaved samples.
    fn render(&mut self, input: &[f32], output: &mut [f32], frames: usize) -> RenderStatus;

    fn note_on(&mut self, _pad: usize) {}

    fn note_off(&mut self, _pad: usize) {}
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn set_format(&mut self, format: StreamFormat) {
        (**self).set_format(format)
    }

    fn start(&mut self) {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn render(&mut self, input: &[f32], output: &mut [f32], frames: usize) -> RenderStatus {
        (**self).render(input, output, frames)
    }

    fn note_on(&mut self, pad: usize) {
        (**self).note_on(pad)
    }

    fn note_off(&mut self, pad: usize) {
        (**self).note_off(pad)
    }
}
