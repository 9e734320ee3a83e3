//! Audio signal buffers.
//!
//! The render engine reads and writes these directly as linear float PCM;
//! storage stays in the signal's own sample format.

use crate::compat::{Arc, Mutex, MutexGuard};
use crate::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    S8,
    S16,
    S24,
    S32,
    S64,
    Float,
    Double,
    Complex,
}

/// Complex-valued sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub real: f64,
    pub imag: f64,
}

impl Complex {
    pub const fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }
}

const S8_SCALE: f32 = i8::MAX as f32;
const S16_SCALE: f32 = i16::MAX as f32;
const S24_SCALE: f32 = 8_388_607.0;
const S32_SCALE: f64 = i32::MAX as f64;
const S64_SCALE: f64 = i64::MAX as f64;

/// Typed sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    S8(Vec<i8>),
    S16(Vec<i16>),
    /// 24-bit samples stored in the low bits of an `i32`.
    S24(Vec<i32>),
    S32(Vec<i32>),
    S64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Complex(Vec<Complex>),
}

impl SampleBuffer {
    pub fn new(format: SampleFormat, len: usize) -> Self {
        match format {
            SampleFormat::S8 => SampleBuffer::S8(vec![0; len]),
            SampleFormat::S16 => SampleBuffer::S16(vec![0; len]),
            SampleFormat::S24 => SampleBuffer::S24(vec![0; len]),
            SampleFormat::S32 => SampleBuffer::S32(vec![0; len]),
            SampleFormat::S64 => SampleBuffer::S64(vec![0; len]),
            SampleFormat::Float => SampleBuffer::Float(vec![0.0; len]),
            SampleFormat::Double => SampleBuffer::Double(vec![0.0; len]),
            SampleFormat::Complex => SampleBuffer::Complex(vec![Complex::default(); len]),
        }
    }

    pub fn format(&self) -> SampleFormat {
        match self {
            SampleBuffer::S8(_) => SampleFormat::S8,
            SampleBuffer::S16(_) => SampleFormat::S16,
            SampleBuffer::S24(_) => SampleFormat::S24,
            SampleBuffer::S32(_) => SampleFormat::S32,
            SampleBuffer::S64(_) => SampleFormat::S64,
            SampleBuffer::Float(_) => SampleFormat::Float,
            SampleBuffer::Double(_) => SampleFormat::Double,
            SampleBuffer::Complex(_) => SampleFormat::Complex,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::S8(b) => b.len(),
            SampleBuffer::S16(b) => b.len(),
            SampleBuffer::S24(b) | SampleBuffer::S32(b) => b.len(),
            SampleBuffer::S64(b) => b.len(),
            SampleBuffer::Float(b) => b.len(),
            SampleBuffer::Double(b) => b.len(),
            SampleBuffer::Complex(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            SampleBuffer::S8(b) => b.fill(0),
            SampleBuffer::S16(b) => b.fill(0),
            SampleBuffer::S24(b) | SampleBuffer::S32(b) => b.fill(0),
            SampleBuffer::S64(b) => b.fill(0),
            SampleBuffer::Float(b) => b.fill(0.0),
            SampleBuffer::Double(b) => b.fill(0.0),
            SampleBuffer::Complex(b) => b.fill(Complex::default()),
        }
    }

    /// Convert into normalized f32. Returns the number of samples written.
    pub fn to_f32(&self, out: &mut [f32]) -> usize {
        let n = self.len().min(out.len());
        let out = &mut out[..n];
        match self {
            SampleBuffer::S8(b) => convert(&b[..n], out, |s| s as f32 / S8_SCALE),
            SampleBuffer::S16(b) => convert(&b[..n], out, |s| s as f32 / S16_SCALE),
            SampleBuffer::S24(b) => convert(&b[..n], out, |s| s as f32 / S24_SCALE),
            SampleBuffer::S32(b) => convert(&b[..n], out, |s| (s as f64 / S32_SCALE) as f32),
            SampleBuffer::S64(b) => convert(&b[..n], out, |s| (s as f64 / S64_SCALE) as f32),
            SampleBuffer::Float(b) => out.copy_from_slice(&b[..n]),
            SampleBuffer::Double(b) => convert(&b[..n], out, |s| s as f32),
            SampleBuffer::Complex(b) => convert(&b[..n], out, |s| s.real as f32),
        }
        n
    }

    /// Overwrite from normalized f32, clamping integer formats. Returns the number of samples read.
    pub fn from_f32(&mut self, src: &[f32]) -> usize {
        let n = self.len().min(src.len());
        let src = &src[..n];
        match self {
            SampleBuffer::S8(b) => convert(src, &mut b[..n], |s| {
                (s.clamp(-1.0, 1.0) * S8_SCALE).round() as i8
            }),
            SampleBuffer::S16(b) => convert(src, &mut b[..n], |s| {
                (s.clamp(-1.0, 1.0) * S16_SCALE).round() as i16
            }),
            SampleBuffer::S24(b) => convert(src, &mut b[..n], |s| {
                (s.clamp(-1.0, 1.0) * S24_SCALE).round() as i32
            }),
            SampleBuffer::S32(b) => convert(src, &mut b[..n], |s| {
                (s.clamp(-1.0, 1.0) as f64 * S32_SCALE).round() as i32
            }),
            SampleBuffer::S64(b) => convert(src, &mut b[..n], |s| {
                (s.clamp(-1.0, 1.0) as f64 * S64_SCALE) as i64
            }),
            SampleBuffer::Float(b) => b[..n].copy_from_slice(src),
            SampleBuffer::Double(b) => convert(src, &mut b[..n], |s| s as f64),
            SampleBuffer::Complex(b) => convert(src, &mut b[..n], |s| Complex::new(s as f64, 0.0)),
        }
        n
    }
}

#[inline]
fn convert<S: Copy, D>(src: &[S], dst: &mut [D], f: impl Fn(S) -> D) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = f(s);
    }
}

/// One chunk of audio attached to a recycling.
///
/// Shared via `Arc`; producers and the render thread lock the sample buffer
/// for the duration of a copy.
#[derive(Debug)]
pub struct AudioSignal {
    id: NodeId,
    buffer: Mutex<SampleBuffer>,
}

impl AudioSignal {
    pub fn new(format: SampleFormat, buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            buffer: Mutex::new(SampleBuffer::new(format, buffer_size)),
        })
    }

    pub fn from_samples(samples: &[f32]) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            buffer: Mutex::new(SampleBuffer::Float(samples.to_vec())),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn format(&self) -> SampleFormat {
        self.buffer.lock().format()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn lock(&self) -> MutexGuard<'_, SampleBuffer> {
        self.buffer.lock()
    }

    pub fn read_f32(&self, out: &mut [f32]) -> usize {
        self.buffer.lock().to_f32(out)
    }

    pub fn write_f32(&self, src: &[f32]) -> usize {
        self.buffer.lock().from_f32(src)
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}
