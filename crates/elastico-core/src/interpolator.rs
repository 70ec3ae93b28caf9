//! Fractional resamplers that read from a circular source.
//!
//! A [`FractionalResampler`] turns a resampling factor and a read position in a
//! ring into a block of output samples, reporting how many source samples it
//! consumed. The elastic buffer owns one instance per channel and advances its
//! read cursor by that count.
//!
//! # Drive loop
//!
//! Both kernels share the same state machine: a short history of the most
//! recently consumed source samples plus a fractional phase in `[0, 1)`.
//! For every output sample:
//!
//! 1. While the phase is `>= 1`, shift the next source sample into the
//!    history and subtract 1 from the phase.
//! 2. Evaluate the kernel at the fractional phase.
//! 3. Add the resampling factor to the phase.
//!
//! After [`reset`](FractionalResampler::reset) the history is silent and the
//! phase is exactly 1, so a factor of 1.0 consumes one source sample per
//! output sample and reproduces the source delayed by
//! [`latency_samples`](FractionalResampler::latency_samples).
//!
//! | Kernel | Points | Latency | Character |
//! |--------|--------|---------|-----------|
//! | [`LinearInterpolator`] | 2 | 1 | Cheap, slight HF loss at fractional phases |
//! | [`LagrangeInterpolator`] | 5 | 2 | 4th-order polynomial, the default |

/// Read-only circular view of one channel of ring storage.
///
/// Offset 0 is the sample at `start`. Offsets past the end of the storage wrap
/// back to index 0.
#[derive(Debug, Clone, Copy)]
pub struct RingView<'a> {
    samples: &'a [f32],
    start: usize,
}

impl<'a> RingView<'a> {
    /// Creates a view of `samples` beginning at index `start`.
    pub fn new(samples: &'a [f32], start: usize) -> Self {
        debug_assert!(start < samples.len() || samples.is_empty());
        Self { samples, start }
    }

    /// Total ring capacity in samples.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples readable before the view wraps to index 0.
    #[inline]
    pub fn contiguous(&self) -> usize {
        self.samples.len() - self.start
    }

    /// Returns the sample `offset` positions after the view start.
    #[inline]
    pub fn sample(&self, offset: usize) -> f32 {
        let contiguous = self.contiguous();
        if offset < contiguous {
            self.samples[self.start + offset]
        } else {
            self.samples[(offset - contiguous) % self.samples.len()]
        }
    }
}

/// Per-channel fractional resampling capability driven by the elastic buffer.
pub trait FractionalResampler {
    /// Fills all of `output` by reading `source` at `factor` source samples per
    /// output sample. Returns the number of source samples consumed.
    ///
    /// Must tolerate reading past [`RingView::contiguous`]; the view wraps.
    fn process(&mut self, factor: f64, source: RingView<'_>, output: &mut [f32]) -> usize;

    /// Discards history and phase. The next call starts from silence.
    fn reset(&mut self);

    /// Delay in samples between consuming a source sample and emitting it at
    /// a factor of 1.0.
    fn latency_samples(&self) -> usize;
}

/// Shared drive loop; `history[0]` is the newest consumed sample.
#[inline]
fn drive<const N: usize>(
    history: &mut [f32; N],
    phase: &mut f64,
    factor: f64,
    source: RingView<'_>,
    output: &mut [f32],
    kernel: impl Fn(&[f32; N], f32) -> f32,
) -> usize {
    debug_assert!(factor > 0.0, "resampling factor must be positive");

    let mut pos = *phase;
    let mut used = 0;

    for out in output.iter_mut() {
        while pos >= 1.0 {
            history.copy_within(0..N - 1, 1);
            history[0] = source.sample(used);
            used += 1;
            pos -= 1.0;
        }
        *out = kernel(history, pos as f32);
        pos += factor;
    }

    *phase = pos;
    used
}

/// Two-point linear interpolator.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    history: [f32; 2],
    phase: f64,
}

impl LinearInterpolator {
    /// Creates an interpolator in its reset state.
    pub fn new() -> Self {
        Self {
            history: [0.0; 2],
            phase: 1.0,
        }
    }
}

impl Default for LinearInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl FractionalResampler for LinearInterpolator {
    fn process(&mut self, factor: f64, source: RingView<'_>, output: &mut [f32]) -> usize {
        drive(
            &mut self.history,
            &mut self.phase,
            factor,
            source,
            output,
            |h, t| h[1] + (h[0] - h[1]) * t,
        )
    }

    fn reset(&mut self) {
        self.history = [0.0; 2];
        self.phase = 1.0;
    }

    fn latency_samples(&self) -> usize {
        1
    }
}

/// Nodes of the 5-point kernel, matching `history[0..5]` (newest first).
const LAGRANGE_NODES: [f32; 5] = [2.0, 1.0, 0.0, -1.0, -2.0];

/// Evaluates the Lagrange polynomial through the five history points at `t`.
///
/// The evaluation point lies between the nodes at 0 and 1, so the output
/// trails the newest sample by two samples. At `t == 0` the result is exactly
/// `history[2]`.
#[inline]
fn lagrange5(history: &[f32; 5], t: f32) -> f32 {
    let mut acc = 0.0;
    for (j, &y) in history.iter().enumerate() {
        let xj = LAGRANGE_NODES[j];
        let mut weight = 1.0;
        for (m, &xm) in LAGRANGE_NODES.iter().enumerate() {
            if m != j {
                weight *= (t - xm) / (xj - xm);
            }
        }
        acc += weight * y;
    }
    acc
}

/// Five-point (4th-order) Lagrange interpolator.
///
/// The default resampler for [`ElasticDelayBuffer`](crate::ElasticDelayBuffer).
///
/// ```rust
/// use elastico_core::{FractionalResampler, LagrangeInterpolator, RingView};
///
/// let ring: Vec<f32> = (0..16).map(|i| i as f32).collect();
/// let mut interp = LagrangeInterpolator::new();
/// let mut out = [0.0; 8];
///
/// let used = interp.process(1.0, RingView::new(&ring, 4), &mut out);
/// assert_eq!(used, 8);
/// // Two samples of latency from the fresh (silent) history.
/// assert_eq!(out, [0.0, 0.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
/// ```
#[derive(Debug, Clone)]
pub struct LagrangeInterpolator {
    history: [f32; 5],
    phase: f64,
}

impl LagrangeInterpolator {
    /// Creates an interpolator in its reset state.
    pub fn new() -> Self {
        Self {
            history: [0.0; 5],
            phase: 1.0,
        }
    }
}

impl Default for LagrangeInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl FractionalResampler for LagrangeInterpolator {
    fn process(&mut self, factor: f64, source: RingView<'_>, output: &mut [f32]) -> usize {
        drive(
            &mut self.history,
            &mut self.phase,
            factor,
            source,
            output,
            lagrange5,
        )
    }

    fn reset(&mut self) {
        self.history = [0.0; 5];
        self.phase = 1.0;
    }

    fn latency_samples(&self) -> usize {
        2
    }
}
