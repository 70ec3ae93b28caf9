//! Elastic delay buffer: a multichannel ring that absorbs clock drift.
//!
//! A producer pushes fixed-size blocks at its own rate; a consumer pulls
//! fixed-size blocks at another, slightly different rate and names the delay
//! it wants. On every pull the buffer compares the observed write/read gap with
//! that target and picks a resampling factor for the per-channel
//! [`FractionalResampler`]s, so the gap converges without dropping or repeating
//! samples.
//!
//! # Control law
//!
//! ```text
//! difference = (current_delay - num_samples) - target_delay
//! factor     = 1 + difference / (num_samples * 8)
//! factor     = clamp(factor, 0.0001, max_resampling_factor)
//! ```
//!
//! A buffer that is fuller than requested reads faster than real time
//! (`factor > 1`), an emptier one reads slower. With a producer keeping pace,
//! the remaining error shrinks by 1/8 per pull.
//!
//! # Threading
//!
//! Push and pull take `&mut self` and never allocate or block. The only state
//! meant for other threads is the current delay, published through an atomic
//! word; clone a [`DelayProbe`] from [`ElasticDelayBuffer::delay_probe`] to poll
//! it from a UI thread.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::buffer::AudioBuffer;
use crate::interpolator::{FractionalResampler, LagrangeInterpolator, RingView};

/// Lower bound of the resampling factor. Zero would stall consumption.
pub const MIN_RESAMPLING_FACTOR: f64 = 0.0001;

/// Default upper bound of the resampling factor.
pub const DEFAULT_MAX_RESAMPLING_FACTOR: f64 = 8.0;

/// Blocks of error spread over by one correction step.
pub const CORRECTION_DIVISOR: f64 = 8.0;

/// Forward distance from `read` to `write` on a ring of `capacity` samples.
///
/// ```rust
/// use elastico_core::circular_distance;
///
/// assert_eq!(circular_distance(10, 50, 64), 40);
/// assert_eq!(circular_distance(50, 10, 64), 24);
/// assert_eq!(circular_distance(7, 7, 64), 0);
/// ```
#[inline]
pub fn circular_distance(read: usize, write: usize, capacity: usize) -> usize {
    if write >= read {
        write - read
    } else {
        write + capacity - read
    }
}

/// Resampling factor that steers `current_delay` toward `target_delay`.
///
/// Exactly 1.0 when `current_delay - num_samples == target_delay`. The result
/// is clamped to `[MIN_RESAMPLING_FACTOR, max_factor]`, lower bound first, so a
/// `max_factor` below the minimum wins. An empty block yields 1.0.
///
/// ```rust
/// use elastico_core::resampling_factor;
///
/// assert_eq!(resampling_factor(512, 256, 256, 8.0), 1.0);
/// assert_eq!(resampling_factor(768, 256, 256, 8.0), 1.125);
/// assert_eq!(resampling_factor(1_000_000, 256, 0, 2.0), 2.0);
/// ```
#[inline]
pub fn resampling_factor(
    current_delay: usize,
    num_samples: usize,
    target_delay: usize,
    max_factor: f64,
) -> f64 {
    if num_samples == 0 {
        return 1.0;
    }
    let difference = (current_delay as f64 - num_samples as f64) - target_delay as f64;
    let mut factor = 1.0 + difference / (num_samples as f64 * CORRECTION_DIVISOR);
    if factor < MIN_RESAMPLING_FACTOR {
        factor = MIN_RESAMPLING_FACTOR;
    }
    if factor > max_factor {
        factor = max_factor;
    }
    factor
}

/// Lock-free readout of an [`ElasticDelayBuffer`]'s current delay.
///
/// Cheap to clone and safe to poll from any thread while the audio thread
/// keeps pushing and pulling.
#[derive(Debug, Clone)]
pub struct DelayProbe {
    samples: Arc<AtomicUsize>,
}

impl DelayProbe {
    /// Current write/read gap in samples, as of the last push, pull or resize.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::Relaxed)
    }
}

/// Multichannel ring buffer with drift-correcting resampled reads.
///
/// # Example
///
/// ```rust
/// use elastico_core::{AudioBuffer, ElasticDelayBuffer};
///
/// let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
/// elastic.set_size(2, 1024, 48000.0);
///
/// let input = AudioBuffer::new(2, 256);
/// let mut output = AudioBuffer::new(2, 256);
///
/// for _ in 0..8 {
///     elastic.push_block(input.channels(), 256, 1.0);
///     elastic.pull_block(output.channels_mut(), 256, 256);
/// }
/// assert!(elastic.actual_delay() < elastic.capacity());
/// ```
#[derive(Debug)]
pub struct ElasticDelayBuffer<R = LagrangeInterpolator> {
    buffer: AudioBuffer,
    resamplers: Vec<R>,
    write_position: usize,
    read_position: usize,
    num_delay_samples: Arc<AtomicUsize>,
    max_resampling_factor: f64,
    last_resampling_factor: f64,
    sample_rate: f64,
}

impl<R: FractionalResampler + Default> Default for ElasticDelayBuffer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FractionalResampler + Default> ElasticDelayBuffer<R> {
    /// Creates an empty buffer. Call [`set_size`](Self::set_size) before use.
    pub fn new() -> Self {
        Self {
            buffer: AudioBuffer::default(),
            resamplers: Vec::new(),
            write_position: 0,
            read_position: 0,
            num_delay_samples: Arc::new(AtomicUsize::new(0)),
            max_resampling_factor: DEFAULT_MAX_RESAMPLING_FACTOR,
            last_resampling_factor: 1.0,
            sample_rate: 0.0,
        }
    }

    /// Allocates ring storage and one resampler per channel.
    ///
    /// A new shape zeroes the ring; the same shape keeps its contents. Cursors
    /// inside the capacity are kept; a cursor that would fall outside moves
    /// to 0 and every resampler is reset. Allocates, so call it while audio
    /// processing is stopped.
    pub fn set_size(&mut self, num_channels: usize, capacity: usize, sample_rate: f64) {
        if num_channels != self.num_channels() || capacity != self.capacity() {
            self.buffer.set_size(num_channels, capacity);
        }
        self.resamplers.resize_with(num_channels, R::default);
        self.sample_rate = sample_rate;

        if self.write_position >= capacity || self.read_position >= capacity {
            self.write_position = 0;
            self.read_position = 0;
            self.buffer.clear();
            self.reset();
        }

        self.update_actual_delay();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            channels = num_channels,
            capacity,
            sample_rate,
            write = self.write_position,
            read = self.read_position,
            "elastic_resize"
        );
    }

    /// Moves the read cursor exactly `delay` samples behind the write cursor.
    ///
    /// This is a deliberate jump, so all resampler history is discarded.
    /// `delay` must be smaller than the capacity; release builds reduce it
    /// modulo the capacity instead of checking.
    pub fn set_num_samples_delay(&mut self, delay: usize) {
        let capacity = self.capacity();
        debug_assert!(
            delay < capacity,
            "delay {delay} must be smaller than capacity {capacity}"
        );
        if capacity == 0 {
            return;
        }

        let delay = delay % capacity;
        self.read_position = if delay > self.write_position {
            self.write_position + capacity - delay
        } else {
            self.write_position - delay
        };
        self.reset();
        self.update_actual_delay();

        #[cfg(feature = "tracing")]
        tracing::debug!(delay, read = self.read_position, "elastic_retarget");
    }

    /// Sets the upper bound of the resampling factor.
    ///
    /// Values below 1.0 forbid reading faster than real time.
    pub fn set_max_resampling_factor(&mut self, factor: f64) {
        self.max_resampling_factor = factor;

        #[cfg(feature = "tracing")]
        tracing::debug!(factor, "elastic_max_factor");
    }

    /// Returns the upper bound of the resampling factor.
    pub fn max_resampling_factor(&self) -> f64 {
        self.max_resampling_factor
    }

    /// Discards the history of every channel's resampler.
    pub fn reset(&mut self) {
        for resampler in &mut self.resamplers {
            resampler.reset();
        }
    }

    /// Writes `num_samples` per channel at the write cursor, scaled by `gain`.
    ///
    /// Requires `capacity() > num_samples` and one input slice per channel.
    pub fn push_block<S: AsRef<[f32]>>(&mut self, input: &[S], num_samples: usize, gain: f32) {
        let capacity = self.capacity();
        debug_assert!(
            capacity > num_samples,
            "capacity {capacity} must exceed pushed block of {num_samples}"
        );
        debug_assert_eq!(
            self.num_channels(),
            input.len(),
            "pushed block channel count mismatch"
        );
        if self.buffer.is_empty() {
            return;
        }

        let first = num_samples.min(capacity - self.write_position);
        let second = num_samples - first;
        let num_channels = self.num_channels();

        for (channel, src) in input.iter().enumerate().take(num_channels) {
            let src = &src.as_ref()[..num_samples];
            self.buffer
                .copy_from(channel, self.write_position, &src[..first], gain);
            if second > 0 {
                self.buffer.copy_from(channel, 0, &src[first..], gain);
            }
        }

        self.write_position = (self.write_position + num_samples) % capacity;
        self.update_actual_delay();
    }

    /// Mixes `num_samples` per channel into the window that ends at the write
    /// cursor, scaled by `gain`. The write cursor does not move.
    ///
    /// Meant for layering a second source onto the block just written by
    /// [`push_block`](Self::push_block) with the same `num_samples`.
    pub fn add_to_pushed_block<S: AsRef<[f32]>>(
        &mut self,
        input: &[S],
        num_samples: usize,
        gain: f32,
    ) {
        let capacity = self.capacity();
        debug_assert!(
            capacity > num_samples,
            "capacity {capacity} must exceed pushed block of {num_samples}"
        );
        debug_assert_eq!(
            self.num_channels(),
            input.len(),
            "pushed block channel count mismatch"
        );
        if self.buffer.is_empty() {
            return;
        }

        let start = (self.write_position + capacity - num_samples % capacity) % capacity;
        let first = num_samples.min(capacity - start);
        let second = num_samples - first;
        let num_channels = self.num_channels();

        for (channel, src) in input.iter().enumerate().take(num_channels) {
            let src = &src.as_ref()[..num_samples];
            self.buffer.add_from(channel, start, &src[..first], gain);
            if second > 0 {
                self.buffer.add_from(channel, 0, &src[first..], gain);
            }
        }
    }

    /// Produces `num_samples` per channel while steering the delay toward
    /// `target_delay` samples.
    ///
    /// Requires `capacity() > num_samples` and one output slice per channel.
    /// The read cursor advances by however many source samples the
    /// resamplers consumed.
    pub fn pull_block<S: AsMut<[f32]>>(
        &mut self,
        output: &mut [S],
        num_samples: usize,
        target_delay: usize,
    ) {
        let capacity = self.capacity();
        debug_assert!(
            capacity > num_samples,
            "capacity {capacity} must exceed pulled block of {num_samples}"
        );
        debug_assert_eq!(
            self.num_channels(),
            output.len(),
            "pulled block channel count mismatch"
        );
        debug_assert_eq!(self.num_channels(), self.resamplers.len());
        if self.buffer.is_empty() || num_samples == 0 {
            return;
        }

        let current_delay = circular_distance(self.read_position, self.write_position, capacity);
        let factor = resampling_factor(
            current_delay,
            num_samples,
            target_delay,
            self.max_resampling_factor,
        );
        self.last_resampling_factor = factor;

        let start = self.read_position;
        let mut used = 0;
        for ((out, resampler), ring) in output
            .iter_mut()
            .zip(self.resamplers.iter_mut())
            .zip(self.buffer.channels())
        {
            used = resampler.process(
                factor,
                RingView::new(ring, start),
                &mut out.as_mut()[..num_samples],
            );
        }

        self.read_position = (self.read_position + used) % capacity;
        self.update_actual_delay();
    }

    fn update_actual_delay(&self) {
        let delay = circular_distance(self.read_position, self.write_position, self.capacity());
        self.num_delay_samples.store(delay, Ordering::Relaxed);
    }

    /// Current write/read gap in samples.
    #[inline]
    pub fn actual_delay(&self) -> usize {
        self.num_delay_samples.load(Ordering::Relaxed)
    }

    /// Current write/read gap in seconds, or 0 before a sample rate is known.
    pub fn actual_delay_seconds(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.actual_delay() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Returns a handle for reading the current delay from another thread.
    pub fn delay_probe(&self) -> DelayProbe {
        DelayProbe {
            samples: Arc::clone(&self.num_delay_samples),
        }
    }

    /// Resampling factor chosen by the most recent pull (1.0 before any pull).
    pub fn last_resampling_factor(&self) -> f64 {
        self.last_resampling_factor
    }

    /// Interpolation latency of the resamplers in samples.
    pub fn latency_samples(&self) -> usize {
        self.resamplers.first().map_or(0, R::latency_samples)
    }

    /// Ring capacity in samples per channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.num_samples()
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.buffer.num_channels()
    }

    /// Sample rate given to the last [`set_size`](Self::set_size).
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Index of the next slot to be written.
    pub fn write_position(&self) -> usize {
        self.write_position
    }

    /// Index of the next slot to be read.
    pub fn read_position(&self) -> usize {
        self.read_position
    }

    /// Raw ring storage of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= num_channels()`.
    pub fn ring(&self, channel: usize) -> &[f32] {
        self.buffer.channel(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolator::LinearInterpolator;

    fn ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32).collect()
    }

    #[test]
    fn test_new_is_empty() {
        let elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        assert_eq!(elastic.capacity(), 0);
        assert_eq!(elastic.num_channels(), 0);
        assert_eq!(elastic.actual_delay(), 0);
        assert_eq!(elastic.max_resampling_factor(), DEFAULT_MAX_RESAMPLING_FACTOR);
        assert_eq!(elastic.last_resampling_factor(), 1.0);
        assert_eq!(elastic.latency_samples(), 0);
    }

    #[test]
    fn test_set_size_shapes_ring_and_resamplers() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(3, 512, 44100.0);
        assert_eq!(elastic.num_channels(), 3);
        assert_eq!(elastic.capacity(), 512);
        assert_eq!(elastic.resamplers.len(), 3);
        assert_eq!(elastic.sample_rate(), 44100.0);
        assert_eq!(elastic.latency_samples(), 2);

        elastic.set_size(1, 512, 44100.0);
        assert_eq!(elastic.resamplers.len(), 1);
    }

    #[test]
    fn test_set_size_keeps_cursor_that_still_fits() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 256, 48000.0);
        elastic.push_block(&[ramp(0, 100)], 100, 1.0);
        assert_eq!(elastic.write_position(), 100);

        elastic.set_size(1, 512, 48000.0);
        assert_eq!(elastic.write_position(), 100);
        assert_eq!(elastic.actual_delay(), 100);
    }

    #[test]
    fn test_set_size_same_shape_keeps_contents() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 1024, 48000.0);
        elastic.push_block(&[ramp(1, 512)], 512, 1.0);
        elastic.set_num_samples_delay(512);

        elastic.set_size(1, 1024, 44100.0);
        assert_eq!(elastic.write_position(), 512);
        assert_eq!(elastic.read_position(), 0);
        assert_eq!(elastic.actual_delay(), 512);
        assert_eq!(elastic.sample_rate(), 44100.0);
        assert_eq!(&elastic.ring(0)[..4], &[1.0, 2.0, 3.0, 4.0]);

        let mut out = [vec![0.0; 256]];
        elastic.pull_block(&mut out, 256, 256);
        assert_eq!(elastic.last_resampling_factor(), 1.0);
        assert_eq!(&out[0][2..6], &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_shrink_resets_out_of_range_cursor() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(2, 1024, 48000.0);
        let block = [ramp(0, 200), ramp(0, 200)];
        for _ in 0..3 {
            elastic.push_block(&block, 200, 1.0);
        }
        assert_eq!(elastic.write_position(), 600);

        elastic.set_size(2, 512, 48000.0);
        assert_eq!(elastic.write_position(), 0);
        assert_eq!(elastic.read_position(), 0);
        assert_eq!(elastic.actual_delay(), 0);
        assert!(elastic.ring(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_retarget_positions_read_cursor() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 100, 48000.0);
        elastic.push_block(&[ramp(0, 30)], 30, 1.0);

        elastic.set_num_samples_delay(10);
        assert_eq!(elastic.read_position(), 20);
        assert_eq!(elastic.actual_delay(), 10);

        // Wraps below zero.
        elastic.set_num_samples_delay(50);
        assert_eq!(elastic.read_position(), 80);
        assert_eq!(elastic.actual_delay(), 50);
    }

    #[test]
    #[should_panic]
    fn test_retarget_beyond_capacity_panics_in_debug() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 64, 48000.0);
        elastic.set_num_samples_delay(64);
    }

    #[test]
    fn test_push_wraps_with_split_copy() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 10, 48000.0);
        elastic.push_block(&[ramp(0, 7)], 7, 1.0);
        elastic.push_block(&[ramp(7, 6)], 6, 1.0);

        assert_eq!(elastic.write_position(), 3);
        assert_eq!(
            elastic.ring(0),
            &[10.0, 11.0, 12.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn test_push_applies_gain() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(2, 8, 48000.0);
        elastic.push_block(&[[1.0, 2.0], [3.0, 4.0]], 2, 0.5);
        assert_eq!(&elastic.ring(0)[..2], &[0.5, 1.0]);
        assert_eq!(&elastic.ring(1)[..2], &[1.5, 2.0]);
    }

    #[test]
    fn test_add_to_pushed_block_mixes_previous_window() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 8, 48000.0);
        elastic.push_block(&[[1.0; 6]], 6, 1.0);
        elastic.push_block(&[[1.0; 4]], 4, 1.0);
        assert_eq!(elastic.write_position(), 2);

        // The last block occupies 6, 7, 0, 1.
        elastic.add_to_pushed_block(&[[1.0, 2.0, 3.0, 4.0]], 4, 0.5);
        assert_eq!(elastic.write_position(), 2);
        assert_eq!(
            elastic.ring(0),
            &[2.5, 3.0, 1.0, 1.0, 1.0, 1.0, 1.5, 2.0]
        );
    }

    #[test]
    fn test_pull_at_equilibrium_uses_unity_factor() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 1024, 48000.0);
        elastic.push_block(&[ramp(0, 512)], 512, 1.0);
        elastic.set_num_samples_delay(512);

        let mut out = [vec![0.0; 256]];
        elastic.pull_block(&mut out, 256, 256);

        assert_eq!(elastic.last_resampling_factor(), 1.0);
        assert_eq!(elastic.read_position(), 256);
        assert_eq!(elastic.actual_delay(), 256);
        assert_eq!(out[0][..4], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(out[0][255], 253.0);
    }

    #[test]
    fn test_pull_speeds_up_when_too_full() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 2048, 48000.0);
        elastic.push_block(&[vec![0.0; 1024]], 1024, 1.0);
        elastic.set_num_samples_delay(1024);

        let mut out = [vec![0.0; 256]];
        elastic.pull_block(&mut out, 256, 256);
        // difference = 512 -> factor 1.25
        assert_eq!(elastic.last_resampling_factor(), 1.25);
        assert!(elastic.read_position() > 256);
    }

    #[test]
    fn test_pull_slows_down_when_too_empty() {
        let mut elastic: ElasticDelayBuffer<LinearInterpolator> = ElasticDelayBuffer::new();
        elastic.set_size(1, 2048, 48000.0);
        elastic.push_block(&[vec![0.0; 256]], 256, 1.0);
        elastic.set_num_samples_delay(256);

        let mut out = [vec![0.0; 256]];
        elastic.pull_block(&mut out, 256, 256);
        // difference = -256 -> factor 0.875
        assert_eq!(elastic.last_resampling_factor(), 0.875);
        assert!(elastic.read_position() < 256);
        assert_eq!(elastic.latency_samples(), 1);
    }

    #[test]
    fn test_factor_saturates() {
        assert_eq!(resampling_factor(100_000, 64, 0, 4.0), 4.0);
        assert_eq!(resampling_factor(0, 64, 100_000, 4.0), MIN_RESAMPLING_FACTOR);
        assert_eq!(resampling_factor(0, 0, 100, 4.0), 1.0);
        // A bound below the minimum wins.
        assert_eq!(resampling_factor(100_000, 64, 0, 0.00001), 0.00001);
    }

    #[test]
    fn test_shared_delay_tracks_updates() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 128, 48000.0);
        let probe = elastic.delay_probe();
        assert_eq!(probe.samples(), 0);

        elastic.push_block(&[[0.0; 32]], 32, 1.0);
        assert_eq!(probe.samples(), 32);
        assert!((elastic.actual_delay_seconds() - 32.0 / 48000.0).abs() < 1e-12);

        let clone = probe.clone();
        elastic.set_num_samples_delay(5);
        assert_eq!(clone.samples(), 5);
    }

    #[test]
    fn test_resize_to_zero_capacity() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(1, 64, 48000.0);
        elastic.push_block(&[[0.5; 16]], 16, 1.0);

        elastic.set_size(1, 0, 48000.0);
        assert_eq!(elastic.capacity(), 0);
        assert_eq!(elastic.write_position(), 0);
        assert_eq!(elastic.actual_delay(), 0);
    }

    #[test]
    fn test_channelless_buffer_ignores_blocks() {
        let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
        elastic.set_size(0, 64, 48000.0);
        let mut none: [Vec<f32>; 0] = [];

        elastic.push_block(&none, 16, 1.0);
        elastic.add_to_pushed_block(&none, 16, 1.0);
        elastic.pull_block(&mut none, 16, 8);

        assert_eq!(elastic.write_position(), 0);
        assert_eq!(elastic.read_position(), 0);
        assert_eq!(elastic.last_resampling_factor(), 1.0);
    }
}
