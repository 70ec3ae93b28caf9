//! Owned multichannel sample storage.
//!
//! [`AudioBuffer`] holds one contiguous `Vec<f32>` per channel. It is the ring
//! storage inside [`ElasticDelayBuffer`](crate::ElasticDelayBuffer) and a
//! convenient block type for producers and consumers: push and pull accept any
//! `&[impl AsRef<[f32]>]`, so `buffer.channels()` can be passed directly.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Multichannel audio buffer with one contiguous slice per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl AudioBuffer {
    /// Creates a zeroed buffer with `num_channels` channels of `num_samples` each.
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            num_samples,
        }
    }

    /// Resizes to the given shape and zeroes every sample.
    ///
    /// Reuses existing allocations where the capacity allows. Not real-time safe.
    pub fn set_size(&mut self, num_channels: usize, num_samples: usize) {
        self.channels.resize_with(num_channels, Vec::new);
        for channel in &mut self.channels {
            channel.clear();
            channel.resize(num_samples, 0.0);
        }
        self.num_samples = num_samples;
    }

    /// Returns the number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Returns true if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.num_samples == 0
    }

    /// Returns the samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= num_channels()`.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    /// Returns the samples of one channel mutably.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= num_channels()`.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    /// Returns all channels.
    #[inline]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Returns all channels mutably. Channel lengths must not be changed.
    #[inline]
    pub fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    /// Fills every channel with zeros.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Overwrites `src.len()` samples of `dest_channel` starting at `dest_start`,
    /// scaled by `gain`.
    #[inline]
    pub fn copy_from(&mut self, dest_channel: usize, dest_start: usize, src: &[f32], gain: f32) {
        let dest = &mut self.channels[dest_channel][dest_start..dest_start + src.len()];
        if gain == 1.0 {
            dest.copy_from_slice(src);
        } else {
            for (d, s) in dest.iter_mut().zip(src) {
                *d = *s * gain;
            }
        }
    }

    /// Mixes `src` into `dest_channel` starting at `dest_start`, scaled by `gain`.
    #[inline]
    pub fn add_from(&mut self, dest_channel: usize, dest_start: usize, src: &[f32], gain: f32) {
        let dest = &mut self.channels[dest_channel][dest_start..dest_start + src.len()];
        for (d, s) in dest.iter_mut().zip(src) {
            *d += *s * gain;
        }
    }
}
