//! Elastico Core - drift-absorbing elastic audio delay buffer
//!
//! This crate provides a multichannel ring buffer that accepts audio blocks at
//! one clock rate and emits them at another, continuously resampling its reads
//! so that the write/read gap settles on a requested delay. Typical uses are
//! bridging two audio devices that run on independent clocks, or feeding a
//! consumer whose desired delay changes over time.
//!
//! # Core Abstractions
//!
//! - [`ElasticDelayBuffer`] - Ring storage, cursors and the drift control law
//! - [`DelayProbe`] - Lock-free readout of the current delay for other threads
//! - [`FractionalResampler`] - Per-channel resampling capability over a [`RingView`]
//! - [`LagrangeInterpolator`] - 5-point Lagrange resampler (default)
//! - [`LinearInterpolator`] - 2-point linear resampler
//! - [`AudioBuffer`] - Owned multichannel block storage
//!
//! ## Utilities
//!
//! - Control law: [`resampling_factor`], [`circular_distance`]
//! - Conversions: [`db_to_linear`], [`linear_to_db`], [`ms_to_samples`], [`samples_to_ms`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default `std`
//! feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! elastico-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use elastico_core::{AudioBuffer, ElasticDelayBuffer};
//!
//! let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
//! elastic.set_size(2, 4096, 48000.0);
//! elastic.set_max_resampling_factor(1.5);
//!
//! let probe = elastic.delay_probe(); // hand this to the UI thread
//!
//! let input = AudioBuffer::new(2, 256);
//! let mut output = AudioBuffer::new(2, 256);
//!
//! // Producer callback
//! elastic.push_block(input.channels(), 256, 1.0);
//! // Consumer callback, asking for 512 samples of delay
//! elastic.pull_block(output.channels_mut(), 256, 512);
//!
//! assert_eq!(probe.samples(), elastic.actual_delay());
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: push and pull never allocate, lock or block
//! - **No dependencies on std**: Pure `no_std` with `libm` for math
//! - **Preconditions are debug assertions**: block sizes and channel counts
//!   are checked in debug builds and trusted in release builds

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod buffer;
pub mod elastic;
pub mod interpolator;
pub mod math;

// Re-export main types at crate root
pub use buffer::AudioBuffer;
pub use elastic::{
    CORRECTION_DIVISOR, DEFAULT_MAX_RESAMPLING_FACTOR, DelayProbe, ElasticDelayBuffer,
    MIN_RESAMPLING_FACTOR, circular_distance, resampling_factor,
};
pub use interpolator::{FractionalResampler, LagrangeInterpolator, LinearInterpolator, RingView};
pub use math::{SILENCE_DB, db_to_linear, linear_to_db, ms_to_samples, samples_to_ms};
