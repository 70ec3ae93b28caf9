//! Level and time conversions for feeding and reporting on the buffer.
//!
//! `db_to_linear` turns a producer gain in dB into the `gain` argument of
//! [`push_block`](crate::ElasticDelayBuffer::push_block); the time helpers
//! convert delays between samples and milliseconds.

use libm::{log10f, powf, roundf};

/// Level reported for silence, in dB.
pub const SILENCE_DB: f32 = -120.0;

/// Decibels to linear amplitude.
///
/// ```rust
/// use elastico_core::db_to_linear;
///
/// assert_eq!(db_to_linear(0.0), 1.0);
/// assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    powf(10.0, db / 20.0)
}

/// Linear amplitude to decibels, bottoming out at [`SILENCE_DB`].
#[inline]
pub fn linear_to_db(amplitude: f32) -> f32 {
    let amplitude = amplitude.abs();
    if amplitude <= db_to_linear(SILENCE_DB) {
        SILENCE_DB
    } else {
        20.0 * log10f(amplitude)
    }
}

/// Milliseconds to the nearest whole sample count; 0 for negative times or a
/// non-positive sample rate.
///
/// ```rust
/// use elastico_core::ms_to_samples;
///
/// assert_eq!(ms_to_samples(10.0, 48000.0), 480);
/// ```
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> usize {
    if ms <= 0.0 || sample_rate <= 0.0 {
        return 0;
    }
    roundf(ms * 0.001 * sample_rate) as usize
}

/// Sample count to milliseconds; 0 for a non-positive sample rate.
#[inline]
pub fn samples_to_ms(samples: usize, sample_rate: f32) -> f32 {
    if sample_rate <= 0.0 {
        return 0.0;
    }
    samples as f32 * 1000.0 / sample_rate
}
