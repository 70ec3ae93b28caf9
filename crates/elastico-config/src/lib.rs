//! Settings management for elastico delay buffers.
//!
//! [`ElasticSettings`] describes the shape and control limits of an
//! [`ElasticDelayBuffer`](elastico_core::ElasticDelayBuffer) and round-trips
//! through TOML files.
//!
//! # Example
//!
//! ```rust,no_run
//! use elastico_config::ElasticSettings;
//! use elastico_core::ElasticDelayBuffer;
//!
//! let settings = ElasticSettings::load("bridge.toml").unwrap();
//!
//! let mut elastic: ElasticDelayBuffer = ElasticDelayBuffer::new();
//! settings.apply_to(&mut elastic).unwrap();
//!
//! settings.with_target_delay(1024).save("bridge.toml").unwrap();
//! ```

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::ElasticSettings;
