//! Settings file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use elastico_core::{
    DEFAULT_MAX_RESAMPLING_FACTOR, ElasticDelayBuffer, FractionalResampler, samples_to_ms,
};

use crate::error::ConfigError;

/// Sizing and control settings for an [`ElasticDelayBuffer`].
///
/// Every field has a default, so a settings file only needs the values it
/// changes.
///
/// # TOML Format
///
/// ```toml
/// channels = 2
/// sample_rate = 48000
/// capacity = 4096
/// block_size = 256
/// target_delay = 512
/// max_resampling_factor = 8.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElasticSettings {
    /// Number of audio channels.
    pub channels: usize,

    /// Sample rate in Hz.
    pub sample_rate: u32,

    /// Ring capacity in samples per channel.
    pub capacity: usize,

    /// Samples per producer/consumer callback.
    pub block_size: usize,

    /// Delay the consumer asks for, in samples.
    pub target_delay: usize,

    /// Upper clamp on the resampling factor.
    pub max_resampling_factor: f64,
}

impl Default for ElasticSettings {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            capacity: 4096,
            block_size: 256,
            target_delay: 512,
            max_resampling_factor: DEFAULT_MAX_RESAMPLING_FACTOR,
        }
    }
}

impl ElasticSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the channel count.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the ring capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the callback block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the target delay.
    pub fn with_target_delay(mut self, target_delay: usize) -> Self {
        self.target_delay = target_delay;
        self
    }

    /// Set the maximum resampling factor.
    pub fn with_max_resampling_factor(mut self, factor: f64) -> Self {
        self.max_resampling_factor = factor;
        self
    }

    /// Target delay in milliseconds at the configured sample rate.
    pub fn target_delay_ms(&self) -> f32 {
        samples_to_ms(self.target_delay, self.sample_rate as f32)
    }

    /// Check that the settings describe a usable buffer.
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 {
            return Err(ConfigError::invalid("channels", "must be at least 1"));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be positive"));
        }
        if self.block_size == 0 {
            return Err(ConfigError::invalid("block_size", "must be at least 1"));
        }
        if self.capacity <= self.block_size {
            return Err(ConfigError::invalid(
                "capacity",
                format!("must exceed block_size ({})", self.block_size),
            ));
        }
        if self.target_delay >= self.capacity {
            return Err(ConfigError::invalid(
                "target_delay",
                format!("must be below capacity ({})", self.capacity),
            ));
        }
        if !self.max_resampling_factor.is_finite() || self.max_resampling_factor < 1.0 {
            return Err(ConfigError::invalid(
                "max_resampling_factor",
                format!("must be finite and >= 1.0, got {}", self.max_resampling_factor),
            ));
        }
        Ok(())
    }

    /// Size and configure `buffer` from these settings.
    ///
    /// Validates first. On success the buffer has the configured shape and
    /// clamp, and its read cursor sits `target_delay` samples behind the write
    /// cursor.
    pub fn apply_to<R: FractionalResampler + Default>(
        &self,
        buffer: &mut ElasticDelayBuffer<R>,
    ) -> Result<(), ConfigError> {
        self.validate()?;
        buffer.set_size(self.channels, self.capacity, f64::from(self.sample_rate));
        buffer.set_max_resampling_factor(self.max_resampling_factor);
        buffer.set_num_samples_delay(self.target_delay);
        Ok(())
    }

    /// Build a new buffer configured from these settings.
    pub fn build<R: FractionalResampler + Default>(
        &self,
    ) -> Result<ElasticDelayBuffer<R>, ConfigError> {
        let mut buffer = ElasticDelayBuffer::new();
        self.apply_to(&mut buffer)?;
        Ok(buffer)
    }

    /// Load settings from a TOML file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML string. Does not validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
