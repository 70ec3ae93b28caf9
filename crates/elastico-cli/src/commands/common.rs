//! Shared CLI helpers used across multiple commands.

use crate::drift::DriftStats;
use anyhow::Context;
use clap::{Args, ValueEnum};
use elastico_config::ElasticSettings;
use elastico_core::{db_to_linear, linear_to_db, ms_to_samples, samples_to_ms};
use std::path::PathBuf;

/// Resampling kernel selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Interpolation {
    /// 2-point linear
    Linear,
    /// 5-point Lagrange
    #[default]
    Lagrange,
}

/// Buffer options shared by `simulate` and `process`.
///
/// Values given on the command line override the settings file, which
/// overrides the defaults.
#[derive(Args, Debug, Default)]
pub struct BufferArgs {
    /// Settings file (TOML)
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Ring capacity in samples
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Samples per producer/consumer block
    #[arg(short, long)]
    pub block_size: Option<usize>,

    /// Target delay in samples
    #[arg(short, long)]
    pub target: Option<usize>,

    /// Target delay in milliseconds
    #[arg(long, conflicts_with = "target")]
    pub target_ms: Option<f32>,

    /// Upper clamp on the resampling factor
    #[arg(long)]
    pub max_factor: Option<f64>,

    /// Producer clock offset from the consumer, in parts per million
    #[arg(long, default_value = "100.0", allow_hyphen_values = true)]
    pub drift_ppm: f64,

    /// Gain applied to the producer's blocks, in dB
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pub gain_db: f32,

    /// Resampling kernel
    #[arg(long, value_enum, default_value_t = Interpolation::Lagrange)]
    pub interpolation: Interpolation,
}

impl BufferArgs {
    /// Merge the settings file and overrides, then validate.
    pub fn resolve(&self) -> anyhow::Result<ElasticSettings> {
        self.resolve_with(None, None)
    }

    /// Like [`resolve`](Self::resolve), with the stream format forced.
    ///
    /// `--target-ms` is converted at the final sample rate.
    pub fn resolve_with(
        &self,
        channels: Option<usize>,
        sample_rate: Option<u32>,
    ) -> anyhow::Result<ElasticSettings> {
        let mut settings = match &self.settings {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                ElasticSettings::from_toml(&content)?
            }
            None => ElasticSettings::default(),
        };

        if let Some(capacity) = self.capacity {
            settings.capacity = capacity;
        }
        if let Some(block_size) = self.block_size {
            settings.block_size = block_size;
        }
        if let Some(target) = self.target {
            settings.target_delay = target;
        }
        if let Some(factor) = self.max_factor {
            settings.max_resampling_factor = factor;
        }
        if let Some(channels) = channels {
            settings.channels = channels;
        }
        if let Some(sample_rate) = sample_rate {
            settings.sample_rate = sample_rate;
        }
        if let Some(ms) = self.target_ms {
            settings.target_delay = ms_to_samples(ms, settings.sample_rate as f32);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Linear producer gain from `--gain-db`.
    pub fn input_gain(&self) -> f32 {
        db_to_linear(self.gain_db)
    }
}

/// Print the delay and factor summary of a finished run.
pub fn print_stats(stats: &DriftStats, settings: &ElasticSettings) {
    let sr = settings.sample_rate as f32;
    println!("\nStats:");
    println!("  Cycles:  {} pulls, {} pushes", stats.cycles, stats.pushes);
    println!(
        "  Target:  {} samples ({:.2} ms)",
        settings.target_delay,
        settings.target_delay_ms()
    );
    println!(
        "  Delay:   final {} ({:.2} ms), min {}, max {}",
        stats.final_delay,
        samples_to_ms(stats.final_delay, sr),
        stats.min_delay,
        stats.max_delay
    );
    println!(
        "  Factor:  final {:.6}, mean {:.6}, min {:.6}, max {:.6}",
        stats.final_factor,
        stats.mean_factor(),
        stats.min_factor,
        stats.max_factor
    );
    println!(
        "  Level:   output peak {:.1} dB",
        linear_to_db(stats.output_peak)
    );
}
