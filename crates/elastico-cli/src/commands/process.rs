//! File processing through a drifting clock bridge.

use super::common::{BufferArgs, Interpolation, print_stats};
use crate::drift::DriftSimulation;
use crate::wav::{WavSpec, read_wav, write_wav};
use clap::Args;
use elastico_config::ElasticSettings;
use elastico_core::{AudioBuffer, FractionalResampler, LagrangeInterpolator, LinearInterpolator};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    buffer: BufferArgs,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    if ![16, 24, 32].contains(&args.bit_depth) {
        anyhow::bail!("unsupported bit depth {} (use 16, 24 or 32)", args.bit_depth);
    }

    println!("Reading {}...", args.input.display());
    let (samples, spec) = read_wav(&args.input)?;
    let frames = samples.first().map_or(0, Vec::len);
    println!(
        "  {} ch, {} frames, {} Hz, {:.2}s",
        spec.channels,
        frames,
        spec.sample_rate,
        frames as f64 / f64::from(spec.sample_rate.max(1))
    );

    let settings = args
        .buffer
        .resolve_with(Some(samples.len()), Some(spec.sample_rate))?;

    let output = match args.buffer.interpolation {
        Interpolation::Lagrange => {
            process_with::<LagrangeInterpolator>(&samples, &settings, &args.buffer)?
        }
        Interpolation::Linear => {
            process_with::<LinearInterpolator>(&samples, &settings, &args.buffer)?
        }
    };

    let out_spec = WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: args.bit_depth,
    };
    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &output, out_spec)?;
    println!("Done!");

    Ok(())
}

/// Feed `input` through the drift simulation and return the consumed signal.
///
/// Runs until the whole file plus the target delay has come out the far side.
fn process_with<R: FractionalResampler + Default>(
    input: &[Vec<f32>],
    settings: &ElasticSettings,
    buffer: &BufferArgs,
) -> anyhow::Result<Vec<Vec<f32>>> {
    let mut sim: DriftSimulation<R> = DriftSimulation::new(settings, buffer.drift_ppm)?;
    sim.set_input_gain(buffer.input_gain());
    let frames = input.first().map_or(0, Vec::len);
    let block = sim.block_size();
    let tail = settings.target_delay + sim.elastic().latency_samples();
    let cycles = (frames + tail).div_ceil(block);

    let pb = ProgressBar::new(cycles as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );
    let probe = sim.delay_probe();

    let mut cursor = 0usize;
    let mut produce = |block: &mut AudioBuffer| {
        for (dest, src) in block.channels_mut().iter_mut().zip(input) {
            for (i, s) in dest.iter_mut().enumerate() {
                *s = src.get(cursor + i).copied().unwrap_or(0.0);
            }
        }
        cursor += block.num_samples();
    };

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(cycles * block); input.len()];
    let mut consume = |block: &AudioBuffer| {
        for (dest, src) in output.iter_mut().zip(block.channels()) {
            dest.extend_from_slice(src);
        }
    };

    for cycle in 0..cycles {
        sim.run(1, &mut produce, &mut consume);
        if cycle % 64 == 0 {
            pb.set_position(cycle as u64);
            pb.set_message(format!("delay {}", probe.samples()));
        }
    }
    pb.finish_with_message(format!("delay {}", probe.samples()));

    let stats = sim.stats();
    tracing::info!(
        cycles = stats.cycles,
        final_delay = stats.final_delay,
        mean_factor = stats.mean_factor(),
        "processing finished"
    );
    print_stats(stats, settings);

    Ok(output)
}
