//! Clock drift simulation command.

use super::common::{BufferArgs, Interpolation, print_stats};
use crate::drift::DriftSimulation;
use crate::wav::{WavSpec, write_wav};
use clap::Args;
use elastico_config::ElasticSettings;
use elastico_core::{AudioBuffer, FractionalResampler, LagrangeInterpolator, LinearInterpolator};
use std::f32::consts::TAU;
use std::path::PathBuf;

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    buffer: BufferArgs,

    /// Number of consumer cycles to run
    #[arg(short, long, default_value = "2000")]
    cycles: usize,

    /// Channel count (overrides the settings file)
    #[arg(long)]
    channels: Option<usize>,

    /// Test tone frequency in Hz
    #[arg(long, default_value = "440.0")]
    frequency: f32,

    /// Switch to this target delay halfway through the run
    #[arg(long)]
    step_target: Option<usize>,

    /// Write the consumed signal to this WAV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let settings = args.buffer.resolve_with(args.channels, None)?;
    if let Some(step) = args.step_target
        && step >= settings.capacity
    {
        anyhow::bail!(
            "--step-target {} must be below capacity {}",
            step,
            settings.capacity
        );
    }

    match args.buffer.interpolation {
        Interpolation::Lagrange => run_with::<LagrangeInterpolator>(&args, &settings),
        Interpolation::Linear => run_with::<LinearInterpolator>(&args, &settings),
    }
}

fn run_with<R: FractionalResampler + Default>(
    args: &SimulateArgs,
    settings: &ElasticSettings,
) -> anyhow::Result<()> {
    let drift_ppm = args.buffer.drift_ppm;
    let mut sim: DriftSimulation<R> = DriftSimulation::new(settings, drift_ppm)?;
    sim.set_input_gain(args.buffer.input_gain());

    println!(
        "Simulating {} cycles: {} ch, {} Hz, block {}, capacity {}, target {}, drift {:+} ppm",
        args.cycles,
        settings.channels,
        settings.sample_rate,
        settings.block_size,
        settings.capacity,
        settings.target_delay,
        drift_ppm
    );

    let phase_step = TAU * args.frequency / settings.sample_rate as f32;
    let mut phase = 0.0f32;
    let mut produce = |block: &mut AudioBuffer| {
        for i in 0..block.num_samples() {
            let value = phase.sin() * 0.5;
            for ch in 0..block.num_channels() {
                block.channel_mut(ch)[i] = value;
            }
            phase = (phase + phase_step) % TAU;
        }
    };

    let keep_output = args.output.is_some();
    let mut recorded: Vec<Vec<f32>> = vec![Vec::new(); settings.channels];
    let mut consume = |block: &AudioBuffer| {
        if keep_output {
            for (dest, src) in recorded.iter_mut().zip(block.channels()) {
                dest.extend_from_slice(src);
            }
        }
    };

    match args.step_target {
        Some(step) => {
            let first = args.cycles / 2;
            sim.run(first, &mut produce, &mut consume);
            tracing::info!(
                from = settings.target_delay,
                to = step,
                cycle = first,
                "target delay changed"
            );
            sim.set_target_delay(step);
            sim.run(args.cycles - first, &mut produce, &mut consume);
        }
        None => sim.run(args.cycles, &mut produce, &mut consume),
    }

    let stats = sim.stats();
    tracing::info!(
        final_delay = stats.final_delay,
        mean_factor = stats.mean_factor(),
        "simulation finished"
    );
    print_stats(stats, settings);

    if let Some(path) = &args.output {
        let spec = WavSpec {
            channels: settings.channels as u16,
            sample_rate: settings.sample_rate,
            bits_per_sample: 32,
        };
        println!("\nWriting {}...", path.display());
        write_wav(path, &recorded, spec)?;
    }

    Ok(())
}
