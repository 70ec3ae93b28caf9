//! Settings file inspection command.

use clap::Args;
use elastico_config::ElasticSettings;
use std::path::PathBuf;

#[derive(Args)]
pub struct SettingsArgs {
    /// Validate this settings file instead of printing defaults
    #[arg(long, value_name = "FILE", conflicts_with = "write")]
    validate: Option<PathBuf>,

    /// Write the default settings to this file
    #[arg(long, value_name = "FILE")]
    write: Option<PathBuf>,
}

pub fn run(args: SettingsArgs) -> anyhow::Result<()> {
    if let Some(path) = &args.validate {
        let settings = ElasticSettings::load(path)?;
        println!("{}: ok", path.display());
        println!(
            "  {} ch, {} Hz, capacity {}, block {}, target {} ({:.2} ms), max factor {}",
            settings.channels,
            settings.sample_rate,
            settings.capacity,
            settings.block_size,
            settings.target_delay,
            settings.target_delay_ms(),
            settings.max_resampling_factor
        );
        return Ok(());
    }

    let defaults = ElasticSettings::default();
    if let Some(path) = &args.write {
        defaults.save(path)?;
        tracing::info!(path = %path.display(), "wrote default settings");
        println!("Wrote {}", path.display());
    } else {
        print!("{}", defaults.to_toml()?);
    }

    Ok(())
}
