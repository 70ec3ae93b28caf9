//! Integration tests for elastico-cli.
//!
//! Tests invoke the built binary and check its output and the files it writes.

use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the `elastico` binary built by cargo.
fn elastico_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_elastico"))
}

fn write_tone(path: &std::path::Path, channels: u16, frames: usize) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 48000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let value = (i as f32 * 0.05).sin() * 0.5;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
}

// ---------------------------------------------------------------------------
// `elastico settings`
// ---------------------------------------------------------------------------

#[test]
fn cli_settings_prints_defaults() {
    let output = elastico_bin()
        .arg("settings")
        .output()
        .expect("failed to run elastico settings");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in [
        "channels = 2",
        "sample_rate = 48000",
        "capacity = 4096",
        "block_size = 256",
        "target_delay = 512",
        "max_resampling_factor = 8.0",
    ] {
        assert!(stdout.contains(line), "missing '{line}' in:\n{stdout}");
    }
}

#[test]
fn cli_settings_write_then_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.toml");

    let status = elastico_bin()
        .args(["settings", "--write"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(path.exists());

    let output = elastico_bin()
        .args(["settings", "--validate"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(": ok"));
}

#[test]
fn cli_settings_validate_rejects_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "capacity = 100\nblock_size = 256\n").unwrap();

    let output = elastico_bin()
        .args(["settings", "--validate"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("capacity"));
}

// ---------------------------------------------------------------------------
// `elastico simulate`
// ---------------------------------------------------------------------------

#[test]
fn cli_simulate_reports_stats() {
    let output = elastico_bin()
        .args(["simulate", "--cycles", "300", "--drift-ppm", "0"])
        .output()
        .expect("failed to run elastico simulate");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("300 pulls"), "got:\n{stdout}");
    assert!(stdout.contains("final 512"), "got:\n{stdout}");
    assert!(stdout.contains("Factor:"), "got:\n{stdout}");
}

#[test]
fn cli_simulate_target_in_ms_and_gain_in_db() {
    let output = elastico_bin()
        .args([
            "simulate",
            "--cycles",
            "100",
            "--drift-ppm",
            "0",
            "--target-ms",
            "10",
            "--gain-db",
            "-6",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Target:  480 samples"), "got:\n{stdout}");
    assert!(stdout.contains("final 480"), "got:\n{stdout}");
    // 0.5 amplitude tone at -6 dB peaks near -12 dB.
    assert!(stdout.contains("output peak -12.0 dB"), "got:\n{stdout}");
}

#[test]
fn cli_simulate_rejects_both_target_forms() {
    let output = elastico_bin()
        .args(["simulate", "--target", "512", "--target-ms", "10"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_simulate_accepts_negative_drift_and_linear() {
    let output = elastico_bin()
        .args([
            "simulate",
            "--cycles",
            "200",
            "--drift-ppm",
            "-500",
            "--interpolation",
            "linear",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn cli_simulate_writes_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sim.wav");

    let status = elastico_bin()
        .args(["simulate", "--cycles", "100", "--channels", "1", "--output"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 100 * 256);
}

#[test]
fn cli_simulate_rejects_target_beyond_capacity() {
    let output = elastico_bin()
        .args(["simulate", "--capacity", "1024", "--target", "2000"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("target_delay"));
}

// ---------------------------------------------------------------------------
// `elastico process`
// ---------------------------------------------------------------------------

#[test]
fn cli_process_keeps_channels_and_adds_delay() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output_path = dir.path().join("out.wav");
    write_tone(&input, 2, 48000);

    let output = elastico_bin()
        .arg("process")
        .arg(&input)
        .arg(&output_path)
        .args(["--drift-ppm", "200", "--target", "1024"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let reader = hound::WavReader::open(&output_path).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 48000);
    let frames = reader.len() as usize / 2;
    assert!(frames >= 48000 + 1024, "only {frames} frames");
}

#[test]
fn cli_process_rejects_bad_bit_depth() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    write_tone(&input, 1, 1000);

    let output = elastico_bin()
        .arg("process")
        .arg(&input)
        .arg(dir.path().join("out.wav"))
        .args(["--bit-depth", "12"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_process_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = elastico_bin()
        .arg("process")
        .arg(dir.path().join("absent.wav"))
        .arg(dir.path().join("out.wav"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}
