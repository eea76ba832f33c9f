// Bluepath CLI entry point.
//
// Generates a chord progression with a melody and writes the composition as
// JSON (stdout or a file), optionally also as a Standard MIDI File.
// Settings come from an optional JSON config file, overridden by flags.
//
// Usage:
//   bluepath [--config FILE] [--seed N] [--key K] [--mode major|minor]
//     [--bars N] [--rhythm-style S] [--output FILE] [--midi FILE]
//
// Logging goes to stderr through env_logger; set RUST_LOG=debug to trace the
// pipeline.

use bluepath_music::composition::compose;
use bluepath_music::config::ComposeConfig;
use bluepath_music::error::{ComposeError, ComposeResult};
use bluepath_music::midi::write_midi;
use bluepath_music::mode::Mode;
use bluepath_prng::SeededRng;
use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(name = "bluepath", about = "Procedural chord progression and melody generator")]
struct Args {
    /// JSON config file (camelCase keys; missing keys use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed; defaults to the config's seed, then the clock
    #[arg(long)]
    seed: Option<u64>,

    /// Key tonic, e.g. C, F#, Bb
    #[arg(long)]
    key: Option<String>,

    /// major or minor
    #[arg(long)]
    mode: Option<String>,

    /// Number of 4/4 bars
    #[arg(long)]
    bars: Option<u32>,

    /// Duration-weight preset (pop, ballad, syncopated, ...)
    #[arg(long)]
    rhythm_style: Option<String>,

    /// Write the composition JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also render a MIDI file
    #[arg(long)]
    midi: Option<PathBuf>,
}

fn parse_mode(name: &str) -> ComposeResult<Mode> {
    match name.to_ascii_lowercase().as_str() {
        "major" => Ok(Mode::Major),
        "minor" => Ok(Mode::Minor),
        other => Err(ComposeError::InvalidParameter {
            name: "mode",
            message: format!("expected major or minor, got {other:?}"),
        }),
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Merge the config file and flags into one config.
fn resolve_config(args: &Args) -> ComposeResult<ComposeConfig> {
    let mut config = match &args.config {
        Some(path) => ComposeConfig::load(path)?,
        None => ComposeConfig::default(),
    };
    if let Some(key) = &args.key {
        config.key = key.clone();
    }
    if let Some(mode) = &args.mode {
        config.mode = parse_mode(mode)?;
    }
    if let Some(bars) = args.bars {
        config.bars = bars;
    }
    if let Some(style) = &args.rhythm_style {
        config.rhythm_style = style.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    Ok(config)
}

fn run(args: Args) -> ComposeResult<()> {
    let config = resolve_config(&args)?;
    let seed = config.seed.unwrap_or_else(clock_seed);
    log::info!(
        "composing {} bars in {} {:?} (seed {seed})",
        config.bars,
        config.key,
        config.mode
    );

    let mut rng = SeededRng::new(seed);
    let composition = compose(&config, &mut rng)?;
    let json = composition.to_json()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)?;
            log::info!("wrote composition to {}", path.display());
        }
        None => println!("{json}"),
    }

    if let Some(path) = &args.midi {
        write_midi(&composition, &config.playback_options(), path)?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
