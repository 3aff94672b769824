use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blinkytape::{export, raster, Animation, AnimationConfig, BlinkyTape, Color};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "blinkytape")]
#[command(about = "Drive a BlinkyTape LED strip over serial", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to device configuration file (JSON)
    #[arg(short, long, default_value = "blinkytape.json", global = true)]
    config: PathBuf,

    /// Enable debug output (state transitions, commits)
    #[arg(long, global = true)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long, global = true)]
    ddebug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Play an animation file until it ends or Ctrl-C is pressed
    Play {
        /// Animation file (JSON)
        animation: PathBuf,

        /// Override the number of repetitions (negative loops forever)
        #[arg(long, allow_negative_numbers = true)]
        repeat: Option<i64>,

        /// Override the delay between frames, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Set every pixel to one color
    Color { r: u8, g: u8, b: u8 },

    /// Switch every pixel off
    Off,

    /// Convert a PatternPaint Arduino export into an animation file
    Import {
        /// PatternPaint export (C header)
        input: PathBuf,

        /// Animation file to write (JSON)
        output: PathBuf,

        #[arg(long, default_value = "imported")]
        name: String,

        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        repeat: i64,

        /// Frames per second (0 uses the default delay)
        #[arg(long, default_value_t = 0)]
        speed: u32,
    },

    /// Convert an image into an animation file, one frame per column
    ImportImage {
        /// Image file (PNG, JPEG, GIF, BMP)
        input: PathBuf,

        /// Animation file to write (JSON)
        output: PathBuf,

        /// Strip length to scale for (defaults to the device config)
        #[arg(long)]
        pixel_count: Option<usize>,

        #[arg(long, default_value = "imported")]
        name: String,

        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        repeat: i64,

        /// Frames per second (0 uses the default delay)
        #[arg(long, default_value_t = 0)]
        speed: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ddebug implies debug
    let level = if cli.ddebug {
        "trace"
    } else if cli.debug {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Play {
            animation,
            repeat,
            delay_ms,
        } => play(&cli.config, &animation, repeat, delay_ms),
        Command::Color { r, g, b } => {
            let tape = open(&cli.config)?;
            tape.set_color(Color::new(r, g, b))?;
            tape.render()?;
            Ok(())
        }
        Command::Off => {
            let tape = open(&cli.config)?;
            tape.switch_off()?;
            Ok(())
        }
        Command::Import {
            input,
            output,
            name,
            repeat,
            speed,
        } => {
            let pattern = export::load(&input)?;
            write_animation(&output, name, repeat, speed, pattern)
        }
        Command::ImportImage {
            input,
            output,
            pixel_count,
            name,
            repeat,
            speed,
        } => {
            let pixel_count = match pixel_count {
                Some(count) => count,
                None => Config::load(&cli.config)?.pixel_count,
            };
            let pattern = raster::load(&input, pixel_count)
                .with_context(|| format!("Failed to import {}", input.display()))?;
            write_animation(&output, name, repeat, speed, pattern)
        }
    }
}

fn write_animation(
    output: &Path,
    name: String,
    repeat: i64,
    speed: u32,
    pattern: blinkytape::Pattern,
) -> Result<()> {
    let animation = Animation {
        name,
        repeat,
        speed,
        pattern,
    };
    animation.save(output)?;
    log::info!(
        "wrote {} frames to {}",
        animation.pattern.len(),
        output.display()
    );
    Ok(())
}

fn open(config_path: &Path) -> Result<BlinkyTape> {
    let config = Config::load(config_path)?;
    BlinkyTape::open(&config.port, config.pixel_count)
        .with_context(|| format!("Failed to open strip on {}", config.port))
}

fn play(
    config_path: &Path,
    animation_path: &Path,
    repeat: Option<i64>,
    delay_ms: Option<u64>,
) -> Result<()> {
    let animation = Animation::load(animation_path)?;
    let tape = Arc::new(open(config_path)?);

    // an override replaces both values, fill the missing one from the animation
    let config = (repeat.is_some() || delay_ms.is_some()).then(|| AnimationConfig {
        repeat: repeat.unwrap_or(animation.repeat),
        delay: delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| animation.delay()),
    });

    // Set up Ctrl-C handler with graceful shutdown
    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_tape = Arc::clone(&tape);
    let handler_flag = Arc::clone(&interrupted);
    let result = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
        handler_tape.stop();
    });

    if let Err(e) = result {
        log::warn!("Could not set Ctrl-C handler: {}", e);
    }

    tape.play(&animation, config);
    if interrupted.load(Ordering::Relaxed) {
        tape.stop();
    }
    tape.wait();

    if let Some(e) = tape.take_last_error() {
        return Err(e).context("Playback aborted");
    }

    // Graceful shutdown - turn off LEDs
    if interrupted.load(Ordering::Relaxed) {
        log::info!("Shutting down...");
        tape.switch_off()?;
    }

    Ok(())
}
