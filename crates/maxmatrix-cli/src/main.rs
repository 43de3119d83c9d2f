//! MaxMatrix Control Tool
//!
//! Runs driver operations against a virtual MAX7219 chain and shows what the
//! panels would display.

mod config;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maxmatrix_hw::{Direction, MaxMatrix, VirtualChain, VirtualPin, MAX_DEVICES};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use render::Snapshot;

type Matrix = MaxMatrix<VirtualPin, VirtualPin, VirtualPin>;

#[derive(Parser)]
#[command(name = "maxmatrixctl")]
#[command(about = "Control tool for MAX7219 LED matrix chains")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of chained devices (overrides the configuration)
    #[arg(long)]
    devices: Option<u8>,

    /// Print framebuffer and device registers as JSON instead of drawing
    #[arg(long, global = true)]
    json: bool,

    /// Also save a PNG screenshot of the matrix
    #[arg(long, global = true)]
    png: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show chain information
    Info,
    /// Show the effective configuration or write it to a file
    Config {
        /// Write the configuration to this path instead of printing it
        #[arg(long)]
        write: Option<PathBuf>,
    },
    /// Draw a sprite asset ([width, height, columns...])
    Blit {
        /// Asset file
        asset: PathBuf,

        /// Asset is text of hex bytes instead of raw binary
        #[arg(long)]
        hex: bool,

        /// Column offset
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        x: i32,

        /// Row offset
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        y: i32,

        /// Override the width stored in the asset header
        #[arg(long, requires = "height")]
        width: Option<u8>,

        /// Override the height stored in the asset header
        #[arg(long, requires = "width")]
        height: Option<u8>,
    },
    /// Shift the whole chain
    Shift {
        /// Direction: left, right, up, down
        direction: Direction,

        /// Number of single-step shifts
        #[arg(long, default_value_t = 1)]
        steps: u32,

        /// Wrap pixels around the opposite edge
        #[arg(long)]
        rotate: bool,

        /// Leave the exposed edge column stale instead of zeroing it
        #[arg(long)]
        no_fill: bool,

        /// Draw every intermediate frame
        #[arg(long)]
        frames: bool,

        /// Sprite asset to draw before shifting
        #[arg(long)]
        sprite: Option<PathBuf>,

        /// Sprite asset is text of hex bytes
        #[arg(long)]
        hex: bool,
    },
    /// Set or clear one pixel
    Dot {
        /// Global column
        column: usize,

        /// Row (0 = top)
        row: u8,

        /// Clear the pixel instead of setting it
        #[arg(long)]
        off: bool,
    },
    /// Write a column bitmask
    Column {
        /// Global column, or local column with --all
        column: usize,

        /// Bitmask (decimal, 0x.. or 0b..)
        #[arg(value_parser = parse_byte)]
        value: u8,

        /// Write the local column on every device
        #[arg(long)]
        all: bool,
    },
    /// Clear the display
    Clear,
    /// Set brightness
    Intensity {
        /// Level (0-15)
        level: u8,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => Config::default(),
    };
    if let Some(devices) = cli.devices {
        config.chain.devices = devices;
    }

    match cli.command {
        Commands::Config { write } => handle_config(&config, write.as_deref()),
        Commands::Info => {
            let (_chain, matrix) = open_chain(&config)?;
            handle_info(&matrix)
        }
        command => {
            let (chain, mut matrix) = open_chain(&config)?;
            run(command, &chain, &mut matrix, &config, cli.json)?;
            present(&chain, &matrix, &config, cli.json, cli.png.as_deref())
        }
    }
}

/// Applies a drawing command to the driver.
fn run(
    command: Commands,
    chain: &VirtualChain,
    matrix: &mut Matrix,
    config: &Config,
    json: bool,
) -> Result<()> {
    match command {
        Commands::Info | Commands::Config { .. } => {}
        Commands::Blit {
            asset,
            hex,
            x,
            y,
            width,
            height,
        } => {
            let bytes = read_asset(&asset, hex)?;
            match (width, height) {
                (Some(w), Some(h)) => matrix.write_sprite_sized(x, y, w, h, &bytes)?,
                _ => matrix.write_sprite(x, y, &bytes)?,
            }
        }
        Commands::Shift {
            direction,
            steps,
            rotate,
            no_fill,
            frames,
            sprite,
            hex,
        } => {
            if let Some(path) = sprite {
                let bytes = read_asset(&path, hex)?;
                matrix.write_sprite(0, 0, &bytes)?;
            }
            for step in 0..steps {
                matrix.shift(direction, rotate, !no_fill)?;
                if frames && !json && step + 1 < steps {
                    println!("step {}:", step + 1);
                    print!(
                        "{}",
                        render::ascii(chain, matrix.config(), &config.render.on, &config.render.off)
                    );
                    println!();
                }
            }
        }
        Commands::Dot { column, row, off } => matrix.set_dot(column, row, !off)?,
        Commands::Column { column, value, all } => {
            if all {
                let local = u8::try_from(column).context("Local column out of range")?;
                matrix.set_column_all(local, value)?;
            } else {
                matrix.set_column(column, value)?;
            }
        }
        Commands::Clear => matrix.clear()?,
        Commands::Intensity { level } => matrix.set_intensity(level)?,
    }
    Ok(())
}

/// Creates a virtual chain and an initialized driver for it.
fn open_chain(config: &Config) -> Result<(VirtualChain, Matrix)> {
    let panel = config.panel_geometry()?;
    let chain = VirtualChain::new(config.chain.devices.min(MAX_DEVICES));
    let (data, load, clock) = chain.pins();

    let mut matrix = MaxMatrix::with_panel(data, load, clock, config.chain.devices, panel);
    matrix.init().context("Failed to initialize chain")?;
    matrix.set_intensity(config.panel.intensity)?;
    debug!("Virtual chain ready ({} devices)", chain.devices());

    Ok((chain, matrix))
}

/// Reads a sprite asset, either raw bytes or hex text.
fn read_asset(path: &Path, hex: bool) -> Result<Vec<u8>> {
    if !hex {
        return std::fs::read(path)
            .with_context(|| format!("Failed to read asset {}", path.display()));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read asset {}", path.display()))?;
    parse_hex_bytes(&text)
}

/// Parses whitespace or comma separated hex bytes, with or without `0x`.
fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split(|c: char| c.is_whitespace() || c == ','))
        .filter(|token| !token.is_empty())
        .map(|token| {
            let digits = token.trim_start_matches("0x").trim_start_matches("0X");
            u8::from_str_radix(digits, 16).with_context(|| format!("Invalid hex byte: {}", token))
        })
        .collect()
}

/// Parses a byte given in decimal, `0x` hex or `0b` binary.
fn parse_byte(s: &str) -> std::result::Result<u8, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u8::from_str_radix(&bin.replace('_', ""), 2)
    } else {
        s.parse::<u8>()
    };
    parsed.map_err(|e| format!("Invalid byte '{}': {}", s, e))
}

fn handle_config(config: &Config, write: Option<&Path>) -> Result<()> {
    match write {
        Some(path) => {
            config.save(path)?;
            println!("Configuration written to: {}", path.display());
        }
        None => {
            let content =
                toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            print!("{}", content);
        }
    }
    Ok(())
}

fn handle_info(matrix: &Matrix) -> Result<()> {
    let config = matrix.config();
    let panel = config.panel();
    println!("Chain Status:");
    if config.was_clamped() {
        println!(
            "  Devices: {} (requested {}, maximum {})",
            config.devices(),
            config.requested_devices(),
            MAX_DEVICES
        );
    } else {
        println!("  Devices: {}", config.devices());
    }
    println!("  Panel: {}x{}", panel.width(), panel.height());
    println!("  Columns: {}", config.columns());
    println!("  Layout: {}", matrix.framebuffer().layout());
    println!("  Init transactions: {}", matrix.transactions());
    Ok(())
}

fn present(
    chain: &VirtualChain,
    matrix: &Matrix,
    config: &Config,
    json: bool,
    png: Option<&Path>,
) -> Result<()> {
    if json {
        let snapshot = Snapshot::capture(
            matrix.config(),
            matrix.framebuffer(),
            chain,
            matrix.transactions(),
        );
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!(
            "{}",
            render::ascii(chain, matrix.config(), &config.render.on, &config.render.off)
        );
        println!("{} bus transactions", matrix.transactions());
    }

    if let Some(path) = png {
        render::write_png(path, chain, matrix.config(), config.render.scale)?;
        if !json {
            println!("Screenshot saved to: {}", path.display());
        }
    }
    Ok(())
}
