//! Print the GPIO/PWM channel map resolved for the running Jetson board.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jetson_gpio::{AddressingScheme, Gpio, SysfsConfig};
use tracing::level_filters::LevelFilter;

/// Channel map inspector for Jetson developer kits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Channel to describe (default: list every channel)
    channel: Option<String>,

    /// Addressing scheme (board, bcm, cvm, tegra-soc)
    #[arg(short = 's', long, default_value = "board")]
    scheme: AddressingScheme,

    /// Resolve against a copy of the kernel tree rooted here
    #[arg(short = 'r', long)]
    root: Option<PathBuf>,

    /// JSON board catalog to use instead of the built-in tables
    #[arg(short = 'b', long)]
    boards: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    jetson_gpio::tracing::init_journald_or_stdout(level);

    let mut config = match &args.root {
        Some(root) => SysfsConfig::with_root(root),
        None => SysfsConfig::from_env(),
    };
    if args.boards.is_some() {
        config.boards_file = args.boards.clone();
    }

    let mut gpio = Gpio::new(config).context("Failed to load board catalog")?;
    gpio.detect().context("Board detection failed")?;

    println!(
        "{} ({})",
        gpio.board_name().unwrap_or_default(),
        gpio.board_type()
    );
    match gpio.carrier_board() {
        Some(id) => println!("Carrier board: {}", id),
        None => println!("Carrier board: unrecognized"),
    }
    println!();

    match &args.channel {
        Some(channel) => {
            let info = gpio
                .channel_info(args.scheme, channel)
                .with_context(|| format!("Unknown channel {:?}", channel))?;
            println!("{}", info);
        }
        None => {
            let channels = gpio.channels(args.scheme)?;
            tracing::debug!(scheme = %args.scheme, count = channels.len(), "Listing channels");
            for info in channels.values() {
                let pwm = match (&info.pwm_chip_dir, info.pwm_id) {
                    (Some(_), Some(id)) => format!("pwm{}", id),
                    _ => "-".to_string(),
                };
                println!("{:<12} {:<10} {}", info.channel, info.gpio_name, pwm);
            }
        }
    }

    Ok(())
}
