pub mod commands;
pub mod render;

use agrilink::{AgriConfig, GrowthStage, SoilType};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agrilink")]
#[command(version, about = "Find field sensors and request crop analyses")]
pub struct Args {
    /// Configuration file; defaults to the per-user config, then ./agrilink.toml.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the local Wi-Fi subnet for sensor devices.
    Scan {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Read the sensors of one device.
    Connect {
        /// Device address as shown by `scan`.
        device: String,

        #[command(flatten)]
        location: LocationArgs,
    },

    /// Upload an image with field data for herbicide analysis.
    Submit {
        /// Photo of the field.
        #[arg(long)]
        image: PathBuf,

        #[arg(long)]
        soil: SoilType,

        #[arg(long)]
        stage: GrowthStage,

        /// Use the newer detection model.
        #[arg(long)]
        new_model: bool,

        /// Read temperature and humidity from this device first.
        #[arg(long, conflicts_with_all = ["temperature", "humidity"])]
        device: Option<String>,

        /// Temperature in °C, when no device is used.
        #[arg(long)]
        temperature: Option<f64>,

        /// Relative humidity in %, when no device is used.
        #[arg(long)]
        humidity: Option<f64>,

        #[command(flatten)]
        location: LocationArgs,

        /// Print the raw JSON report.
        #[arg(long)]
        json: bool,
    },

    /// Show current weather conditions.
    Weather {
        /// Keep refreshing until interrupted.
        #[arg(long)]
        watch: bool,
    },
}

/// Describes the link this machine is on, since the CLI has no platform
/// connectivity listener.
#[derive(ClapArgs, Debug, Clone)]
pub struct NetworkArgs {
    /// This machine's IPv4 address on the Wi-Fi network.
    #[arg(long)]
    pub ip: String,

    #[arg(long)]
    pub ssid: Option<String>,

    /// The link is not Wi-Fi (e.g. cellular or wired); scanning is refused.
    #[arg(long)]
    pub not_wifi: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct LocationArgs {
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("agrilink {}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => AgriConfig::load(path)?,
        None => AgriConfig::load_or_default(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(commands::dispatch(config, args.command))
}
