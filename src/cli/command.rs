use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

use crate::color::Color;
use crate::device::PowerLevel;
use crate::discovery::DEFAULT_BROADCAST;
use crate::target::Target;

const DEFAULT_KELVIN: u16 = 3500;

/// Command-line options for the LIFX LAN tool.
#[derive(Debug, Parser)]
#[command(name = "lifxlan", about = "Discover and control LIFX devices on the local network.")]
pub struct Args {
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to pretty on a terminal and JSON otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// How long discovery and each device operation may take (e.g. `500ms`, `2s`).
    #[arg(long, global = true, default_value = "2s", value_parser = parse_duration)]
    timeout: Duration,
    /// Broadcast address for discovery.
    #[arg(long, global = true, env = "LIFX_BROADCAST", default_value_t = DEFAULT_BROADCAST)]
    broadcast: SocketAddr,
    /// Products JSON file extending the built-in product table.
    #[arg(long, global = true, env = "LIFX_PRODUCTS")]
    products: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use lifxlan::{Args, Command};
    ///
    /// let args = Args::new(Command::Discover);
    /// assert!(args.log_level().is_none());
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            output: None,
            timeout: Duration::from_secs(2),
            broadcast: DEFAULT_BROADCAST,
            products: None,
            command,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = Some(output);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn broadcast(&self) -> SocketAddr {
        self.broadcast
    }

    #[must_use]
    pub fn products(&self) -> Option<&PathBuf> {
        self.products.as_ref()
    }

    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum, Serialize)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Supported CLI commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Broadcast for devices and list what answers.
    Discover,
    /// Show label, product, versions and features of one device.
    Info(DeviceArgs),
    /// Switch one device on or off.
    Power(PowerArgs),
    /// Inspect or paint a tile chain.
    #[command(subcommand)]
    Tile(TileCommand),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Info(_) => "info",
            Self::Power(_) => "power",
            Self::Tile(TileCommand::Layout(_)) => "tile layout",
            Self::Tile(TileCommand::Fill(_)) => "tile fill",
        }
    }
}

/// Tile subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum TileCommand {
    /// Print the tiles and an ASCII map of the stitched board.
    Layout(DeviceArgs),
    /// Paint every tile pixel with one colour.
    Fill(FillArgs),
}

/// Selects one device, by discovery or by address.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct DeviceArgs {
    /// Device MAC address, e.g. `d0:73:d5:01:02:03`; the first device found when omitted.
    #[arg(long)]
    target: Option<Target>,
    /// Device `host:port`; skips discovery.
    #[arg(long)]
    addr: Option<SocketAddr>,
}

impl DeviceArgs {
    #[must_use]
    pub fn new(target: Option<Target>, addr: Option<SocketAddr>) -> Self {
        Self { target, addr }
    }

    pub(crate) fn target(&self) -> Target {
        self.target.unwrap_or_default()
    }

    pub(crate) fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }
}

/// Arguments of `power`.
#[derive(Debug, Clone, ClapArgs)]
pub struct PowerArgs {
    #[arg(value_enum)]
    state: PowerState,
    #[command(flatten)]
    device: DeviceArgs,
}

impl PowerArgs {
    #[must_use]
    pub fn new(state: PowerState, device: DeviceArgs) -> Self {
        Self { state, device }
    }

    pub(crate) fn level(&self) -> PowerLevel {
        match self.state {
            PowerState::On => PowerLevel::ON,
            PowerState::Off => PowerLevel::OFF,
        }
    }

    pub(crate) fn device(&self) -> &DeviceArgs {
        &self.device
    }
}

/// Requested power state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

/// Arguments of `tile fill`.
#[derive(Debug, Clone, ClapArgs)]
pub struct FillArgs {
    /// Colour as `RRGGBB` hex.
    #[arg(long, value_parser = parse_colour)]
    colour: Color,
    /// Colour temperature in Kelvin.
    #[arg(long, default_value_t = DEFAULT_KELVIN)]
    kelvin: u16,
    /// Fade duration (e.g. `0s`, `750ms`).
    #[arg(long, default_value = "0s", value_parser = parse_duration)]
    transition: Duration,
    #[command(flatten)]
    device: DeviceArgs,
}

impl FillArgs {
    /// Builds fill arguments from an `RRGGBB` string.
    ///
    /// # Errors
    ///
    /// Returns a message when `colour` is not six hex digits.
    pub fn new(colour: &str, kelvin: u16, device: DeviceArgs) -> Result<Self, String> {
        Ok(Self {
            colour: parse_colour(colour)?,
            kelvin,
            transition: Duration::ZERO,
            device,
        })
    }

    pub(crate) fn color(&self) -> Color {
        Color {
            kelvin: self.kelvin,
            ..self.colour
        }
    }

    pub(crate) fn transition(&self) -> Duration {
        self.transition
    }

    pub(crate) fn device(&self) -> &DeviceArgs {
        &self.device
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

fn parse_colour(value: &str) -> Result<Color, String> {
    Color::from_hex(value, 0).ok_or_else(|| format!("`{value}` is not an RRGGBB colour"))
}
