//! Client for the LIFX LAN protocol: message framing, per-device requests
//! with sequence and acknowledgement tracking, discovery, and tile-chain
//! geometry.

mod ack;
mod app;
mod cli;
mod color;
mod context;
mod device;
mod discovery;
mod error;
mod header;
mod light;
mod message;
pub mod mock;
mod product;
mod protocol;
mod relay;
mod response;
mod target;
mod telemetry;
mod terminal;
mod tile;
mod transport;

pub use ack::{WaitForAcksError, wait_for_acks};
pub use app::{run, run_with_terminal};
pub use cli::{
    Args, Command, DeviceArgs, DeviceReport, FillArgs, LogLevel, OutputFormat, PowerArgs,
    PowerState, TileCommand,
};
pub use color::{COLOR_LENGTH, Color, KELVIN_COOL, KELVIN_WARM, TemperatureRange};
pub use context::{CallContext, DEFAULT_READ_TIMEOUT};
pub use device::{DEFAULT_PORT, Device, LABEL_LENGTH, PowerLevel, ServiceType, random_source};
pub use discovery::{DEFAULT_BROADCAST, DiscoveryConfig, discover, discover_all};
pub use error::{CancelReason, LifxError, MalformedMessage, ProductRegistryError};
pub use header::{AckResFlags, HEADER_LENGTH, Header, TaggedHeader};
pub use light::{
    LightDevice, LightState, Waveform, WaveformArgs, convert_skew_ratio, transition_millis,
};
pub use message::{MessageMeta, Response, build_message, parse_message};
pub use product::{
    Features, FirmwareUpgrade, FirmwareVersion, HardwareVersion, Product, ProductRegistry,
    product_map_key,
};
pub use protocol::{KnownMessage, MessageType};
pub use relay::RelayDevice;
pub use response::read_next_response;
pub use target::{MacAddress, Target, TargetParseError};
pub use terminal::{SystemTerminalClient, TerminalClient};
pub use tile::{Board, BoardData, ColorBoard, Coordinate, IndexData, Rotation, Tile, TileDevice};
pub use transport::{Connection, RESPONSE_READ_BUFFER_SIZE, UdpConnection};
