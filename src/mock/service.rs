use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bon::Builder;
use bytes::BufMut;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::color::{COLOR_LENGTH, Color};
use crate::device::{
    DEFAULT_PORT, Device, LABEL_LENGTH, PowerLevel, ServiceType, decode_label, encode_label,
};
use crate::header::{AckResFlags, TaggedHeader};
use crate::light::SetWaveformOptional;
use crate::message::{MessageMeta, Response, build_message, parse_message};
use crate::product::{FirmwareVersion, HardwareVersion};
use crate::protocol::MessageType;
use crate::target::{MacAddress, Target};
use crate::tile::payload::{
    DeviceChain, GetTileState, MAX_CHAIN_LENGTH, PIXELS_PER_MESSAGE, SetTileState, TileRecord,
    TileState,
};
use crate::tile::{Rotation, Tile};
use crate::transport::RESPONSE_READ_BUFFER_SIZE;

/// Target the mock answers to unless configured otherwise.
pub const MOCK_TARGET: Target = Target::Device(MacAddress::new([1, 0, 0, 0, 0, 0]));

const ACCEL_DOMINANT: i16 = 100;

/// What the mock device reports.
#[derive(Debug, Clone, Builder)]
pub struct MockConfig {
    #[builder(default = MOCK_TARGET)]
    target: Target,
    #[builder(default, into)]
    label: String,
    #[builder(default)]
    hardware: HardwareVersion,
    #[builder(default)]
    firmware: FirmwareVersion,
    #[builder(default = PowerLevel::OFF)]
    power: PowerLevel,
    #[builder(default)]
    color: Color,
    /// Tile chain; an empty chain answers GetDeviceChain with StateUnhandled.
    #[builder(default)]
    tiles: Vec<Tile>,
    #[builder(default)]
    tile_start_index: u8,
    /// Relay power levels; no relays answers relay messages with StateUnhandled.
    #[builder(default)]
    relays: Vec<PowerLevel>,
    /// Message types answered with StateUnhandled.
    #[builder(default)]
    unhandled: Vec<MessageType>,
    #[builder(default)]
    acks_to_drop: usize,
}

#[derive(Debug)]
struct MockState {
    label: String,
    power: PowerLevel,
    color: Color,
    tile_pixels: Vec<[Color; PIXELS_PER_MESSAGE]>,
    relays: Vec<PowerLevel>,
    acks_to_drop: usize,
    received: Vec<MessageType>,
}

impl MockState {
    fn new(config: &MockConfig) -> Self {
        Self {
            label: config.label.clone(),
            power: config.power,
            color: config.color,
            tile_pixels: vec![[Color::BLACK; PIXELS_PER_MESSAGE]; config.tiles.len()],
            relays: config.relays.clone(),
            acks_to_drop: config.acks_to_drop,
            received: Vec::new(),
        }
    }
}

/// A LAN device simulated on a localhost UDP socket.
#[derive(Debug)]
pub struct MockService {
    addr: SocketAddr,
    config: Arc<MockConfig>,
    state: Arc<Mutex<MockState>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MockService {
    /// Binds `127.0.0.1:0` and starts answering requests.
    ///
    /// # Errors
    ///
    /// Returns socket errors from binding.
    #[instrument(skip_all)]
    pub async fn start(config: MockConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = socket.local_addr()?;
        let state = Arc::new(Mutex::new(MockState::new(&config)));
        let config = Arc::new(config);
        let token = CancellationToken::new();

        let task = tokio::spawn(serve(
            socket,
            Arc::clone(&config),
            Arc::clone(&state),
            token.clone(),
        ));
        debug!(%addr, target = %config.target, "mock device listening");

        Ok(Self {
            addr,
            config,
            state,
            token,
            task: Some(task),
        })
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.config.target
    }

    /// A [`Device`] addressing this mock.
    #[must_use]
    pub fn device(&self) -> Device {
        Device::new(self.addr, ServiceType::UDP, self.config.target)
    }

    /// Drops the next `count` acknowledgements.
    pub fn drop_acks(&self, count: usize) {
        self.state().acks_to_drop = count;
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.state().label.clone()
    }

    #[must_use]
    pub fn power(&self) -> PowerLevel {
        self.state().power
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.state().color
    }

    #[must_use]
    pub fn relay_power(&self, relay_index: usize) -> Option<PowerLevel> {
        self.state().relays.get(relay_index).copied()
    }

    /// Stored pixels of one tile, by chain position.
    #[must_use]
    pub fn tile_pixels(&self, tile: usize) -> Option<Vec<Color>> {
        self.state().tile_pixels.get(tile).map(|pixels| pixels.to_vec())
    }

    /// Message types received so far, oldest first.
    #[must_use]
    pub fn received(&self) -> Vec<MessageType> {
        self.state().received.clone()
    }

    /// Stops answering and waits for the serving task to end.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take()
            && let Err(error) = task.await
        {
            debug!(%error, "mock device task ended abnormally");
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn serve(
    socket: UdpSocket,
    config: Arc<MockConfig>,
    state: Arc<Mutex<MockState>>,
    token: CancellationToken,
) {
    let port = socket.local_addr().map_or(DEFAULT_PORT, |addr| addr.port());
    let mut buf = vec![0_u8; RESPONSE_READ_BUFFER_SIZE];
    loop {
        let (len, peer) = tokio::select! {
            () = token.cancelled() => return,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(error) => {
                    debug!(%error, "mock device read failed");
                    continue;
                }
            },
        };

        let request = match parse_message(&buf[..len]) {
            Ok(request) => request,
            Err(error) => {
                debug!(%error, "mock device ignoring malformed datagram");
                continue;
            }
        };
        if !request.target().matches(config.target) {
            trace!(target = %request.target(), "mock device ignoring foreign target");
            continue;
        }

        let replies = handle(&config, &mut lock(&state), port, &request);
        for (message_type, payload) in replies {
            let meta = MessageMeta {
                tagged: TaggedHeader::NOT_TAGGED,
                source: request.source(),
                target: config.target,
                flags: AckResFlags::NONE,
                sequence: request.sequence(),
                message_type,
            };
            let sent = match build_message(&meta, &payload) {
                Ok(datagram) => socket.send_to(&datagram, peer).await.map(drop),
                Err(error) => Err(io::Error::other(error)),
            };
            if let Err(error) = sent {
                debug!(%error, %message_type, "mock device reply failed");
            }
        }
    }
}

fn handle(
    config: &MockConfig,
    state: &mut MockState,
    port: u16,
    request: &Response,
) -> Vec<(MessageType, Vec<u8>)> {
    let message_type = request.message_type();
    let payload = request.payload().as_ref();
    let res_required = request.flags().contains(AckResFlags::RES_REQUIRED);
    state.received.push(message_type);

    let mut replies = Vec::new();
    if request.flags().contains(AckResFlags::ACK_REQUIRED) {
        if state.acks_to_drop > 0 {
            state.acks_to_drop -= 1;
            trace!(sequence = request.sequence(), "mock device dropping ack");
        } else {
            replies.push((MessageType::ACKNOWLEDGEMENT, Vec::new()));
        }
    }

    if config.unhandled.contains(&message_type) {
        replies.push(unhandled(message_type));
        return replies;
    }

    match message_type {
        MessageType::GET_SERVICE => {
            let mut reply = Vec::with_capacity(5);
            reply.put_u8(ServiceType::UDP.value());
            reply.put_u32_le(u32::from(port));
            replies.push((MessageType::STATE_SERVICE, reply));
        }
        MessageType::GET_LABEL => replies.push(state_label(state)),
        MessageType::SET_LABEL => {
            if let Ok(label) = decode_label(payload) {
                state.label = label;
            }
            if res_required {
                replies.push(state_label(state));
            }
        }
        MessageType::GET_VERSION => {
            let mut reply = Vec::with_capacity(12);
            reply.put_u32_le(config.hardware.vendor_id);
            reply.put_u32_le(config.hardware.product_id);
            reply.put_u32_le(config.hardware.version);
            replies.push((MessageType::STATE_VERSION, reply));
        }
        MessageType::GET_HOST_FIRMWARE => {
            let mut reply = Vec::with_capacity(20);
            reply.put_bytes(0, 16);
            reply.put_u16_le(config.firmware.minor);
            reply.put_u16_le(config.firmware.major);
            replies.push((MessageType::STATE_HOST_FIRMWARE, reply));
        }
        MessageType::GET_POWER => replies.push(state_power(state)),
        MessageType::SET_POWER => {
            if let [low, high, ..] = *payload {
                state.power = PowerLevel::from(u16::from_le_bytes([low, high]));
            }
            if res_required {
                replies.push(state_power(state));
            }
        }
        MessageType::LIGHT_GET => replies.push(light_state(state)),
        MessageType::LIGHT_SET_COLOR => {
            if payload.len() > COLOR_LENGTH {
                state.color = Color::decode(&mut &payload[1..=COLOR_LENGTH]);
            }
            if res_required {
                replies.push(light_state(state));
            }
        }
        MessageType::LIGHT_SET_POWER => {
            if let [low, high, ..] = *payload {
                state.power = PowerLevel::from(u16::from_le_bytes([low, high]));
            }
            if res_required {
                replies.push(light_state(state));
            }
        }
        MessageType::SET_WAVEFORM_OPTIONAL => {
            if let Ok(waveform) = SetWaveformOptional::decode(payload) {
                state.color = waveform.apply_to(state.color);
            }
            if res_required {
                replies.push(light_state(state));
            }
        }
        MessageType::ECHO_REQUEST => {
            replies.push((MessageType::ECHO_RESPONSE, payload.to_vec()));
        }
        MessageType::GET_DEVICE_CHAIN if !config.tiles.is_empty() => {
            replies.push((MessageType::STATE_DEVICE_CHAIN, device_chain(config)));
        }
        MessageType::GET_TILE_STATE_64 if !config.tiles.is_empty() => {
            if let Ok(get) = GetTileState::decode(payload) {
                replies.extend(tile_states(config, state, get));
            }
        }
        MessageType::SET_TILE_STATE_64 if !config.tiles.is_empty() => {
            if let Ok(set) = SetTileState::decode(payload) {
                let slot = usize::from(set.tile_index)
                    .checked_sub(usize::from(config.tile_start_index))
                    .and_then(|index| state.tile_pixels.get_mut(index));
                if let Some(pixels) = slot {
                    *pixels = set.colors;
                }
            }
        }
        MessageType::GET_RELAY_POWER if !state.relays.is_empty() => {
            if let Some(&relay_index) = payload.first() {
                replies.push(state_relay_power(state, relay_index));
            }
        }
        MessageType::SET_RELAY_POWER if !state.relays.is_empty() => {
            if let [relay_index, low, high, ..] = *payload {
                if let Some(relay) = state.relays.get_mut(usize::from(relay_index)) {
                    *relay = PowerLevel::from(u16::from_le_bytes([low, high]));
                }
                if res_required {
                    replies.push(state_relay_power(state, relay_index));
                }
            }
        }
        MessageType::ACKNOWLEDGEMENT => {}
        other => replies.push(unhandled(other)),
    }
    replies
}

fn unhandled(message_type: MessageType) -> (MessageType, Vec<u8>) {
    (
        MessageType::STATE_UNHANDLED,
        message_type.value().to_le_bytes().to_vec(),
    )
}

fn state_label(state: &MockState) -> (MessageType, Vec<u8>) {
    (MessageType::STATE_LABEL, encode_label(&state.label).to_vec())
}

fn state_power(state: &MockState) -> (MessageType, Vec<u8>) {
    (
        MessageType::STATE_POWER,
        state.power.value().to_le_bytes().to_vec(),
    )
}

fn state_relay_power(state: &MockState, relay_index: u8) -> (MessageType, Vec<u8>) {
    let power = state
        .relays
        .get(usize::from(relay_index))
        .copied()
        .unwrap_or(PowerLevel::OFF);
    let mut reply = Vec::with_capacity(3);
    reply.put_u8(relay_index);
    reply.put_u16_le(power.value());
    (MessageType::STATE_RELAY_POWER, reply)
}

fn light_state(state: &MockState) -> (MessageType, Vec<u8>) {
    let mut reply = Vec::with_capacity(COLOR_LENGTH + 4 + LABEL_LENGTH + 8);
    state.color.encode(&mut reply);
    reply.put_i16_le(0);
    reply.put_u16_le(state.power.value());
    reply.put_slice(&encode_label(&state.label));
    reply.put_u64_le(0);
    (MessageType::LIGHT_STATE, reply)
}

fn device_chain(config: &MockConfig) -> Vec<u8> {
    let start = usize::from(config.tile_start_index);
    let mut records = vec![TileRecord::default(); MAX_CHAIN_LENGTH];
    for (slot, tile) in records.iter_mut().skip(start).zip(&config.tiles) {
        let (accel_x, accel_y, accel_z) = accelerometer_for(tile.rotation);
        *slot = TileRecord {
            accel_x,
            accel_y,
            accel_z,
            user_x: tile.user_x,
            user_y: tile.user_y,
            width: tile.width,
            height: tile.height,
            hardware: config.hardware,
            firmware: config.firmware,
        };
    }
    DeviceChain {
        start_index: config.tile_start_index,
        records,
        total_count: u8::try_from(config.tiles.len()).unwrap_or(u8::MAX),
    }
    .encode()
}

fn tile_states(
    config: &MockConfig,
    state: &MockState,
    get: GetTileState,
) -> Vec<(MessageType, Vec<u8>)> {
    let start = usize::from(config.tile_start_index);
    let first = usize::from(get.tile_index);
    let last = first + usize::from(get.length);
    state
        .tile_pixels
        .iter()
        .enumerate()
        .map(|(index, pixels)| (start + index, pixels))
        .filter(|(chain_index, _)| (first..last).contains(chain_index))
        .map(|(chain_index, pixels)| {
            let reply = TileState {
                tile_index: u8::try_from(chain_index).unwrap_or(u8::MAX),
                x: get.x,
                y: get.y,
                width: get.width,
                colors: *pixels,
            };
            (MessageType::STATE_TILE_STATE_64, reply.encode())
        })
        .collect()
}

fn accelerometer_for(rotation: Rotation) -> (i16, i16, i16) {
    match rotation {
        Rotation::RightSideUp => (0, -ACCEL_DOMINANT, 0),
        Rotation::UpsideDown => (0, ACCEL_DOMINANT, 0),
        Rotation::RotateRight => (ACCEL_DOMINANT, 0, 0),
        Rotation::RotateLeft => (-ACCEL_DOMINANT, 0, 0),
        Rotation::FaceDown => (0, 0, ACCEL_DOMINANT),
        Rotation::FaceUp => (0, 0, -ACCEL_DOMINANT),
    }
}
