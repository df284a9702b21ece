//! Fixed-layout payloads of the tile messages.

use bytes::{Buf, BufMut};

use crate::color::{COLOR_LENGTH, Color};
use crate::error::MalformedMessage;
use crate::message::require_len;
use crate::product::{FirmwareVersion, HardwareVersion};
use super::tile::{Rotation, Tile};

pub(crate) const MAX_CHAIN_LENGTH: usize = 16;
pub(crate) const PIXELS_PER_MESSAGE: usize = 64;

const TILE_RECORD_LENGTH: usize = 55;
const STATE_DEVICE_CHAIN_LENGTH: usize = 1 + MAX_CHAIN_LENGTH * TILE_RECORD_LENGTH + 1;
const GET_TILE_STATE_LENGTH: usize = 6;
const STATE_TILE_STATE_LENGTH: usize = 5 + PIXELS_PER_MESSAGE * COLOR_LENGTH;
const SET_TILE_STATE_LENGTH: usize = 10 + PIXELS_PER_MESSAGE * COLOR_LENGTH;

/// One tile as described in StateDeviceChain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TileRecord {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub user_x: f32,
    pub user_y: f32,
    pub width: u8,
    pub height: u8,
    pub hardware: HardwareVersion,
    pub firmware: FirmwareVersion,
}

impl TileRecord {
    pub fn to_tile(&self) -> Tile {
        Tile {
            user_x: self.user_x,
            user_y: self.user_y,
            width: self.width,
            height: self.height,
            rotation: Rotation::from_accelerometer(self.accel_x, self.accel_y, self.accel_z),
        }
    }

    fn encode(&self, buf: &mut impl BufMut) {
        buf.put_i16_le(self.accel_x);
        buf.put_i16_le(self.accel_y);
        buf.put_i16_le(self.accel_z);
        buf.put_bytes(0, 2);
        buf.put_f32_le(self.user_x);
        buf.put_f32_le(self.user_y);
        buf.put_u8(self.width);
        buf.put_u8(self.height);
        buf.put_u8(0);
        buf.put_u32_le(self.hardware.vendor_id);
        buf.put_u32_le(self.hardware.product_id);
        buf.put_u32_le(self.hardware.version);
        // build timestamp and reserved
        buf.put_bytes(0, 16);
        buf.put_u16_le(self.firmware.minor);
        buf.put_u16_le(self.firmware.major);
        buf.put_bytes(0, 4);
    }

    fn decode(buf: &mut impl Buf) -> Self {
        let accel_x = buf.get_i16_le();
        let accel_y = buf.get_i16_le();
        let accel_z = buf.get_i16_le();
        buf.advance(2);
        let user_x = buf.get_f32_le();
        let user_y = buf.get_f32_le();
        let width = buf.get_u8();
        let height = buf.get_u8();
        buf.advance(1);
        let hardware = HardwareVersion {
            vendor_id: buf.get_u32_le(),
            product_id: buf.get_u32_le(),
            version: buf.get_u32_le(),
        };
        buf.advance(16);
        let minor = buf.get_u16_le();
        let major = buf.get_u16_le();
        buf.advance(4);
        Self {
            accel_x,
            accel_y,
            accel_z,
            user_x,
            user_y,
            width,
            height,
            hardware,
            firmware: FirmwareVersion::new(major, minor),
        }
    }
}

/// StateDeviceChain: a start index, sixteen record slots and the live count.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DeviceChain {
    pub start_index: u8,
    pub records: Vec<TileRecord>,
    pub total_count: u8,
}

impl DeviceChain {
    pub fn decode(payload: &[u8]) -> Result<Self, MalformedMessage> {
        require_len(payload, STATE_DEVICE_CHAIN_LENGTH)?;
        let mut buf = &payload[..STATE_DEVICE_CHAIN_LENGTH];
        let start_index = buf.get_u8();
        let records = (0..MAX_CHAIN_LENGTH)
            .map(|_| TileRecord::decode(&mut buf))
            .collect();
        let total_count = buf.get_u8();
        Ok(Self {
            start_index,
            records,
            total_count,
        })
    }

    /// Encodes the chain, padding unused record slots with zeros.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(STATE_DEVICE_CHAIN_LENGTH);
        payload.put_u8(self.start_index);
        for slot in 0..MAX_CHAIN_LENGTH {
            self.records
                .get(slot)
                .copied()
                .unwrap_or_default()
                .encode(&mut payload);
        }
        payload.put_u8(self.total_count);
        payload
    }

    /// The live records, validated against the slot count.
    pub fn live_records(&self) -> Result<&[TileRecord], MalformedMessage> {
        let start = usize::from(self.start_index);
        let end = start + usize::from(self.total_count);
        if end > MAX_CHAIN_LENGTH {
            return Err(MalformedMessage::TileRangeOutOfBounds {
                start,
                end,
                capacity: MAX_CHAIN_LENGTH,
            });
        }
        Ok(&self.records[start..end])
    }
}

/// GetTileState64 request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct GetTileState {
    pub tile_index: u8,
    pub length: u8,
    pub x: u8,
    pub y: u8,
    pub width: u8,
}

impl GetTileState {
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(GET_TILE_STATE_LENGTH);
        payload.put_u8(self.tile_index);
        payload.put_u8(self.length);
        payload.put_u8(0);
        payload.put_u8(self.x);
        payload.put_u8(self.y);
        payload.put_u8(self.width);
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, MalformedMessage> {
        require_len(payload, GET_TILE_STATE_LENGTH)?;
        let mut buf = payload;
        let tile_index = buf.get_u8();
        let length = buf.get_u8();
        buf.advance(1);
        Ok(Self {
            tile_index,
            length,
            x: buf.get_u8(),
            y: buf.get_u8(),
            width: buf.get_u8(),
        })
    }
}

/// StateTileState64 reply carrying one tile's pixels.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct TileState {
    pub tile_index: u8,
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub colors: [Color; PIXELS_PER_MESSAGE],
}

impl TileState {
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(STATE_TILE_STATE_LENGTH);
        payload.put_u8(self.tile_index);
        payload.put_u8(0);
        payload.put_u8(self.x);
        payload.put_u8(self.y);
        payload.put_u8(self.width);
        for color in &self.colors {
            color.encode(&mut payload);
        }
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, MalformedMessage> {
        require_len(payload, STATE_TILE_STATE_LENGTH)?;
        let mut buf = payload;
        let tile_index = buf.get_u8();
        buf.advance(1);
        let x = buf.get_u8();
        let y = buf.get_u8();
        let width = buf.get_u8();
        Ok(Self {
            tile_index,
            x,
            y,
            width,
            colors: decode_colors(&mut buf),
        })
    }
}

/// SetTileState64 request painting one tile.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SetTileState {
    pub tile_index: u8,
    pub length: u8,
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub duration_ms: u32,
    pub colors: [Color; PIXELS_PER_MESSAGE],
}

impl SetTileState {
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(SET_TILE_STATE_LENGTH);
        payload.put_u8(self.tile_index);
        payload.put_u8(self.length);
        payload.put_u8(0);
        payload.put_u8(self.x);
        payload.put_u8(self.y);
        payload.put_u8(self.width);
        payload.put_u32_le(self.duration_ms);
        for color in &self.colors {
            color.encode(&mut payload);
        }
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, MalformedMessage> {
        require_len(payload, SET_TILE_STATE_LENGTH)?;
        let mut buf = payload;
        let tile_index = buf.get_u8();
        let length = buf.get_u8();
        buf.advance(1);
        let x = buf.get_u8();
        let y = buf.get_u8();
        let width = buf.get_u8();
        let duration_ms = buf.get_u32_le();
        Ok(Self {
            tile_index,
            length,
            x,
            y,
            width,
            duration_ms,
            colors: decode_colors(&mut buf),
        })
    }
}

fn decode_colors(buf: &mut impl Buf) -> [Color; PIXELS_PER_MESSAGE] {
    let mut colors = [Color::BLACK; PIXELS_PER_MESSAGE];
    for color in &mut colors {
        *color = Color::decode(buf);
    }
    colors
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(width: u8) -> TileRecord {
        TileRecord {
            accel_x: -3,
            accel_y: -200,
            accel_z: 10,
            user_x: 1.5,
            user_y: -0.5,
            width,
            height: 8,
            hardware: HardwareVersion {
                vendor_id: 1,
                product_id: 55,
                version: 10,
            },
            firmware: FirmwareVersion::new(3, 50),
        }
    }

    #[test]
    fn device_chain_layout() {
        let chain = DeviceChain {
            start_index: 0,
            records: vec![record(8)],
            total_count: 1,
        };
        let payload = chain.encode();

        assert_eq!(882, payload.len());
        // first record: user_x at +8, width at +16, product id at +23, firmware major at +49
        assert_eq!(1.5_f32.to_le_bytes(), payload[1 + 8..1 + 12]);
        assert_eq!(8, payload[1 + 16]);
        assert_eq!(55_u32.to_le_bytes(), payload[1 + 23..1 + 27]);
        assert_eq!(50_u16.to_le_bytes(), payload[1 + 47..1 + 49]);
        assert_eq!(3_u16.to_le_bytes(), payload[1 + 49..1 + 51]);
        assert_eq!(1, payload[881]);
    }

    #[test]
    fn device_chain_decodes_live_records() {
        let chain = DeviceChain {
            start_index: 2,
            records: vec![record(8), record(8), record(4)],
            total_count: 1,
        };
        let decoded = DeviceChain::decode(&chain.encode()).expect("chain should decode");

        assert_eq!(2, decoded.start_index);
        assert_eq!(&[record(4)], decoded.live_records().expect("range is valid"));
    }

    #[test]
    fn device_chain_rejects_ranges_past_the_last_slot() {
        let chain = DeviceChain {
            start_index: 10,
            records: Vec::new(),
            total_count: 7,
        };
        assert_matches!(
            chain.live_records(),
            Err(MalformedMessage::TileRangeOutOfBounds { start: 10, end: 17, capacity: 16 })
        );
    }

    #[test]
    fn device_chain_rejects_truncated_payloads() {
        assert_matches!(
            DeviceChain::decode(&[0; 100]),
            Err(MalformedMessage::TooShort { expected: 882, actual: 100 })
        );
    }

    #[test]
    fn tile_record_rotation_comes_from_the_accelerometer() {
        assert_eq!(Rotation::RightSideUp, record(8).to_tile().rotation);
    }

    #[test]
    fn set_tile_state_layout() {
        let mut colors = [Color::BLACK; PIXELS_PER_MESSAGE];
        colors[63].brightness = 0xabcd;
        let payload = SetTileState {
            tile_index: 3,
            length: 1,
            x: 0,
            y: 0,
            width: 8,
            duration_ms: 1000,
            colors,
        }
        .encode();

        assert_eq!(522, payload.len());
        assert_eq!([3, 1, 0, 0, 0, 8], payload[..6]);
        assert_eq!(1000_u32.to_le_bytes(), payload[6..10]);
        assert_eq!([0xcd, 0xab], payload[10 + 63 * 8 + 4..10 + 63 * 8 + 6]);
    }

    #[test]
    fn tile_state_decodes_pixels_in_order() {
        let mut colors = [Color::BLACK; PIXELS_PER_MESSAGE];
        for (k, color) in colors.iter_mut().enumerate() {
            color.hue = k as u16;
        }
        let state = TileState {
            tile_index: 1,
            x: 0,
            y: 0,
            width: 8,
            colors,
        };
        let payload = state.encode();

        assert_eq!(517, payload.len());
        assert_eq!(state, TileState::decode(&payload).expect("state should decode"));
    }

    #[test]
    fn get_tile_state_layout() {
        let request = GetTileState {
            tile_index: 0,
            length: 5,
            x: 0,
            y: 0,
            width: 8,
        };
        let payload = request.encode();
        assert_eq!(vec![0, 5, 0, 0, 0, 8], payload);
        assert_eq!(request, GetTileState::decode(&payload).expect("request should decode"));
    }
}
