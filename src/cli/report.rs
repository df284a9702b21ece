use std::net::SocketAddr;

use serde::Serialize;

use crate::color::Color;
use crate::device::{Device, PowerLevel};
use crate::product::{Features, FirmwareVersion, HardwareVersion};
use crate::target::Target;
use crate::tile::{Board, Rotation, Tile, TileDevice};

/// What the CLI reports about one device.
///
/// Fields the device did not answer for stay `None` and are omitted from JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub target: Target,
    pub addr: SocketAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<FirmwareVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
}

impl DeviceReport {
    /// Snapshot of what `device` has cached so far.
    #[must_use]
    pub fn from_device(device: &Device) -> Self {
        let product = device.product();
        let firmware = device.firmware();
        let features = product
            .as_ref()
            .map(|product| product.features_at(firmware.unwrap_or_default()));

        Self {
            target: device.target(),
            addr: device.addr(),
            label: device.label(),
            product: product.map(|product| product.name),
            hardware: device.hardware_version(),
            firmware,
            features,
        }
    }
}

/// One tile row of `tile layout`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TileReport {
    pub(crate) index: u8,
    pub(crate) user_x: f32,
    pub(crate) user_y: f32,
    pub(crate) width: u8,
    pub(crate) height: u8,
    pub(crate) rotation: Rotation,
}

/// Tiles of a chain plus the stitched board drawn as text rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TileLayoutReport {
    pub(crate) target: Target,
    pub(crate) tiles: Vec<TileReport>,
    pub(crate) width: usize,
    pub(crate) height: usize,
    /// Board rows from the highest Y down, `#` on a tile and `.` off it.
    pub(crate) rows: Vec<String>,
}

impl TileLayoutReport {
    pub(crate) fn from_tiles(tiles: &TileDevice) -> Self {
        let records = tiles
            .tiles()
            .iter()
            .zip(tiles.start_index()..)
            .map(|(tile, index)| TileReport::new(index, tile))
            .collect();

        Self {
            target: tiles.target(),
            tiles: records,
            width: tiles.width(),
            height: tiles.height(),
            rows: board_rows(tiles),
        }
    }
}

impl TileReport {
    fn new(index: u8, tile: &Tile) -> Self {
        Self {
            index,
            user_x: tile.user_x,
            user_y: tile.user_y,
            width: tile.width,
            height: tile.height,
            rotation: tile.rotation,
        }
    }
}

/// JSON result of a command that changes device state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ActionResult {
    Power {
        target: Target,
        power: PowerLevel,
    },
    TileFill {
        target: Target,
        tiles: usize,
        color: Color,
    },
}

pub(crate) fn board_rows(board: &dyn Board) -> Vec<String> {
    let width = i32::try_from(board.width()).unwrap_or(i32::MAX);
    let height = i32::try_from(board.height()).unwrap_or(i32::MAX);
    (0..height)
        .rev()
        .map(|y| {
            (0..width)
                .map(|x| if board.on_tile(x, y) { '#' } else { '.' })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::device::ServiceType;
    use crate::tile::BoardData;

    #[test]
    fn rows_put_the_highest_y_first() {
        let tiles = [
            Tile {
                user_x: 0.0,
                user_y: 0.0,
                width: 2,
                height: 2,
                rotation: Rotation::RotateLeft,
            },
            Tile {
                user_x: 1.0,
                user_y: 1.0,
                width: 2,
                height: 2,
                rotation: Rotation::RotateLeft,
            },
        ];
        let board = BoardData::parse(&tiles);

        assert_eq!(
            vec!["..##".to_owned(), "..##".to_owned(), "##..".to_owned(), "##..".to_owned()],
            board_rows(&board)
        );
    }

    #[test]
    fn action_results_are_tagged() {
        let result = ActionResult::Power {
            target: "d0:73:d5:01:02:03".parse().expect("target parses"),
            power: PowerLevel::ON,
        };
        insta::assert_snapshot!(
            serde_json::to_string(&result).expect("result serializes"),
            @r#"{"action":"power","target":"d0:73:d5:01:02:03","power":"on"}"#
        );
    }

    #[test]
    fn device_report_omits_unknown_fields_from_json() {
        let device = Device::new(
            "192.0.2.10:56700".parse().expect("address parses"),
            ServiceType::UDP,
            "d0:73:d5:01:02:03".parse().expect("target parses"),
        );
        let report = DeviceReport::from_device(&device);

        insta::assert_snapshot!(
            serde_json::to_string(&report).expect("report serializes"),
            @r#"{"target":"d0:73:d5:01:02:03","addr":"192.0.2.10:56700"}"#
        );
    }
}
