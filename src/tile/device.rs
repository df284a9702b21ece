use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use tracing::{debug, instrument, trace};

use super::board::{Board, BoardData};
use super::color_board::ColorBoard;
use super::payload::{DeviceChain, GetTileState, PIXELS_PER_MESSAGE, SetTileState, TileState};
use super::tile::Tile;
use crate::ack::wait_for_acks;
use crate::color::Color;
use crate::context::CallContext;
use crate::device::Device;
use crate::error::LifxError;
use crate::header::AckResFlags;
use crate::light::{LightDevice, transition_millis};
use crate::protocol::MessageType;
use crate::target::Target;
use crate::transport::Connection;

/// A light with a chain of matrix tiles.
#[derive(Debug, Clone)]
pub struct TileDevice {
    light: LightDevice,
    start_index: u8,
    tiles: Vec<Tile>,
    board: BoardData,
}

impl TileDevice {
    /// Probes `device` as a light, then reads its device chain and stitches
    /// the board.
    ///
    /// # Errors
    ///
    /// Returns [`LifxError::Unhandled`] when either probe is not supported,
    /// [`LifxError::NoTiles`] for an empty chain, and a malformed-message
    /// error when the chain range does not fit the record slots.
    #[instrument(skip_all, fields(target = %device.target()))]
    pub async fn wrap(
        ctx: &CallContext,
        conn: &dyn Connection,
        device: Arc<Device>,
    ) -> Result<Self, LifxError> {
        let light = LightDevice::wrap(ctx, conn, device).await?;
        let response = light
            .device()
            .request(
                ctx,
                conn,
                MessageType::GET_DEVICE_CHAIN,
                &[],
                MessageType::STATE_DEVICE_CHAIN,
            )
            .await?;

        let chain = DeviceChain::decode(response.payload())?;
        if chain.total_count == 0 {
            return Err(LifxError::NoTiles);
        }
        let records = chain.live_records()?;
        if let Some(first) = records.first() {
            light
                .device()
                .cache_hardware_version_if_unset(first.hardware);
        }

        let tiles: Vec<Tile> = records.iter().map(|record| record.to_tile()).collect();
        let board = BoardData::parse(&tiles);
        debug!(
            tiles = tiles.len(),
            width = board.width(),
            height = board.height(),
            "tile chain wrapped"
        );

        Ok(Self {
            light,
            start_index: chain.start_index,
            tiles,
            board,
        })
    }

    /// The wrapped base device.
    #[must_use]
    pub fn device(&self) -> &Arc<Device> {
        self.light.device()
    }

    #[must_use]
    pub fn light(&self) -> &LightDevice {
        &self.light
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.light.target()
    }

    #[must_use]
    pub fn start_index(&self) -> u8 {
        self.start_index
    }

    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    #[must_use]
    pub fn board(&self) -> &BoardData {
        &self.board
    }

    /// Reads every tile's pixels onto a board-sized [`ColorBoard`].
    ///
    /// Must not run concurrently with another read on the same connection.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or decoding errors.
    #[instrument(skip_all, fields(target = %self.target(), tiles = self.tiles.len()))]
    pub async fn get_colors(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
    ) -> Result<ColorBoard, LifxError> {
        let request = GetTileState {
            tile_index: self.start_index,
            length: u8::try_from(self.tiles.len()).unwrap_or(u8::MAX),
            x: 0,
            y: 0,
            width: self.tiles.first().map_or(0, |tile| tile.width),
        };
        let device = self.device();
        let sequence = device
            .send(
                ctx,
                conn,
                AckResFlags::NONE,
                MessageType::GET_TILE_STATE_64,
                &request.encode(),
            )
            .await?;

        let mut board = ColorBoard::new(self.board.width(), self.board.height());
        let mut received = HashSet::with_capacity(self.tiles.len());
        while received.len() < self.tiles.len() {
            let response = device
                .read_reply(ctx, conn, sequence, MessageType::STATE_TILE_STATE_64)
                .await?;
            let state = TileState::decode(response.payload())?;

            let Some(tile_index) = usize::from(state.tile_index)
                .checked_sub(usize::from(self.start_index))
                .filter(|index| *index < self.tiles.len())
            else {
                trace!(tile_index = state.tile_index, "dropping state of a foreign tile");
                continue;
            };
            if !received.insert(tile_index) {
                trace!(tile_index, "dropping duplicate tile state");
                continue;
            }
            self.paint_tile(&mut board, tile_index, &state.colors);
        }

        Ok(board)
    }

    fn paint_tile(&self, board: &mut ColorBoard, tile_index: usize, colors: &[Color]) {
        let tile = &self.tiles[tile_index];
        let width = usize::from(tile.width).max(1);
        for (k, color) in colors.iter().enumerate().take(tile.pixel_count()) {
            let Some(at) = self.board.board_coordinate(tile_index, k / width, k % width) else {
                continue;
            };
            board.set(at.x, at.y, Some(*color));
        }
    }

    /// Repaints every tile from `colors`.
    ///
    /// Pixels without a colour are painted black; there is no partial-tile
    /// update. With `ack` set, one ack wait covers all tile messages.
    ///
    /// # Errors
    ///
    /// Returns cancellation, socket or partial-ack errors.
    #[instrument(skip_all, fields(target = %self.target(), tiles = self.tiles.len(), ack))]
    pub async fn set_colors(
        &self,
        ctx: &CallContext,
        conn: &dyn Connection,
        colors: &ColorBoard,
        transition: Duration,
        ack: bool,
    ) -> Result<(), LifxError> {
        ctx.check()?;

        let device = self.device();
        let range = device.temperature_range();
        let black = Color::BLACK.sanitize(range);
        let duration_ms = transition_millis(transition);
        let mut payloads: Vec<SetTileState> = (0..self.tiles.len())
            .map(|i| SetTileState {
                tile_index: self.start_index.wrapping_add(u8::try_from(i).unwrap_or(u8::MAX)),
                length: 1,
                x: 0,
                y: 0,
                width: self.tiles[i].width,
                duration_ms,
                colors: [black; PIXELS_PER_MESSAGE],
            })
            .collect();

        for x in 0..to_i32(self.board.width()) {
            for y in 0..to_i32(self.board.height()) {
                let Some(color) = colors.get(x, y) else {
                    continue;
                };
                let Some(index) = self.board.index(x, y) else {
                    continue;
                };
                let width = usize::from(self.tiles[index.tile_index].width);
                let pixel = index.local_x * width + index.local_y;
                if let Some(slot) = payloads[index.tile_index].colors.get_mut(pixel) {
                    *slot = color.sanitize(range);
                }
            }
        }

        let encoded: Vec<Vec<u8>> = payloads.iter().map(SetTileState::encode).collect();
        let flags = AckResFlags::ack_if(ack);
        let sequences = try_join_all(encoded.iter().map(|payload| {
            device.send(ctx, conn, flags, MessageType::SET_TILE_STATE_64, payload)
        }))
        .await?;

        if ack {
            wait_for_acks(ctx, conn, device.source(), &sequences).await?;
        }
        Ok(())
    }
}

impl Board for TileDevice {
    fn width(&self) -> usize {
        self.board.width()
    }

    fn height(&self) -> usize {
        self.board.height()
    }

    fn on_tile(&self, x: i32, y: i32) -> bool {
        self.board.on_tile(x, y)
    }
}

impl fmt::Display for TileDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.device(), f)
    }
}

fn to_i32(size: usize) -> i32 {
    i32::try_from(size).unwrap_or(i32::MAX)
}
