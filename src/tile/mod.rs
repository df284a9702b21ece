//! Matrix tile chains: geometry, board stitching and the tile wrapper.

mod board;
mod color_board;
mod device;
pub(crate) mod payload;
#[allow(clippy::module_inception)]
mod tile;

pub use self::board::{Board, BoardData, IndexData};
pub use self::color_board::ColorBoard;
pub use self::device::TileDevice;
pub use self::tile::{Coordinate, Rotation, Tile};
