use serde::Serialize;

use super::tile::{Coordinate, Tile};

/// Anything addressable as a rectangular board of pixels.
pub trait Board {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Returns whether board coordinate `(x, y)` lands on a tile pixel.
    fn on_tile(&self, x: i32, y: i32) -> bool;
}

/// Which tile pixel a board cell shows.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub struct IndexData {
    /// Position of the tile within the chain slice.
    pub tile_index: usize,
    pub local_x: usize,
    pub local_y: usize,
}

/// The trimmed board stitched from a tile chain.
///
/// Cells are addressed `[x][y]` with `(0, 0)` at the minimum corner of the
/// bounding box over every tile pixel.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BoardData {
    width: usize,
    height: usize,
    data: Vec<Vec<Option<IndexData>>>,
    reverse: Vec<Vec<Vec<Coordinate>>>,
}

impl BoardData {
    /// Stitches `tiles` into one board.
    ///
    /// Overlapping pixels resolve to the later tile.
    ///
    /// ```
    /// use lifxlan::{Board, BoardData, Rotation, Tile};
    ///
    /// let tile = Tile { user_x: 0.0, user_y: 0.0, width: 8, height: 8, rotation: Rotation::RightSideUp };
    /// let board = BoardData::parse(&[tile, Tile { user_x: 1.0, ..tile }]);
    /// assert_eq!((16, 8), (board.width(), board.height()));
    /// assert!(board.on_tile(15, 0));
    /// assert!(!board.on_tile(16, 0));
    /// ```
    #[must_use]
    pub fn parse(tiles: &[Tile]) -> Self {
        let placed: Vec<_> = tiles.iter().map(Tile::board_coordinates).collect();
        let Some(min_x) = placed.iter().map(|(_, min, _)| min.x).min() else {
            return Self::default();
        };
        let min_y = placed.iter().map(|(_, min, _)| min.y).min().unwrap_or(min_x);
        let max_x = placed.iter().map(|(_, _, max)| max.x).max().unwrap_or(min_x);
        let max_y = placed.iter().map(|(_, _, max)| max.y).max().unwrap_or(min_y);

        let width = usize::try_from(max_x - min_x).unwrap_or_default();
        let height = usize::try_from(max_y - min_y).unwrap_or_default();
        let mut data = vec![vec![None; height]; width];
        let mut reverse = Vec::with_capacity(placed.len());

        for (tile_index, (coordinates, _, _)) in placed.into_iter().enumerate() {
            let shifted: Vec<Vec<Coordinate>> = coordinates
                .into_iter()
                .map(|column| {
                    column
                        .into_iter()
                        .map(|c| Coordinate::new(c.x - min_x, c.y - min_y))
                        .collect()
                })
                .collect();

            for (local_x, column) in shifted.iter().enumerate() {
                for (local_y, board) in column.iter().enumerate() {
                    if let Some(cell) = cell_mut(&mut data, board.x, board.y) {
                        *cell = Some(IndexData {
                            tile_index,
                            local_x,
                            local_y,
                        });
                    }
                }
            }
            reverse.push(shifted);
        }

        Self {
            width,
            height,
            data,
            reverse,
        }
    }

    /// Returns the tile pixel at board coordinate `(x, y)`, if any.
    #[must_use]
    pub fn index(&self, x: i32, y: i32) -> Option<IndexData> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        *self.data.get(x)?.get(y)?
    }

    /// Returns the board coordinate of local pixel `(local_x, local_y)` on a tile.
    #[must_use]
    pub fn board_coordinate(
        &self,
        tile_index: usize,
        local_x: usize,
        local_y: usize,
    ) -> Option<Coordinate> {
        self.reverse
            .get(tile_index)?
            .get(local_x)?
            .get(local_y)
            .copied()
    }

    /// Number of tiles the board was stitched from.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.reverse.len()
    }
}

impl Board for BoardData {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn on_tile(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some()
    }
}

fn cell_mut(
    data: &mut [Vec<Option<IndexData>>],
    x: i32,
    y: i32,
) -> Option<&mut Option<IndexData>> {
    let x = usize::try_from(x).ok()?;
    let y = usize::try_from(y).ok()?;
    data.get_mut(x)?.get_mut(y)
}
