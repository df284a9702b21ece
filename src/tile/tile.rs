use std::fmt;

use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// A point on a tile or on the stitched board.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orientation of a tile, derived from its accelerometer reading.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Display, EnumIter, Serialize)]
pub enum Rotation {
    #[default]
    RightSideUp,
    RotateRight,
    RotateLeft,
    FaceDown,
    FaceUp,
    UpsideDown,
}

impl Rotation {
    /// Picks the orientation from the dominant accelerometer axis.
    ///
    /// The reading `(-1, -1, -1)` is reported by tiles without a sensor and
    /// maps to [`Rotation::RightSideUp`].
    ///
    /// ```
    /// use lifxlan::Rotation;
    ///
    /// assert_eq!(Rotation::RightSideUp, Rotation::from_accelerometer(-1, -1, -1));
    /// assert_eq!(Rotation::RotateRight, Rotation::from_accelerometer(100, 10, 10));
    /// assert_eq!(Rotation::UpsideDown, Rotation::from_accelerometer(0, 100, 0));
    /// ```
    #[must_use]
    pub fn from_accelerometer(x: i16, y: i16, z: i16) -> Self {
        if (x, y, z) == (-1, -1, -1) {
            return Self::RightSideUp;
        }

        let (abs_x, abs_y, abs_z) = (x.unsigned_abs(), y.unsigned_abs(), z.unsigned_abs());
        if abs_x > abs_y && abs_x > abs_z {
            return if x > 0 {
                Self::RotateRight
            } else {
                Self::RotateLeft
            };
        }
        if abs_z > abs_x && abs_z > abs_y {
            return if z > 0 { Self::FaceDown } else { Self::FaceUp };
        }
        if y > 0 {
            Self::UpsideDown
        } else {
            Self::RightSideUp
        }
    }
}

/// One LED panel of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tile {
    /// Horizontal position in tile widths.
    pub user_x: f32,
    /// Vertical position in tile heights.
    pub user_y: f32,
    pub width: u8,
    pub height: u8,
    pub rotation: Rotation,
}

impl Tile {
    /// Maps local pixel `(x, y)` to its rotated position within the tile.
    ///
    /// Face-up and face-down tiles have no meaningful wall orientation and
    /// are treated as right side up.
    #[must_use]
    pub fn rotate(&self, x: i32, y: i32) -> Coordinate {
        let width = i32::from(self.width);
        let height = i32::from(self.height);
        match self.rotation {
            Rotation::RightSideUp | Rotation::FaceUp | Rotation::FaceDown => {
                Coordinate::new(y, width - 1 - x)
            }
            Rotation::UpsideDown => Coordinate::new(height - 1 - y, x),
            Rotation::RotateRight => Coordinate::new(width - 1 - x, height - 1 - y),
            Rotation::RotateLeft => Coordinate::new(x, y),
        }
    }

    /// Places every pixel of the tile on the unnormalized global grid.
    ///
    /// Returns the `[x][y]` grid of global positions together with the
    /// inclusive minimum and exclusive maximum over those positions.
    #[must_use]
    pub fn board_coordinates(&self) -> (Vec<Vec<Coordinate>>, Coordinate, Coordinate) {
        let base = Coordinate::new(
            floor_scaled(self.width, self.user_x),
            floor_scaled(self.height, self.user_y),
        );
        let mut min = Coordinate::new(i32::MAX, i32::MAX);
        let mut max = Coordinate::new(i32::MIN, i32::MIN);

        let coordinates = (0..i32::from(self.width))
            .map(|i| {
                (0..i32::from(self.height))
                    .map(|j| {
                        let rotated = self.rotate(i, j);
                        let global = Coordinate::new(rotated.x + base.x, rotated.y + base.y);
                        min.x = min.x.min(global.x);
                        min.y = min.y.min(global.y);
                        max.x = max.x.max(global.x + 1);
                        max.y = max.y.max(global.y + 1);
                        global
                    })
                    .collect()
            })
            .collect();

        (coordinates, min, max)
    }

    pub(crate) fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn floor_scaled(size: u8, position: f32) -> i32 {
    (f32::from(size) * position).floor() as i32
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    fn tile(user_x: f32, user_y: f32, width: u8, height: u8, rotation: Rotation) -> Tile {
        Tile {
            user_x,
            user_y,
            width,
            height,
            rotation,
        }
    }

    #[rstest]
    #[case((-1, -1, -1), Rotation::RightSideUp)]
    #[case((0, -100, 0), Rotation::RightSideUp)]
    #[case((0, 100, 0), Rotation::UpsideDown)]
    #[case((200, 10, -10), Rotation::RotateRight)]
    #[case((-200, 10, -10), Rotation::RotateLeft)]
    #[case((5, 10, 300), Rotation::FaceDown)]
    #[case((5, 10, -300), Rotation::FaceUp)]
    #[case((50, 50, 0), Rotation::UpsideDown)]
    #[case((50, -50, 0), Rotation::RightSideUp)]
    fn rotation_follows_dominant_axis(#[case] reading: (i16, i16, i16), #[case] expected: Rotation) {
        let (x, y, z) = reading;
        assert_eq!(expected, Rotation::from_accelerometer(x, y, z));
    }

    #[test]
    fn rotation_names() {
        let names: Vec<String> = Rotation::iter().map(|rotation| rotation.to_string()).collect();
        assert_eq!(
            vec![
                "RightSideUp",
                "RotateRight",
                "RotateLeft",
                "FaceDown",
                "FaceUp",
                "UpsideDown"
            ],
            names
        );
    }

    #[rstest]
    #[case((0, 0), Coordinate::new(0, 3))]
    #[case((0, 3), Coordinate::new(3, 3))]
    #[case((3, 3), Coordinate::new(3, 0))]
    #[case((3, 0), Coordinate::new(0, 0))]
    fn right_side_up_turns_local_axes(#[case] local: (i32, i32), #[case] expected: Coordinate) {
        let tile = tile(0.0, 0.0, 4, 4, Rotation::RightSideUp);
        assert_eq!(expected, tile.rotate(local.0, local.1));
    }

    #[test]
    fn every_rotation_is_a_bijection_onto_the_tile() {
        for rotation in Rotation::iter() {
            let tile = tile(0.0, 0.0, 3, 5, rotation);
            let (coordinates, min, max) = tile.board_coordinates();
            let mut seen: Vec<Coordinate> = coordinates.into_iter().flatten().collect();
            seen.sort_by_key(|c| (c.x, c.y));
            seen.dedup();

            assert_eq!(15, seen.len(), "{rotation} maps two pixels together");
            assert_eq!(Coordinate::new(0, 0), min, "{rotation}");
            assert_eq!(15, (max.x - min.x) * (max.y - min.y), "{rotation}");
        }
    }

    #[test]
    fn eight_by_eight_tile_at_origin() {
        let (coordinates, min, max) = tile(0.0, 0.0, 8, 8, Rotation::RightSideUp).board_coordinates();

        assert_eq!(Coordinate::new(0, 0), min);
        assert_eq!(Coordinate::new(8, 8), max);
        for (j, coordinate) in coordinates[0].iter().enumerate() {
            assert_eq!(Coordinate::new(j as i32, 7), *coordinate);
        }
    }

    #[test]
    fn fractional_positions_round_down() {
        let (coordinates, min, max) =
            tile(-0.5, 0.5, 2, 2, Rotation::RightSideUp).board_coordinates();

        assert_eq!(
            vec![
                vec![Coordinate::new(-1, 2), Coordinate::new(0, 2)],
                vec![Coordinate::new(-1, 1), Coordinate::new(0, 1)],
            ],
            coordinates
        );
        assert_eq!(Coordinate::new(-1, 1), min);
        assert_eq!(Coordinate::new(1, 3), max);
    }
}
