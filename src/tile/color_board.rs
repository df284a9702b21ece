use crate::color::Color;

/// A sparse frame of colours addressed `[x][y]`.
///
/// Empty cells mean "not part of this frame".
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ColorBoard {
    cells: Vec<Vec<Option<Color>>>,
    height: usize,
}

impl ColorBoard {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![vec![None; height]; width],
            height,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the colour at `(x, y)`; out-of-range coordinates are empty.
    ///
    /// ```
    /// use lifxlan::{Color, ColorBoard};
    ///
    /// let mut board = ColorBoard::new(2, 2);
    /// assert!(board.set(1, 0, Some(Color::BLACK)));
    /// assert_eq!(Some(Color::BLACK), board.get(1, 0));
    /// assert_eq!(None, board.get(-1, 0));
    /// assert!(!board.set(2, 0, Some(Color::BLACK)));
    /// ```
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        *self.cells.get(x)?.get(y)?
    }

    /// Stores `color` at `(x, y)`, returning `false` when out of range.
    pub fn set(&mut self, x: i32, y: i32, color: Option<Color>) -> bool {
        let cell = usize::try_from(x)
            .ok()
            .zip(usize::try_from(y).ok())
            .and_then(|(x, y)| self.cells.get_mut(x)?.get_mut(y));
        match cell {
            Some(cell) => {
                *cell = color;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn new_board_is_empty() {
        let board = ColorBoard::new(3, 2);
        assert_eq!((3, 2), (board.width(), board.height()));
        for x in 0..3 {
            for y in 0..2 {
                assert_eq!(None, board.get(x, y));
            }
        }
    }

    #[test]
    fn set_overwrites_and_clears() {
        let red = Color::from_rgb8(255, 0, 0, 3500);
        let mut board = ColorBoard::new(1, 1);

        assert!(board.set(0, 0, Some(red)));
        assert_eq!(Some(red), board.get(0, 0));
        assert!(board.set(0, 0, None));
        assert_eq!(None, board.get(0, 0));
        assert!(!board.set(0, -1, Some(red)));
    }
}
