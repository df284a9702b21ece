use std::fmt::{self, Display, Formatter};

use crate::cli::report::TileLayoutReport;

use super::painter::Painter;
use super::table::Table;

/// Renders `tile layout`: the tile table, then the board map.
pub(crate) struct TileLayoutView<'a> {
    report: &'a TileLayoutReport,
    painter: &'a Painter,
}

impl<'a> TileLayoutView<'a> {
    pub(crate) fn new(report: &'a TileLayoutReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }
}

impl Display for TileLayoutView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rows = self
            .report
            .tiles
            .iter()
            .map(|tile| {
                vec![
                    tile.index.to_string(),
                    format!("({}, {})", tile.user_x, tile.user_y),
                    format!("{}x{}", tile.width, tile.height),
                    tile.rotation.to_string(),
                ]
            })
            .collect();
        writeln!(
            f,
            "{}",
            Table::grid(["tile", "position", "size", "rotation"], rows)
        )?;
        writeln!(
            f,
            "{}",
            self.painter.heading(format!(
                "Board {}x{}",
                self.report.width, self.report.height
            ))
        )?;
        for row in &self.report.rows {
            writeln!(f, "{}", self.painter.muted(row))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::cli::report::TileReport;
    use crate::tile::Rotation;

    #[test]
    fn layout_view_draws_tiles_and_board() {
        let report = TileLayoutReport {
            target: "d0:73:d5:01:02:03".parse().expect("target parses"),
            tiles: vec![
                TileReport {
                    index: 0,
                    user_x: 0.0,
                    user_y: 0.0,
                    width: 2,
                    height: 2,
                    rotation: Rotation::RightSideUp,
                },
                TileReport {
                    index: 1,
                    user_x: 1.0,
                    user_y: 1.0,
                    width: 2,
                    height: 2,
                    rotation: Rotation::RightSideUp,
                },
            ],
            width: 4,
            height: 4,
            rows: vec!["..##".into(), "..##".into(), "##..".into(), "##..".into()],
        };
        let painter = Painter::new(false);

        assert_snapshot!(TileLayoutView::new(&report, &painter).to_string(), @r"
        ╭──────┬──────────┬──────┬─────────────╮
        │ tile │ position │ size │ rotation    │
        ├──────┼──────────┼──────┼─────────────┤
        │ 0    │ (0, 0)   │ 2x2  │ RightSideUp │
        │ 1    │ (1, 1)   │ 2x2  │ RightSideUp │
        ╰──────┴──────────┴──────┴─────────────╯
        Board 4x4
        ..##
        ..##
        ##..
        ##..
        ");
    }
}
