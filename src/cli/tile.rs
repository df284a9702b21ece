use std::io;

use anyhow::{Context, Result};
use tracing::{Span, info, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::color::Color;
use crate::terminal::TerminalClient;
use crate::tile::{Board, ColorBoard, TileDevice};

use super::command::{DeviceArgs, FillArgs};
use super::report::{ActionResult, TileLayoutReport};
use super::select::select_device;
use super::ui::{Painter, TileLayoutView};
use super::{OutputFormat, Settings, write_json_line};

/// Executes `tile layout`.
#[instrument(skip_all, level = "info", fields(target = %args.target()))]
pub(crate) async fn layout<W>(
    settings: &Settings,
    args: &DeviceArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let tiles = wrap_tiles(settings, args).await?;
    let report = TileLayoutReport::from_tiles(&tiles);

    match settings.output_format() {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            write!(out, "{}", TileLayoutView::new(&report, &painter))?;
        }
        OutputFormat::Json => write_json_line(out, &report)?,
    }
    Ok(())
}

/// Executes `tile fill`: one colour on every on-tile coordinate, acknowledged.
#[instrument(skip_all, level = "info", fields(target = %args.device().target()))]
pub(crate) async fn fill<W>(
    settings: &Settings,
    args: &FillArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let tiles = wrap_tiles(settings, args.device()).await?;
    let color = args.color();
    let board = filled_board(&tiles, color);
    Span::current().pb_set_message(&format!("Painting {} tile(s)", tiles.tiles().len()));

    let ctx = settings.context();
    let conn = tiles
        .device()
        .dial()
        .await
        .context("failed to open device socket")?;
    tiles
        .set_colors(&ctx, &conn, &board, args.transition(), true)
        .await
        .context("failed to paint tiles")?;
    info!(tiles = tiles.tiles().len(), "tiles painted");

    match settings.output_format() {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(
                out,
                "{} painted {} tile(s) on {}",
                painter.success("✓"),
                tiles.tiles().len(),
                painter.value(tiles.device().to_string())
            )?;
        }
        OutputFormat::Json => write_json_line(
            out,
            &ActionResult::TileFill {
                target: tiles.target(),
                tiles: tiles.tiles().len(),
                color,
            },
        )?,
    }
    Ok(())
}

async fn wrap_tiles(settings: &Settings, args: &DeviceArgs) -> Result<TileDevice> {
    let device = select_device(settings, args).await?;
    Span::current().pb_set_message(&format!("Reading tile chain of {}", device.target()));

    let ctx = settings.context();
    let conn = device.dial().await.context("failed to open device socket")?;
    let target = device.target();
    TileDevice::wrap(&ctx, &conn, device)
        .await
        .with_context(|| format!("failed to read the tile chain of {target}"))
}

fn filled_board(tiles: &TileDevice, color: Color) -> ColorBoard {
    let mut board = ColorBoard::new(tiles.width(), tiles.height());
    for x in (0_i32..).take(tiles.width()) {
        for y in (0_i32..).take(tiles.height()) {
            if tiles.on_tile(x, y) {
                board.set(x, y, Some(color));
            }
        }
    }
    board
}
