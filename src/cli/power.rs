use std::io;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::terminal::TerminalClient;

use super::command::PowerArgs;
use super::report::ActionResult;
use super::select::select_device;
use super::ui::Painter;
use super::{OutputFormat, Settings, write_json_line};

/// Executes the `power` command, waiting for the device to acknowledge.
#[instrument(skip_all, level = "info", fields(power = %args.level()))]
pub(crate) async fn run<W>(
    settings: &Settings,
    args: &PowerArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let device = select_device(settings, args.device()).await?;
    let level = args.level();

    let ctx = settings.context();
    let conn = device.dial().await.context("failed to open device socket")?;
    device
        .set_power(&ctx, &conn, level, true)
        .await
        .with_context(|| format!("failed to switch {} {level}", device.target()))?;

    match settings.output_format() {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(
                out,
                "{} {} is {}",
                painter.success("✓"),
                painter.value(device.to_string()),
                painter.power(level)
            )?;
        }
        OutputFormat::Json => write_json_line(
            out,
            &ActionResult::Power {
                target: device.target(),
                power: level,
            },
        )?,
    }
    Ok(())
}
