use std::io;

use anyhow::{Context, Result};
use tracing::{Span, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::TerminalClient;

use super::command::DeviceArgs;
use super::report::DeviceReport;
use super::select::select_device;
use super::ui::{DeviceReportView, Painter};
use super::{OutputFormat, Settings, write_json_line};

/// Executes the `info` command.
#[instrument(skip_all, level = "info", fields(target = %args.target()))]
pub(crate) async fn run<W>(
    settings: &Settings,
    args: &DeviceArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let device = select_device(settings, args).await?;
    Span::current().pb_set_message(&format!("Reading {}", device.target()));

    let ctx = settings.context();
    let conn = device.dial().await.context("failed to open device socket")?;
    device
        .get_label(&ctx, &conn)
        .await
        .context("failed to read label")?;
    device
        .get_hardware_version(&ctx, &conn)
        .await
        .context("failed to read hardware version")?;
    device
        .get_firmware(&ctx, &conn)
        .await
        .context("failed to read firmware version")?;

    let report = DeviceReport::from_device(&device);
    match settings.output_format() {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", DeviceReportView::new(&report, &painter))?;
        }
        OutputFormat::Json => write_json_line(out, &report)?,
    }
    Ok(())
}
