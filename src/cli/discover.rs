use std::io;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use tracing::{Span, debug, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::device::Device;
use crate::discovery::discover_all;
use crate::error::LifxError;
use crate::terminal::TerminalClient;

use super::report::DeviceReport;
use super::ui::{DeviceListView, Painter};
use super::{OutputFormat, Settings, write_json_line};

/// Executes the `discover` command.
#[instrument(skip_all, level = "info", fields(broadcast = %settings.broadcast()))]
pub(crate) async fn run<W>(
    settings: &Settings,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    Span::current().pb_set_message("Discovering LIFX devices");
    let devices = discover_all(&settings.context(), &settings.discovery_config())
        .await
        .context("discovery failed")?;

    let mut reports = join_all(devices.iter().map(|device| describe(settings, device))).await;
    reports.sort_by_key(|report| (report.target.to_string(), report.addr));

    match settings.output_format() {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", DeviceListView::new(&reports, &painter))?;
        }
        OutputFormat::Json => write_json_line(out, &reports)?,
    }
    Ok(())
}

/// Reads label and version; a device that stops answering keeps what it had.
async fn describe(settings: &Settings, device: &Device) -> DeviceReport {
    if let Err(error) = query_identity(settings, device).await {
        debug!(%error, target = %device.target(), "device did not describe itself");
    }
    DeviceReport::from_device(device)
}

async fn query_identity(settings: &Settings, device: &Device) -> Result<(), LifxError> {
    let ctx = settings.context();
    let conn = device.dial().await?;
    device.get_label(&ctx, &conn).await?;
    device.get_hardware_version(&ctx, &conn).await?;
    Ok(())
}
