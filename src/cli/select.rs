use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{Span, debug, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::device::{Device, ServiceType};
use crate::discovery::discover;

use super::Settings;
use super::command::DeviceArgs;

/// Resolves `--target`/`--addr` to one device.
///
/// An explicit address skips discovery; otherwise discovery stops at the
/// first device whose target matches.
#[instrument(skip_all, level = "info", fields(target = %selection.target()))]
pub(crate) async fn select_device(
    settings: &Settings,
    selection: &DeviceArgs,
) -> Result<Arc<Device>> {
    let target = selection.target();
    if let Some(addr) = selection.addr() {
        debug!(%addr, "using explicit device address");
        let device = Device::new(addr, ServiceType::UDP, target)
            .with_registry(Arc::clone(settings.registry()));
        return Ok(Arc::new(device));
    }

    Span::current().pb_set_message(&format!("Looking for {target}"));
    let search = settings.context();
    let config = settings.discovery_config();
    let (sender, mut receiver) = mpsc::channel::<Device>(16);
    let first_match = async {
        while let Some(device) = receiver.recv().await {
            if target.matches(device.target()) {
                search.cancel();
                return Some(device);
            }
        }
        None
    };

    let (discovered, found) = tokio::join!(
        discover(&search, &config, sender),
        first_match
    );
    discovered.context("discovery failed")?;
    let device = found.with_context(|| {
        format!(
            "no device matching {target} answered within {}",
            humantime::format_duration(settings.timeout())
        )
    })?;
    Ok(Arc::new(device))
}
