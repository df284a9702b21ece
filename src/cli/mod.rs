pub(crate) mod command;
pub(crate) mod discover;
pub(crate) mod info;
pub(crate) mod power;
pub(crate) mod report;
mod select;
pub(crate) mod tile;
pub(crate) mod ui;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::context::CallContext;
use crate::discovery::DiscoveryConfig;
use crate::product::ProductRegistry;

pub use self::command::{
    Args, Command, DeviceArgs, FillArgs, LogLevel, OutputFormat, PowerArgs, PowerState,
    TileCommand,
};
pub use self::report::DeviceReport;

/// Resolved global options shared by every command.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    timeout: Duration,
    broadcast: SocketAddr,
    registry: Arc<ProductRegistry>,
    output_format: OutputFormat,
    shutdown: CallContext,
}

impl Settings {
    pub(crate) fn new(
        timeout: Duration,
        broadcast: SocketAddr,
        registry: Arc<ProductRegistry>,
        output_format: OutputFormat,
        shutdown: CallContext,
    ) -> Self {
        Self {
            timeout,
            broadcast,
            registry,
            output_format,
            shutdown,
        }
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn broadcast(&self) -> SocketAddr {
        self.broadcast
    }

    pub(crate) fn registry(&self) -> &Arc<ProductRegistry> {
        &self.registry
    }

    pub(crate) fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// A fresh context bounded by `--timeout` that also ends on shutdown.
    pub(crate) fn context(&self) -> CallContext {
        self.shutdown.child().deadline_after(self.timeout)
    }

    pub(crate) fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig::builder()
            .broadcast(self.broadcast)
            .registry(Arc::clone(&self.registry))
            .build()
    }
}

fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
