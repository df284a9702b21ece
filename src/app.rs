use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::cli::{self, Args, Command, LogLevel, OutputFormat, Settings, TileCommand};
use crate::context::CallContext;
use crate::product::ProductRegistry;
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Runs the CLI command against the real terminal.
///
/// ```no_run
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = lifxlan::Args::try_parse_from(["lifxlan", "discover", "--timeout", "1s"])?;
/// let mut out = Vec::new();
/// lifxlan::run(args, &mut out).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the products file cannot
/// be loaded, a device operation fails, or output writing fails.
pub async fn run<W>(args: Args, out: &mut W) -> Result<()>
where
    W: io::Write,
{
    run_with_terminal(args, out, &SystemTerminalClient).await
}

/// Runs the CLI command with an injected terminal client.
///
/// Without `--output`, results are pretty-printed when stdout is a terminal
/// and written as JSON otherwise.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl lifxlan::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let service = lifxlan::mock::MockService::start(
///     lifxlan::mock::MockConfig::builder().label("Desk").build(),
/// )
/// .await?;
/// let addr = service.addr().to_string();
/// let args = lifxlan::Args::try_parse_from(["lifxlan", "info", "--addr", addr.as_str()])?;
/// let mut out = Vec::new();
/// lifxlan::run_with_terminal(args, &mut out, &FakeTerminal).await?;
/// assert!(String::from_utf8(out)?.contains("\"label\": \"Desk\""));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the products file cannot
/// be loaded, a device operation fails, or output writing fails.
#[instrument(
    skip(args, out, terminal_client),
    level = "info",
    fields(command = %args.command().name(), log_level = ?args.log_level())
)]
pub async fn run_with_terminal<W>(
    args: Args,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "lifxlan",
        terminal_client.stderr_is_terminal(),
        args.log_level().map(LogLevel::as_level_filter),
    )?;

    let output_format = args.output_format().unwrap_or(if terminal_client.stdout_is_terminal() {
        OutputFormat::Pretty
    } else {
        OutputFormat::Json
    });
    let shutdown = CallContext::new();
    let settings = Settings::new(
        args.timeout(),
        args.broadcast(),
        load_registry(&args)?,
        output_format,
        shutdown.clone(),
    );

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupted; cancelling in-flight operations");
            shutdown.cancel();
        }
    });

    let result = match args.command() {
        Command::Discover => cli::discover::run(&settings, out, terminal_client).await,
        Command::Info(device) => cli::info::run(&settings, device, out, terminal_client).await,
        Command::Power(power) => cli::power::run(&settings, power, out, terminal_client).await,
        Command::Tile(TileCommand::Layout(device)) => {
            cli::tile::layout(&settings, device, out, terminal_client).await
        }
        Command::Tile(TileCommand::Fill(fill)) => {
            cli::tile::fill(&settings, fill, out, terminal_client).await
        }
    };
    interrupt.abort();
    result
}

fn load_registry(args: &Args) -> Result<Arc<ProductRegistry>> {
    let Some(path) = args.products() else {
        return Ok(ProductRegistry::builtin());
    };
    let overrides = ProductRegistry::from_path(path)
        .with_context(|| format!("failed to load products from `{}`", path.display()))?;
    debug!(products = overrides.len(), path = %path.display(), "loaded product overrides");
    Ok(Arc::new(ProductRegistry::builtin().merged_with(&overrides)))
}
