use std::io;

use tracing::{debug, instrument, trace};

use crate::context::CallContext;
use crate::error::LifxError;
use crate::message::{Response, parse_message};
use crate::transport::{Connection, RESPONSE_READ_BUFFER_SIZE};

/// Result of one bounded read attempt.
#[derive(Debug)]
pub(crate) enum ReadAttempt {
    Datagram(Vec<u8>),
    TimedOut,
}

/// Reads at most one datagram, waiting no longer than the context's poll interval.
///
/// Cancellation and socket errors are returned. A poll timeout, or a
/// transport reporting `TimedOut` or `WouldBlock`, is not an error.
pub(crate) async fn read_datagram(
    ctx: &CallContext,
    conn: &dyn Connection,
) -> Result<ReadAttempt, LifxError> {
    ctx.check()?;

    let mut buf = vec![0_u8; RESPONSE_READ_BUFFER_SIZE];
    tokio::select! {
        reason = ctx.done() => Err(LifxError::Cancelled(reason)),
        read = tokio::time::timeout(ctx.poll_interval(), conn.recv(&mut buf)) => match read {
            Err(_elapsed) => Ok(ReadAttempt::TimedOut),
            Ok(Err(error)) if is_read_timeout(&error) => {
                trace!(kind = %error.kind(), "transport read timed out");
                Ok(ReadAttempt::TimedOut)
            }
            Ok(Err(error)) => Err(LifxError::Io(error)),
            Ok(Ok(len)) => {
                buf.truncate(len);
                Ok(ReadAttempt::Datagram(buf))
            }
        },
    }
}

fn is_read_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Reads the next well-formed message from `conn`, whatever it is.
///
/// Poll timeouts only recheck cancellation; malformed datagrams are logged
/// and skipped. Callers filter the result by sequence, source and type.
///
/// # Errors
///
/// Returns [`LifxError::Cancelled`] once `ctx` ends and [`LifxError::Io`]
/// for socket failures.
#[instrument(skip_all, level = "trace")]
pub async fn read_next_response(
    ctx: &CallContext,
    conn: &dyn Connection,
) -> Result<Response, LifxError> {
    loop {
        let datagram = match read_datagram(ctx, conn).await? {
            ReadAttempt::Datagram(datagram) => datagram,
            ReadAttempt::TimedOut => {
                trace!("read poll timed out");
                continue;
            }
        };

        match parse_message(&datagram) {
            Ok(response) => return Ok(response),
            Err(error) => {
                debug!(%error, len = datagram.len(), "skipping malformed datagram");
            }
        }
    }
}
