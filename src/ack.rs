use std::collections::HashSet;
use std::fmt;

use tracing::{debug, instrument, trace};

use crate::context::CallContext;
use crate::error::LifxError;
use crate::message::parse_message;
use crate::protocol::MessageType;
use crate::response::{ReadAttempt, read_datagram};
use crate::transport::Connection;

/// Returned when an ack wait ends before every sequence was acknowledged.
#[derive(Debug)]
pub struct WaitForAcksError {
    received: Vec<u8>,
    awaited: Vec<u8>,
    cause: Box<LifxError>,
}

impl WaitForAcksError {
    /// Creates an error for the `received` acks, in arrival order, out of the
    /// `awaited` sequences, ending with `cause`.
    #[must_use]
    pub fn new(received: Vec<u8>, awaited: Vec<u8>, cause: LifxError) -> Self {
        Self {
            received,
            awaited,
            cause: Box::new(cause),
        }
    }

    /// Sequences that were acknowledged, in arrival order.
    #[must_use]
    pub fn received_sequences(&self) -> &[u8] {
        &self.received
    }

    /// Distinct sequences that were awaited, in request order.
    #[must_use]
    pub fn awaited_sequences(&self) -> &[u8] {
        &self.awaited
    }

    /// Number of distinct sequences that were acknowledged.
    #[must_use]
    pub fn received(&self) -> usize {
        self.received.len()
    }

    /// Number of distinct sequences that were awaited.
    #[must_use]
    pub fn total(&self) -> usize {
        self.awaited.len()
    }

    /// The cancellation or socket error that ended the wait.
    #[must_use]
    pub fn cause(&self) -> &LifxError {
        &self.cause
    }
}

impl fmt::Display for WaitForAcksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} ack(s) received (sequences {:?} of {:?}): {}",
            self.received(),
            self.total(),
            self.received,
            self.awaited,
            self.cause
        )
    }
}

impl std::error::Error for WaitForAcksError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Blocks until every sequence in `sequences` has been acknowledged for `source`.
///
/// Every datagram read that is not a matching acknowledgement is discarded,
/// so no other reader may use `conn` while this runs. Duplicate sequences
/// are awaited once.
///
/// # Errors
///
/// Returns a [`WaitForAcksError`] listing the acknowledged and awaited
/// sequences when `ctx` ends or a socket read fails.
#[instrument(skip(ctx, conn), fields(pending = sequences.len()))]
pub async fn wait_for_acks(
    ctx: &CallContext,
    conn: &dyn Connection,
    source: u32,
    sequences: &[u8],
) -> Result<(), WaitForAcksError> {
    let mut awaited = Vec::with_capacity(sequences.len());
    let mut pending = HashSet::with_capacity(sequences.len());
    for &sequence in sequences {
        if pending.insert(sequence) {
            awaited.push(sequence);
        }
    }
    let mut received = Vec::with_capacity(awaited.len());

    if let Err(error) = ctx.check() {
        return Err(WaitForAcksError::new(received, awaited, error));
    }
    if pending.is_empty() {
        return Ok(());
    }

    while !pending.is_empty() {
        let datagram = match read_datagram(ctx, conn).await {
            Ok(ReadAttempt::Datagram(datagram)) => datagram,
            Ok(ReadAttempt::TimedOut) => continue,
            Err(error) => {
                debug!(?received, ?awaited, %error, "ack wait ended early");
                return Err(WaitForAcksError::new(received, awaited, error));
            }
        };

        let response = match parse_message(&datagram) {
            Ok(response) => response,
            Err(error) => {
                debug!(%error, "skipping malformed datagram");
                continue;
            }
        };

        if response.message_type() != MessageType::ACKNOWLEDGEMENT {
            trace!(message_type = %response.message_type(), "dropping non-ack datagram");
            continue;
        }
        if response.source() != source {
            trace!(source = response.source(), "dropping ack for another source");
            continue;
        }
        if !pending.remove(&response.sequence()) {
            trace!(sequence = response.sequence(), "dropping unexpected ack");
            continue;
        }
        received.push(response.sequence());
        trace!(sequence = response.sequence(), remaining = pending.len(), "ack received");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::CancelReason;
    use crate::header::{AckResFlags, TaggedHeader};
    use crate::message::{MessageMeta, build_message};
    use crate::mock::ScriptedConnection;
    use crate::target::Target;

    const SOURCE: u32 = 0x1234;

    fn reply(source: u32, sequence: u8, message_type: MessageType) -> Vec<u8> {
        let meta = MessageMeta {
            tagged: TaggedHeader::NOT_TAGGED,
            source,
            target: Target::AllDevices,
            flags: AckResFlags::NONE,
            sequence,
            message_type,
        };
        build_message(&meta, &[]).expect("message should build")
    }

    fn ack(source: u32, sequence: u8) -> Vec<u8> {
        reply(source, sequence, MessageType::ACKNOWLEDGEMENT)
    }

    #[tokio::test]
    async fn empty_sequence_set_succeeds_immediately() {
        let conn = ScriptedConnection::new();
        wait_for_acks(&CallContext::new(), &conn, SOURCE, &[])
            .await
            .expect("nothing to wait for");
    }

    #[tokio::test]
    async fn cancelled_context_fails_before_reading() {
        let conn = ScriptedConnection::new();
        conn.push_inbound(ack(SOURCE, 1));
        let ctx = CallContext::new();
        ctx.cancel();

        let error = wait_for_acks(&ctx, &conn, SOURCE, &[1])
            .await
            .expect_err("cancelled context should fail");
        assert_eq!((0, 1), (error.received(), error.total()));
        assert_eq!(1, conn.pending_inbound());
    }

    #[tokio::test]
    async fn completes_once_every_ack_arrives() {
        let conn = ScriptedConnection::new();
        conn.push_inbound(ack(SOURCE, 3));
        conn.push_inbound(ack(SOURCE, 1));
        conn.push_inbound(ack(SOURCE, 2));

        wait_for_acks(&CallContext::new(), &conn, SOURCE, &[1, 2, 3])
            .await
            .expect("all acks arrived");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ack_reports_partial_progress() {
        let conn = ScriptedConnection::new();
        conn.push_inbound(ack(SOURCE, 1));
        conn.push_inbound(ack(SOURCE, 3));
        let ctx = CallContext::with_timeout(Duration::from_millis(300));

        let error = wait_for_acks(&ctx, &conn, SOURCE, &[1, 2, 3])
            .await
            .expect_err("sequence 2 is never acknowledged");

        assert_eq!(&[1, 3], error.received_sequences());
        assert_eq!(&[1, 2, 3], error.awaited_sequences());
        assert_eq!((2, 3), (error.received(), error.total()));
        assert_matches!(error.cause(), LifxError::Cancelled(CancelReason::DeadlineExceeded));
        assert_eq!(
            "2 of 3 ack(s) received (sequences [1, 3] of [1, 2, 3]): deadline exceeded",
            error.to_string()
        );
    }

    #[tokio::test]
    async fn transport_timeout_does_not_end_the_wait() {
        let conn = ScriptedConnection::new();
        conn.push_recv_error(std::io::ErrorKind::TimedOut);
        conn.push_inbound(ack(SOURCE, 1));

        wait_for_acks(&CallContext::new(), &conn, SOURCE, &[1])
            .await
            .expect("ack after a transport timeout completes the wait");
        assert_eq!(0, conn.pending_inbound());
    }

    #[tokio::test(start_paused = true)]
    async fn partial_errors_name_the_acknowledged_sequences() {
        let conn = ScriptedConnection::new();
        conn.push_inbound(ack(SOURCE, 3));
        conn.push_inbound(ack(SOURCE, 2));
        conn.push_inbound(ack(SOURCE, 2));
        let ctx = CallContext::with_timeout(Duration::from_millis(300));

        let error = wait_for_acks(&ctx, &conn, SOURCE, &[2, 1, 2, 3])
            .await
            .expect_err("sequence 1 is never acknowledged");

        assert_eq!(&[3, 2], error.received_sequences());
        assert_eq!(&[2, 1, 3], error.awaited_sequences());
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_foreign_and_non_ack_datagrams() {
        let conn = ScriptedConnection::new();
        conn.push_inbound(ack(SOURCE, 6));
        conn.push_inbound(ack(SOURCE + 1, 5));
        conn.push_inbound(reply(SOURCE, 5, MessageType::STATE_POWER));
        conn.push_inbound(vec![0xde, 0xad]);
        let ctx = CallContext::with_timeout(Duration::from_millis(300));

        let error = wait_for_acks(&ctx, &conn, SOURCE, &[5])
            .await
            .expect_err("no matching ack was sent");
        assert_eq!(0, error.received());
        assert_eq!(0, conn.pending_inbound());

        conn.push_inbound(ack(SOURCE, 5));
        wait_for_acks(&CallContext::new(), &conn, SOURCE, &[5])
            .await
            .expect("matching ack completes the wait");
    }

    #[tokio::test]
    async fn socket_error_is_the_cause() {
        let conn = ScriptedConnection::new();
        conn.push_inbound(ack(SOURCE, 1));
        conn.push_recv_error(std::io::ErrorKind::ConnectionReset);

        let error = wait_for_acks(&CallContext::new(), &conn, SOURCE, &[1, 2])
            .await
            .expect_err("read failure should end the wait");
        assert_eq!((1, 2), (error.received(), error.total()));
        assert_matches!(error.cause(), LifxError::Io(_));
    }
}
